//! Outgoing mail.
//!
//! Functions hand a [`MailMessage`] to a [`MailRelay`]. The production relay
//! posts JSON to a transactional-email HTTP API; tests use a recorder.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Mail relay unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Mail relay rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait MailRelay: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<(), RelayError>;
}

/// Relay over an HTTP transactional-email API (`POST {url}` with a bearer key).
#[derive(Clone)]
pub struct HttpMailRelay {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpMailRelay {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl MailRelay for HttpMailRelay {
    async fn send(&self, message: MailMessage) -> Result<(), RelayError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(to = %message.to, "mail accepted by relay");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "mail relay rejected message");
        Err(RelayError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

impl std::fmt::Debug for HttpMailRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMailRelay")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

/// Escape text for interpolation into an HTML body.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_is_escaped() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn debug_hides_the_api_key() {
        let relay = HttpMailRelay::new("https://mail.example/send", "secret-key").unwrap();
        assert!(!format!("{relay:?}").contains("secret-key"));
    }
}
