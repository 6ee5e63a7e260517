use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use validator::{Validate, ValidationErrors};

use crate::error::CallableError;
use crate::mail::{escape_html, MailMessage, MailRelay};

/// Contact form submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ContactMessage {
    #[validate(length(max = 200, message = "name is too long"))]
    pub name: String,
    #[validate(email(message = "email must be a valid email"))]
    pub email: String,
    pub phone: String,
    #[validate(length(max = 5000, message = "message is too long"))]
    pub message: String,
}

/// Share link to mail to a friend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ShareLinkEmail {
    #[validate(email(message = "email must be a valid email"))]
    pub email: String,
    #[validate(url(message = "link must be a valid URL"))]
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResult {
    pub success: bool,
}

/// Sender address and inbox for contact messages.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub sender: String,
    pub contact_inbox: String,
}

/// The two callable functions.
pub struct Functions {
    relay: Arc<dyn MailRelay>,
    settings: MailSettings,
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn invalid(errs: ValidationErrors) -> CallableError {
    let mut reasons: Vec<String> = errs
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{field} is invalid"))
            })
        })
        .collect();
    reasons.sort();
    CallableError::invalid_argument(reasons.join("; "))
}

impl Functions {
    pub fn new(relay: Arc<dyn MailRelay>, settings: MailSettings) -> Self {
        Self { relay, settings }
    }

    /// Relay a contact message to the configured inbox.
    #[instrument(skip_all)]
    pub async fn send_email(&self, payload: ContactMessage) -> Result<SendResult, CallableError> {
        if blank(&payload.name) || blank(&payload.email) || blank(&payload.message) {
            return Err(CallableError::invalid_argument("Name, email and message are required."));
        }
        payload.validate().map_err(invalid)?;

        let text = format!(
            "名前: {}\nメール: {}\n電話: {}\nメッセージ:\n{}",
            payload.name, payload.email, payload.phone, payload.message
        );
        let html = format!(
            "<h2>新しいお問い合わせ</h2>\
             <p><strong>名前：</strong> {}</p>\
             <p><strong>メール：</strong> {}</p>\
             <p><strong>電話：</strong> {}</p>\
             <p><strong>メッセージ：</strong> {}</p>",
            escape_html(&payload.name),
            escape_html(&payload.email),
            escape_html(&payload.phone),
            escape_html(&payload.message),
        );

        self.deliver(MailMessage {
            from: self.settings.sender.clone(),
            to: self.settings.contact_inbox.clone(),
            subject: "新しいお問い合わせ".to_string(),
            text,
            html,
        })
        .await
    }

    /// Mail a share link to `email`.
    #[instrument(skip_all)]
    pub async fn send_share_email(&self, payload: ShareLinkEmail) -> Result<SendResult, CallableError> {
        if blank(&payload.email) || blank(&payload.link) {
            return Err(CallableError::invalid_argument("Email and link are required."));
        }
        payload.validate().map_err(invalid)?;

        let link = escape_html(&payload.link);
        self.deliver(MailMessage {
            from: self.settings.sender.clone(),
            to: payload.email.clone(),
            subject: "Live Bus Planner 共有リンク".to_string(),
            text: format!("共有リンク: {}", payload.link),
            html: format!("<p>共有リンク: <a href=\"{link}\">{link}</a></p>"),
        })
        .await
    }

    async fn deliver(&self, message: MailMessage) -> Result<SendResult, CallableError> {
        let subject = message.subject.clone();
        match self.relay.send(message).await {
            Ok(()) => {
                info!(%subject, "mail sent");
                Ok(SendResult { success: true })
            }
            Err(e) => {
                error!(%subject, error = %e, "mail delivery failed");
                Err(e.into())
            }
        }
    }
}
