use std::env;

use anyhow::{Context, Result};
use livebus_core::{ConfigSnapshot, PlannerConfig};

use crate::callable::MailSettings;

/// Plain environment variables and the config keys they map to.
const ENV_KEYS: [(&str, &str); 6] = [
    ("HTTP_HOST", "http.host"),
    ("HTTP_PORT", "http.port"),
    ("MAIL_RELAY_URL", "mail.relay_url"),
    ("MAIL_RELAY_API_KEY", "mail.relay_api_key"),
    ("MAIL_SENDER", "mail.sender"),
    ("CONTACT_INBOX", "mail.contact_inbox"),
];

#[derive(Debug, Clone)]
pub struct FunctionsConfig {
    pub host: String,
    pub port: u16,
    pub relay_url: String,
    pub relay_api_key: String,
    pub sender: String,
    /// Defaults to `sender`.
    pub contact_inbox: String,
}

impl FunctionsConfig {
    /// `LIVEBUS__…` variables first, then the plain ones above.
    pub fn from_env() -> Result<Self> {
        let mut config = PlannerConfig::from_env();
        for (var, key) in ENV_KEYS {
            if let Ok(value) = env::var(var) {
                config.set(key, value);
            }
        }
        Self::from_config(&config.snapshot())
    }

    pub fn from_config(config: &ConfigSnapshot) -> Result<Self> {
        fn required(config: &ConfigSnapshot, key: &str) -> Result<String> {
            config
                .get_string(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("missing configuration value `{key}`"))
        }

        let port = match config.get("http.port") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("invalid http.port `{raw}`"))?,
            None => 3030,
        };
        let sender = required(config, "mail.sender")?;

        Ok(Self {
            host: config.get_string("http.host").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            relay_url: required(config, "mail.relay_url")?,
            relay_api_key: required(config, "mail.relay_api_key")?,
            contact_inbox: config
                .get_string("mail.contact_inbox")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| sender.clone()),
            sender,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn mail_settings(&self) -> MailSettings {
        MailSettings {
            sender: self.sender.clone(),
            contact_inbox: self.contact_inbox.clone(),
        }
    }
}
