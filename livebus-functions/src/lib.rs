//! # livebus-functions
//!
//! Server-side callable functions for LiveBus Planner: relaying the contact
//! form to the support inbox and mailing share links.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use livebus_functions::{router, Functions, FunctionsConfig, HttpMailRelay};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = FunctionsConfig::from_env()?;
//! let relay = HttpMailRelay::new(&config.relay_url, &config.relay_api_key)?;
//! let app = router(Arc::new(Functions::new(Arc::new(relay), config.mail_settings())));
//! let listener = tokio::net::TcpListener::bind(config.addr()).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod callable;
pub mod config;
pub mod error;
pub mod http;
pub mod mail;

pub use callable::{ContactMessage, Functions, MailSettings, SendResult, ShareLinkEmail};
pub use config::FunctionsConfig;
pub use error::{CallableError, CallableStatus};
pub use http::router;
pub use mail::{escape_html, HttpMailRelay, MailMessage, MailRelay, RelayError};
