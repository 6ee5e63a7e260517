use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use livebus_core::{ErrorKind, PlannerError};
use serde_json::json;
use thiserror::Error;

use crate::mail::RelayError;

/// Status codes of the callable protocol that these functions use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableStatus {
    InvalidArgument,
    Internal,
}

impl CallableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallableStatus::InvalidArgument => "invalid-argument",
            CallableStatus::Internal => "internal",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            CallableStatus::InvalidArgument => StatusCode::BAD_REQUEST,
            CallableStatus::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for CallableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{status}: {message}")]
pub struct CallableError {
    pub status: CallableStatus,
    pub message: String,
}

impl CallableError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self {
            status: CallableStatus::InvalidArgument,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: CallableStatus::Internal,
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "error": {
                "status": self.status.as_str(),
                "message": self.message,
            }
        })
    }
}

/// Relay failures never leak their details to the caller.
impl From<RelayError> for CallableError {
    fn from(_: RelayError) -> Self {
        CallableError::internal("メール送信に失敗しました")
    }
}

impl From<PlannerError> for CallableError {
    fn from(err: PlannerError) -> Self {
        match err.kind {
            ErrorKind::Validation => CallableError::invalid_argument(err.message),
            _ => CallableError::internal(err.message),
        }
    }
}

impl IntoResponse for CallableError {
    fn into_response(self) -> Response {
        (self.status.http_status(), Json(self.to_json())).into_response()
    }
}
