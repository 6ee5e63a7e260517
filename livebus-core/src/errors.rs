//! # Errors
//!
//! The planner surfaces one structured error type to its callers.
//! Core goals:
//! - a small, closed taxonomy the UI can branch on
//! - a localized user-facing message per kind
//! - can be carried through `anyhow::Error` at the application boundary
//! - a JSON payload for the HTTP layer

use std::fmt;

use anyhow::Error as AnyError;
use serde_json::json;

/// A convenience result type for planner APIs.
pub type PlannerResult<T> = std::result::Result<T, PlannerError>;

/// Error categories surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,      // 422
    Unauthorized,    // 401
    NotFound,        // 404
    TimeoutExceeded, // 408
    Canceled,        // 499
    Cleanup,         // 500
    Generic,         // 500
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 422,
            ErrorKind::Unauthorized => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::TimeoutExceeded => 408,
            ErrorKind::Canceled => 499,
            ErrorKind::Cleanup => 500,
            ErrorKind::Generic => 500,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationFailure",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::TimeoutExceeded => "TimeoutExceeded",
            ErrorKind::Canceled => "Canceled",
            ErrorKind::Cleanup => "CleanupFailed",
            ErrorKind::Generic => "Generic",
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation-failure",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotFound => "not-found",
            ErrorKind::TimeoutExceeded => "timeout-exceeded",
            ErrorKind::Canceled => "canceled",
            ErrorKind::Cleanup => "cleanup-failed",
            ErrorKind::Generic => "generic",
        }
    }
}

/// Language of user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    Ja,
    En,
}

/// A structured planner error.
///
/// `reasons` is only populated for validation failures (one entry per
/// violated rule). `file_name` names the upload that failed, when there is one.
#[derive(Debug)]
pub struct PlannerError {
    pub kind: ErrorKind,
    pub message: String,
    pub file_name: Option<String>,
    pub reasons: Vec<String>,
    pub source: Option<AnyError>,
}

impl PlannerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            file_name: None,
            reasons: Vec::new(),
            source: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Convert into `anyhow::Error` so it flows through handler code.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Downcast an `anyhow::Error` to a `PlannerError` if possible.
    pub fn from_anyhow(err: &AnyError) -> Option<&PlannerError> {
        err.downcast_ref::<PlannerError>()
    }

    /// Keep a `PlannerError` as-is, wrap anything else as `Generic`.
    pub fn normalize(err: AnyError) -> PlannerError {
        match err.downcast::<PlannerError>() {
            Ok(planner) => planner,
            Err(other) => PlannerError::generic(other.to_string()).with_source(other),
        }
    }

    /// Message shown inline and in the toast.
    pub fn user_message(&self, locale: Locale) -> String {
        match (self.kind, locale) {
            (ErrorKind::Validation, _) if !self.reasons.is_empty() => self.reasons.join("\n"),
            (ErrorKind::Validation, Locale::Ja) => "入力内容を確認してください。".to_string(),
            (ErrorKind::Validation, Locale::En) => "Please check the form input.".to_string(),
            (ErrorKind::Unauthorized, Locale::Ja) => {
                "権限がありません。ログインしてください。".to_string()
            }
            (ErrorKind::Unauthorized, Locale::En) => {
                "You are not signed in or lack permission for this action.".to_string()
            }
            (ErrorKind::NotFound, Locale::Ja) => "データが見つかりません。".to_string(),
            (ErrorKind::NotFound, Locale::En) => "The record no longer exists.".to_string(),
            (ErrorKind::TimeoutExceeded, Locale::Ja) => {
                "画像のアップロードがタイムアウトしました。ネットワーク接続を確認してください。".to_string()
            }
            (ErrorKind::TimeoutExceeded, Locale::En) => {
                "The upload timed out. Please check your network connection.".to_string()
            }
            (ErrorKind::Canceled, Locale::Ja) => "画像のアップロードがキャンセルされました。".to_string(),
            (ErrorKind::Canceled, Locale::En) => "The upload was canceled.".to_string(),
            (ErrorKind::Cleanup, Locale::Ja) => "古い画像の削除に失敗しました。".to_string(),
            (ErrorKind::Cleanup, Locale::En) => "Failed to delete the previous images.".to_string(),
            (ErrorKind::Generic, Locale::Ja) => match &self.file_name {
                Some(file) => format!("画像 {} のアップロードに失敗しました: {}", file, self.message),
                None => "データの保存に失敗しました。".to_string(),
            },
            (ErrorKind::Generic, Locale::En) => match &self.file_name {
                Some(file) => format!("Uploading {} failed: {}", file, self.message),
                None => "Saving failed.".to_string(),
            },
        }
    }

    /// JSON payload for transports. The inner `source` is never included.
    pub fn to_json(&self) -> serde_json::Value {
        let mut base = json!({
            "name": self.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.class_name(),
        });
        if let Some(file) = &self.file_name {
            base["fileName"] = json!(file);
        }
        if !self.reasons.is_empty() {
            base["errors"] = json!(self.reasons);
        }
        base
    }

    // ---- Constructors ----

    pub fn validation(reasons: Vec<String>) -> Self {
        let mut err = Self::new(ErrorKind::Validation, reasons.join("; "));
        err.reasons = reasons;
        err
    }
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn timeout_exceeded(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::TimeoutExceeded, msg)
    }
    pub fn canceled(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Canceled, msg)
    }
    pub fn cleanup(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cleanup, msg)
    }
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Generic, msg)
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file_name {
            Some(file) => write!(f, "{} ({}): {} [{}]", self.name(), self.code(), self.message, file),
            None => write!(f, "{} ({}): {}", self.name(), self.code(), self.message),
        }
    }
}

impl std::error::Error for PlannerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Convenience helper for "bail with PlannerError".
#[macro_export]
macro_rules! bail_planner {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::PlannerError::$ctor($msg));
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::PlannerError::$ctor(format!($fmt, $($arg)*)));
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_reason() {
        let err = PlannerError::validation(vec!["too big".into(), "too many".into()]);
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.user_message(Locale::En), "too big\ntoo many");
        assert_eq!(err.to_json()["errors"][1], "too many");
    }

    #[test]
    fn generic_upload_error_names_the_file() {
        let err = PlannerError::generic("connection reset").with_file_name("bus.jpg");
        assert!(err.user_message(Locale::Ja).contains("bus.jpg"));
        assert_eq!(err.to_json()["fileName"], "bus.jpg");
        assert!(err.to_string().contains("[bus.jpg]"));
    }

    #[test]
    fn normalize_keeps_planner_errors() {
        let wrapped = PlannerError::not_found("trip t1").into_anyhow();
        assert_eq!(PlannerError::normalize(wrapped).kind, ErrorKind::NotFound);

        let other = PlannerError::normalize(anyhow::anyhow!("boom"));
        assert_eq!(other.kind, ErrorKind::Generic);
        assert_eq!(other.message, "boom");
    }

    fn bails() -> PlannerResult<()> {
        bail_planner!(not_found, "record {} is gone", "t1");
    }

    #[test]
    fn bail_macro_formats() {
        let err = bails().unwrap_err();
        assert_eq!(err.message, "record t1 is gone");
    }
}
