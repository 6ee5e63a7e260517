use livebus_core::PlannerError;
use thiserror::Error;

use crate::coordinator::UploadFailure;
use crate::validate::ValidationReport;

/// Result type for object store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failure categories reported by an object store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Operation canceled")]
    Canceled,

    #[error("Retry limit exceeded: {0}")]
    RetryLimitExceeded(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Not an object url of this store: {0}")]
    InvalidUrl(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend<S: Into<String>>(message: S) -> Self {
        Self::Backend(message.into())
    }

    pub fn permission_denied<S: Into<String>>(message: S) -> Self {
        Self::PermissionDenied(message.into())
    }
}

/// Errors surfaced by the upload coordinator
#[derive(Error, Debug, Clone)]
pub enum UploadError {
    #[error("Upload rejected: {0}")]
    Rejected(ValidationReport),

    #[error("Not authorized to store images")]
    Unauthorized { file_name: Option<String> },

    #[error("Upload of {file_name} was canceled")]
    Canceled { file_name: String },

    #[error("Upload of {file_name} exhausted its retry budget")]
    TimeoutExceeded { file_name: String },

    #[error("Upload of {file_name} failed: {message}")]
    Generic { file_name: String, message: String },

    #[error("All {} uploads failed", .failures.len())]
    AllFailed { failures: Vec<UploadFailure> },
}

impl UploadError {
    /// Classify a store failure for one file.
    pub fn from_store(file_name: &str, err: StoreError) -> Self {
        match err {
            StoreError::PermissionDenied(_) => Self::Unauthorized {
                file_name: Some(file_name.to_string()),
            },
            StoreError::Canceled => Self::Canceled {
                file_name: file_name.to_string(),
            },
            StoreError::RetryLimitExceeded(_) => Self::TimeoutExceeded {
                file_name: file_name.to_string(),
            },
            other => Self::Generic {
                file_name: file_name.to_string(),
                message: other.to_string(),
            },
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { file_name } => file_name.as_deref(),
            Self::Canceled { file_name }
            | Self::TimeoutExceeded { file_name }
            | Self::Generic { file_name, .. } => Some(file_name),
            Self::Rejected(_) | Self::AllFailed { .. } => None,
        }
    }
}

impl From<UploadError> for PlannerError {
    fn from(err: UploadError) -> Self {
        let message = err.to_string();
        let planner = match &err {
            UploadError::Rejected(report) => return PlannerError::validation(report.reasons(Default::default())),
            UploadError::Unauthorized { .. } => PlannerError::unauthorized(message),
            UploadError::Canceled { .. } => PlannerError::canceled(message),
            UploadError::TimeoutExceeded { .. } => PlannerError::timeout_exceeded(message),
            UploadError::Generic { .. } | UploadError::AllFailed { .. } => PlannerError::generic(message),
        };
        match err.file_name() {
            Some(file) => planner.with_file_name(file),
            None => planner,
        }
    }
}

/// A batch deletion in which at least one object could not be removed.
#[derive(Error, Debug, Clone)]
#[error("Failed to delete {failed} of {total} stored images: {first}")]
pub struct CleanupError {
    pub total: usize,
    pub failed: usize,
    pub first: StoreError,
}

impl From<CleanupError> for PlannerError {
    fn from(err: CleanupError) -> Self {
        PlannerError::cleanup(err.to_string()).with_source(err.into())
    }
}
