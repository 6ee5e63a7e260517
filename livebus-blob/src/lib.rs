//! # livebus-blob: the image upload pipeline
//!
//! Trip and accommodation forms attach photos. Getting those photos into
//! object storage is the one place where the planner has to deal with
//! partial failure, so it lives in its own crate.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────────┐
//! │    Validator     │  ← size / type / count, no network
//! ├──────────────────┤
//! │ UploadCoordinator│  ← strict (concurrent, all-or-nothing)
//! │                  │    or best-effort (sequential, partial success)
//! ├──────────────────┤
//! │   Retry wrapper  │  ← linear backoff around each store write
//! ├──────────────────┤
//! │   ObjectStore    │  ← memory, S3-compatible, or your own
//! └──────────────────┘
//! ```
//!
//! [`AssetCleaner`] runs the other way: it deletes stored images when their
//! record is edited or removed, so storage never keeps objects nobody
//! references.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use livebus_blob::prelude::*;
//! use livebus_core::CallerContext;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), UploadError> {
//! let store = Arc::new(MemoryObjectStore::new());
//! let uploads = UploadCoordinator::new(store);
//!
//! let caller = CallerContext::new("user-123");
//! let photo = UploadCandidate::new("bus.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF]);
//!
//! let outcome = uploads
//!     .upload(&caller, "nightbus_images", &[photo], UploadPolicy::BestEffort)
//!     .await?;
//! assert_eq!(outcome.urls().len(), 1);
//! # Ok(())
//! # }
//! ```

mod cleanup;
mod config;
mod coordinator;
mod error;
mod memory_store;
mod retry;
mod s3_store;
pub mod store;
mod types;
mod validate;

pub use cleanup::AssetCleaner;
pub use config::UploadRules;
pub use coordinator::{BatchOutcome, UploadCoordinator, UploadFailure};
pub use error::{CleanupError, StoreError, StoreResult, UploadError};
pub use memory_store::MemoryObjectStore;
pub use retry::{retry_with_backoff, RetryPolicy};
pub use s3_store::{S3CompatibleStore, S3Config};
pub use store::{sanitize_file_name, DefaultKeyStrategy, ObjectKeyStrategy, ObjectStore};
pub use types::{ObjectHandle, StoredAsset, UploadCandidate, UploadPolicy};
pub use validate::{validate_batch, Rejection, ValidationReport};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AssetCleaner, BatchOutcome, MemoryObjectStore, ObjectStore, RetryPolicy, StoredAsset,
        UploadCandidate, UploadCoordinator, UploadError, UploadPolicy, UploadRules,
    };
}
