//! # livebus-records
//!
//! The planner's three record families (night-bus trips, accommodations and
//! budgets), how they are stored, how a form submission turns into a saved
//! record with images, and how a set of records is shared read-only.
//!
//! ```text
//! form ──► RecordSubmitter ──► UploadCoordinator (livebus-blob)
//!               │                     │
//!               │                     ▼
//!               │               ObjectStore
//!               ▼
//!       RecordRepository ──► DocumentStore (livebus-core)
//! ```
//!
//! Every operation takes an explicit [`livebus_core::CallerContext`]; only
//! [`load_shared`] runs without one.

mod accommodation;
mod budget;
pub mod form;
mod kind;
pub mod lenient;
mod repository;
mod share;
mod submission;
mod trip;

pub use accommodation::Accommodation;
pub use budget::Budget;
pub use kind::{date_label, yen, Record, RecordKind};
pub use repository::{decode, encode, RecordRepository, Saved};
pub use share::{load_shared, ShareSelection, SharedView, IDS_PER_QUERY};
pub use submission::{ImageChange, RecordSubmitter, SubmissionReport, SubmissionState};
pub use trip::Trip;
