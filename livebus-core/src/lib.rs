//! livebus-core: shared building blocks for the LiveBus Planner backend.
//!
//! Every operation in the planner takes an explicit [`CallerContext`]
//! instead of reading a global session, so identity is testable without a
//! live auth service. Persistence goes through the [`DocumentStore`]
//! contract; the managed database is just one implementation of it.

pub mod caller;
pub mod config;
pub mod documents;
pub mod errors;
pub mod logging;
pub mod memory;

pub use caller::{require_caller, CallerContext, SessionProvider, StaticSession, UserId};
pub use config::{ConfigSnapshot, PlannerConfig};
pub use documents::{
    Document, DocumentError, DocumentResult, DocumentStore, Filter, StoredDocument, LEGACY_OWNER_FIELD,
    OWNER_FIELD,
};
pub use errors::{ErrorKind, Locale, PlannerError, PlannerResult};
pub use memory::MemoryDocumentStore;
