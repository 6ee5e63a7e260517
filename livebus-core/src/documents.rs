//! Document store contract.
//!
//! The hosted database is consumed as an opaque service: documents are JSON
//! objects in named collections, addressed by a store-assigned id. The only
//! filters the planner needs are owner equality and id membership.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::errors::PlannerError;

/// Field holding the owner's user id on every record document.
pub const OWNER_FIELD: &str = "ownerId";

/// Owner field written by older clients. Read, never written.
pub const LEGACY_OWNER_FIELD: &str = "userId";

/// A stored document body.
pub type Document = serde_json::Map<String, Value>;

/// Result type for document store operations
pub type DocumentResult<T> = Result<T, DocumentError>;

/// A document together with its id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
}

/// Query predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `field == value`
    FieldEq { field: String, value: Value },
    /// Document id is one of the given ids.
    IdIn(Vec<String>),
}

impl Filter {
    /// Records owned by `owner_id`.
    pub fn owner(owner_id: &str) -> Self {
        Self::field_eq(OWNER_FIELD, Value::String(owner_id.to_string()))
    }

    /// Older records owned by `owner_id` under [`LEGACY_OWNER_FIELD`].
    pub fn legacy_owner(owner_id: &str) -> Self {
        Self::field_eq(LEGACY_OWNER_FIELD, Value::String(owner_id.to_string()))
    }

    pub fn field_eq<F: Into<String>>(field: F, value: Value) -> Self {
        Self::FieldEq {
            field: field.into(),
            value,
        }
    }

    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::IdIn(ids.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, id: &str, data: &Document) -> bool {
        match self {
            Filter::FieldEq { field, value } => data.get(field) == Some(value),
            Filter::IdIn(ids) => ids.iter().any(|candidate| candidate == id),
        }
    }
}

/// Errors reported by a document store
#[derive(Error, Debug, Clone)]
pub enum DocumentError {
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    #[error("Document store error: {0}")]
    Backend(String),
}

impl DocumentError {
    pub fn not_found<C: Into<String>, I: Into<String>>(collection: C, id: I) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl From<DocumentError> for PlannerError {
    fn from(err: DocumentError) -> Self {
        let message = err.to_string();
        let planner = match &err {
            DocumentError::NotFound { .. } => PlannerError::not_found(message),
            DocumentError::PermissionDenied(_) => PlannerError::unauthorized(message),
            DocumentError::Unavailable(_) | DocumentError::Backend(_) => PlannerError::generic(message),
        };
        planner.with_source(err.into())
    }
}

/// Core document operations - implemented by every persistence backend
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document and return its new id.
    async fn create(&self, collection: &str, data: Document) -> DocumentResult<String>;

    /// Overwrite the fields of an existing document.
    async fn update(&self, collection: &str, id: &str, data: Document) -> DocumentResult<()>;

    /// Delete a document.
    async fn delete(&self, collection: &str, id: &str) -> DocumentResult<()>;

    /// Fetch one document, `None` when it does not exist.
    async fn get(&self, collection: &str, id: &str) -> DocumentResult<Option<StoredDocument>>;

    /// All documents of a collection matching `filter`.
    async fn query(&self, collection: &str, filter: &Filter) -> DocumentResult<Vec<StoredDocument>>;
}
