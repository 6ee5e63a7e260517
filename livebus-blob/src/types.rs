use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A file picked in a form, not yet validated or uploaded.
#[derive(Clone)]
pub struct UploadCandidate {
    pub file_name: String,
    pub content_type: String,
    /// Declared size in bytes. Defaults to the payload length.
    pub size: u64,
    pub bytes: Bytes,
}

impl UploadCandidate {
    pub fn new<N, T, B>(file_name: N, content_type: T, bytes: B) -> Self
    where
        N: Into<String>,
        T: Into<String>,
        B: Into<Bytes>,
    {
        let bytes = bytes.into();
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            size: bytes.len() as u64,
            bytes,
        }
    }

    /// Override the declared size (what the client reported).
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }
}

impl std::fmt::Debug for UploadCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadCandidate")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Durable retrieval URL of an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredAsset(pub String);

impl StoredAsset {
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self(url.into())
    }

    pub fn url(&self) -> &str {
        &self.0
    }

    pub fn into_url(self) -> String {
        self.0
    }
}

impl std::fmt::Display for StoredAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a store hands back after a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHandle {
    pub key: String,
    pub size_bytes: u64,
    pub etag: Option<String>,
}

/// How a batch reacts to a single failed upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPolicy {
    /// All uploads run concurrently; one failure fails the batch.
    Strict,
    /// Uploads run one after another; failures are collected and the batch
    /// only fails when nothing made it.
    BestEffort,
}
