use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::{ObjectHandle, StoreResult};

/// Object storage primitives - implemented by every storage backend
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write an object under `key`
    async fn put(&self, key: &str, content_type: &str, bytes: Bytes) -> StoreResult<ObjectHandle>;

    /// Durable retrieval URL for a stored object
    async fn url(&self, handle: &ObjectHandle) -> StoreResult<String>;

    /// Delete the object behind a URL previously returned by `url`
    async fn delete(&self, url: &str) -> StoreResult<()>;

    /// Delete a written object whose url was never handed out
    async fn delete_object(&self, handle: &ObjectHandle) -> StoreResult<()>;
}

/// Strategy for naming uploaded objects
pub trait ObjectKeyStrategy: Send + Sync {
    /// Generate a key for an upload under `prefix`. Every call must return a
    /// new key so no two records ever share an object.
    fn object_key(&self, prefix: &str, file_name: &str) -> String;
}

/// Default key strategy: `prefix/{millis}_{8 hex}_{sanitized name}`
#[derive(Debug, Clone, Default)]
pub struct DefaultKeyStrategy;

impl ObjectKeyStrategy for DefaultKeyStrategy {
    fn object_key(&self, prefix: &str, file_name: &str) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        let nonce = Uuid::new_v4().simple().to_string();
        let name = format!("{}_{}_{}", millis, &nonce[..8], sanitize_file_name(file_name));

        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        }
    }
}

/// Replace everything except ASCII letters, digits and `.` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
        .collect()
}
