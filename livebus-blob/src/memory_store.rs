use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::{ObjectHandle, ObjectStore, StoreError, StoreResult};

const DEFAULT_BASE_URL: &str = "memory://livebus";

#[derive(Clone)]
struct StoredObject {
    content_type: String,
    bytes: Bytes,
}

#[derive(Clone)]
struct Fault {
    fragment: String,
    error: StoreError,
    /// `None` fails forever.
    remaining: Option<usize>,
}

/// In-process object store for tests and local development.
///
/// Faults can be injected per key fragment to exercise retry and partial
/// failure paths.
#[derive(Clone)]
pub struct MemoryObjectStore {
    base_url: String,
    objects: Arc<RwLock<BTreeMap<String, StoredObject>>>,
    put_faults: Arc<RwLock<Vec<Fault>>>,
    url_faults: Arc<RwLock<Vec<Fault>>>,
    delete_faults: Arc<RwLock<Vec<Fault>>>,
    put_calls: Arc<AtomicUsize>,
    delete_calls: Arc<AtomicUsize>,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: Arc::default(),
            put_faults: Arc::default(),
            url_faults: Arc::default(),
            delete_faults: Arc::default(),
            put_calls: Arc::default(),
            delete_calls: Arc::default(),
        }
    }

    /// Every put whose key contains `fragment` fails with `error`.
    pub fn fail_puts<S: Into<String>>(&self, fragment: S, error: StoreError) {
        self.put_faults.write().push(Fault {
            fragment: fragment.into(),
            error,
            remaining: None,
        });
    }

    /// The next `times` puts whose key contains `fragment` fail with `error`.
    pub fn fail_puts_times<S: Into<String>>(&self, fragment: S, error: StoreError, times: usize) {
        self.put_faults.write().push(Fault {
            fragment: fragment.into(),
            error,
            remaining: Some(times),
        });
    }

    /// Every url lookup whose key contains `fragment` fails with `error`.
    pub fn fail_urls<S: Into<String>>(&self, fragment: S, error: StoreError) {
        self.url_faults.write().push(Fault {
            fragment: fragment.into(),
            error,
            remaining: None,
        });
    }

    /// Every delete whose url contains `fragment` fails with `error`.
    pub fn fail_deletes<S: Into<String>>(&self, fragment: S, error: StoreError) {
        self.delete_faults.write().push(Fault {
            fragment: fragment.into(),
            error,
            remaining: None,
        });
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Accepts either a key or a url produced by this store.
    pub fn contains(&self, key_or_url: &str) -> bool {
        let key = self.key_for(key_or_url).unwrap_or(key_or_url);
        self.objects.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects.read().get(key).map(|o| o.content_type.clone())
    }

    /// Raw bytes of a stored object.
    pub fn bytes(&self, key: &str) -> Option<Bytes> {
        self.objects.read().get(key).map(|o| o.bytes.clone())
    }

    fn key_for<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.base_url.as_str())?.strip_prefix('/')
    }

    fn injected(faults: &RwLock<Vec<Fault>>, target: &str) -> Option<StoreError> {
        let mut faults = faults.write();
        let position = faults.iter().position(|f| target.contains(&f.fragment))?;
        let fault = &mut faults[position];
        let error = fault.error.clone();
        let exhausted = match fault.remaining.as_mut() {
            Some(remaining) => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
            None => false,
        };
        if exhausted {
            faults.remove(position);
        }
        Some(error)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, content_type: &str, bytes: Bytes) -> StoreResult<ObjectHandle> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = Self::injected(&self.put_faults, key) {
            return Err(err);
        }

        let size_bytes = bytes.len() as u64;
        self.objects.write().insert(
            key.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                bytes,
            },
        );

        Ok(ObjectHandle {
            key: key.to_string(),
            size_bytes,
            etag: None,
        })
    }

    async fn url(&self, handle: &ObjectHandle) -> StoreResult<String> {
        if let Some(err) = Self::injected(&self.url_faults, &handle.key) {
            return Err(err);
        }
        if !self.objects.read().contains_key(&handle.key) {
            return Err(StoreError::NotFound(handle.key.clone()));
        }
        Ok(format!("{}/{}", self.base_url, handle.key))
    }

    async fn delete(&self, url: &str) -> StoreResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = Self::injected(&self.delete_faults, url) {
            return Err(err);
        }

        let key = self
            .key_for(url)
            .ok_or_else(|| StoreError::InvalidUrl(url.to_string()))?;

        match self.objects.write().remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    async fn delete_object(&self, handle: &ObjectHandle) -> StoreResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        match self.objects.write().remove(&handle.key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(handle.key.clone())),
        }
    }
}

impl std::fmt::Debug for MemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryObjectStore")
            .field("base_url", &self.base_url)
            .field("objects", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_url_delete() {
        let store = MemoryObjectStore::new();
        let handle = store
            .put("nightbus_images/1_a.jpg", "image/jpeg", Bytes::from_static(b"jpg"))
            .await
            .unwrap();
        let url = store.url(&handle).await.unwrap();

        assert_eq!(url, "memory://livebus/nightbus_images/1_a.jpg");
        assert_eq!(store.bytes("nightbus_images/1_a.jpg").unwrap(), Bytes::from_static(b"jpg"));

        store.delete(&url).await.unwrap();
        assert!(store.is_empty());
        assert!(matches!(store.delete(&url).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn foreign_urls_are_rejected() {
        let store = MemoryObjectStore::new();
        let err = store.delete("https://elsewhere.example/a.jpg").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn limited_faults_wear_off() {
        let store = MemoryObjectStore::new();
        store.fail_puts_times("a.jpg", StoreError::backend("flaky"), 2);

        assert!(store.put("a.jpg", "image/jpeg", Bytes::new()).await.is_err());
        assert!(store.put("a.jpg", "image/jpeg", Bytes::new()).await.is_err());
        assert!(store.put("a.jpg", "image/jpeg", Bytes::new()).await.is_ok());
        assert_eq!(store.put_calls(), 3);
    }
}
