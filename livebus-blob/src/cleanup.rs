use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info, instrument};

use crate::{CleanupError, ObjectStore, StoreError};

/// Deletes the stored images of a record that is being edited or removed.
#[derive(Clone)]
pub struct AssetCleaner {
    store: Arc<dyn ObjectStore>,
}

impl AssetCleaner {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Delete every url concurrently and wait for all of them.
    ///
    /// A url whose object is already gone counts as deleted. Any other
    /// failure is logged, and once every deletion has settled the first one
    /// is reported together with the failure count.
    #[instrument(skip(self, urls), fields(count = urls.len()))]
    pub async fn delete_all(&self, urls: &[String]) -> Result<(), CleanupError> {
        if urls.is_empty() {
            return Ok(());
        }

        let results = join_all(urls.iter().map(|url| async move {
            match self.store.delete(url).await {
                Ok(()) | Err(StoreError::NotFound(_)) => Ok(()),
                Err(e) => {
                    error!(%url, error = %e, "failed to delete stored image");
                    Err(e)
                }
            }
        }))
        .await;

        let mut failures = results.into_iter().filter_map(Result::err);
        match failures.next() {
            None => {
                info!("stored images deleted");
                Ok(())
            }
            Some(first) => Err(CleanupError {
                total: urls.len(),
                failed: 1 + failures.count(),
                first,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryObjectStore, ObjectStore};
    use bytes::Bytes;

    async fn stored(store: &MemoryObjectStore, key: &str) -> String {
        let handle = store.put(key, "image/png", Bytes::from_static(b"png")).await.unwrap();
        store.url(&handle).await.unwrap()
    }

    #[tokio::test]
    async fn deletes_every_url() {
        let store = Arc::new(MemoryObjectStore::new());
        let a = stored(&store, "x/a.png").await;
        let b = stored(&store, "x/b.png").await;

        AssetCleaner::new(store.clone()).delete_all(&[a, b]).await.unwrap();
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn missing_objects_count_as_deleted() {
        let store = Arc::new(MemoryObjectStore::new());
        let url = stored(&store, "x/a.png").await;
        store.delete(&url).await.unwrap();

        assert!(AssetCleaner::new(store).delete_all(&[url]).await.is_ok());
    }

    #[tokio::test]
    async fn reports_failures_after_all_deletions_settle() {
        let store = Arc::new(MemoryObjectStore::new());
        let a = stored(&store, "x/a.png").await;
        let b = stored(&store, "x/b.png").await;
        store.fail_deletes("a.png", StoreError::backend("unavailable"));

        let err = AssetCleaner::new(store.clone()).delete_all(&[a, b.clone()]).await.unwrap_err();

        assert_eq!((err.failed, err.total), (1, 2));
        assert_eq!(store.delete_calls(), 2);
        assert!(!store.contains(&b));
    }
}
