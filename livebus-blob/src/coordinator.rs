use std::sync::Arc;

use futures::future::join_all;
use livebus_core::CallerContext;
use tracing::{debug, info, instrument, warn};

use crate::{
    retry_with_backoff, validate_batch, DefaultKeyStrategy, ObjectKeyStrategy, ObjectStore, RetryPolicy,
    StoredAsset, UploadCandidate, UploadError, UploadPolicy, UploadRules,
};

/// A file that could not be stored in a best-effort batch.
#[derive(Debug, Clone)]
pub struct UploadFailure {
    /// Position of the file in the submitted batch.
    pub index: usize,
    pub file_name: String,
    pub error: UploadError,
}

/// Result of a batch upload.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Stored assets in input order, failed files omitted.
    pub assets: Vec<StoredAsset>,
    /// Always empty under [`UploadPolicy::Strict`].
    pub failures: Vec<UploadFailure>,
}

impl BatchOutcome {
    pub fn urls(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.url().to_string()).collect()
    }

    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Validates, uploads and names the images of one form submission.
pub struct UploadCoordinator {
    store: Arc<dyn ObjectStore>,
    keys: Arc<dyn ObjectKeyStrategy>,
    rules: UploadRules,
    retry: RetryPolicy,
}

impl UploadCoordinator {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            keys: Arc::new(DefaultKeyStrategy),
            rules: UploadRules::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_rules(mut self, rules: UploadRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_key_strategy<K: ObjectKeyStrategy + 'static>(mut self, keys: K) -> Self {
        self.keys = Arc::new(keys);
        self
    }

    pub fn rules(&self) -> &UploadRules {
        &self.rules
    }

    pub fn store(&self) -> Arc<dyn ObjectStore> {
        self.store.clone()
    }

    /// Validate the batch, then upload it under `prefix` with the given policy.
    ///
    /// Nothing touches the store when validation fails. An empty batch
    /// succeeds with no assets.
    #[instrument(skip(self, caller, candidates), fields(user = %caller.user_id(), files = candidates.len()))]
    pub async fn upload(
        &self,
        caller: &CallerContext,
        prefix: &str,
        candidates: &[UploadCandidate],
        policy: UploadPolicy,
    ) -> Result<BatchOutcome, UploadError> {
        if !caller.is_authenticated() {
            return Err(UploadError::Unauthorized { file_name: None });
        }

        validate_batch(candidates, &self.rules).map_err(UploadError::Rejected)?;

        if candidates.is_empty() {
            return Ok(BatchOutcome::default());
        }

        match policy {
            UploadPolicy::Strict => self.upload_strict(prefix, candidates).await,
            UploadPolicy::BestEffort => self.upload_best_effort(prefix, candidates).await,
        }
    }

    /// All uploads start together; the first failure (by input position)
    /// fails the batch and everything that did land is deleted again.
    async fn upload_strict(&self, prefix: &str, candidates: &[UploadCandidate]) -> Result<BatchOutcome, UploadError> {
        let results = join_all(candidates.iter().map(|c| self.upload_one(prefix, c))).await;

        let mut assets = Vec::with_capacity(results.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(asset) => assets.push(asset),
                Err(err) if first_error.is_none() => first_error = Some(err),
                Err(_) => {}
            }
        }

        match first_error {
            None => {
                info!(count = assets.len(), "batch stored");
                Ok(BatchOutcome {
                    assets,
                    failures: Vec::new(),
                })
            }
            Some(err) => {
                warn!(error = %err, stored = assets.len(), "strict batch failed, discarding stored images");
                self.discard(&assets).await;
                Err(err)
            }
        }
    }

    /// One upload at a time, in input order. Failures are collected.
    async fn upload_best_effort(
        &self,
        prefix: &str,
        candidates: &[UploadCandidate],
    ) -> Result<BatchOutcome, UploadError> {
        let mut outcome = BatchOutcome::default();

        for (index, candidate) in candidates.iter().enumerate() {
            match self.upload_one(prefix, candidate).await {
                Ok(asset) => outcome.assets.push(asset),
                Err(error) => {
                    warn!(index, file = %candidate.file_name, error = %error, "image skipped");
                    outcome.failures.push(UploadFailure {
                        index,
                        file_name: candidate.file_name.clone(),
                        error,
                    });
                }
            }
        }

        if outcome.assets.is_empty() {
            return Err(UploadError::AllFailed {
                failures: outcome.failures,
            });
        }

        info!(stored = outcome.assets.len(), failed = outcome.failures.len(), "batch stored");
        Ok(outcome)
    }

    async fn upload_one(&self, prefix: &str, candidate: &UploadCandidate) -> Result<StoredAsset, UploadError> {
        let key = self.keys.object_key(prefix, &candidate.file_name);
        debug!(%key, size = candidate.size, "uploading image");

        let handle = retry_with_backoff(&self.retry, || {
            self.store
                .put(&key, &candidate.content_type, candidate.bytes.clone())
        })
        .await
        .map_err(|e| UploadError::from_store(&candidate.file_name, e))?;

        let url = match self.store.url(&handle).await {
            Ok(url) => url,
            Err(e) => {
                if let Err(cleanup) = self.store.delete_object(&handle).await {
                    warn!(key = %handle.key, error = %cleanup, "could not discard image without url");
                }
                return Err(UploadError::from_store(&candidate.file_name, e));
            }
        };

        Ok(StoredAsset::new(url))
    }

    async fn discard(&self, assets: &[StoredAsset]) {
        let deletions = assets.iter().map(|asset| async move {
            if let Err(e) = self.store.delete(asset.url()).await {
                warn!(url = %asset, error = %e, "could not discard image from failed batch");
            }
        });
        join_all(deletions).await;
    }
}
