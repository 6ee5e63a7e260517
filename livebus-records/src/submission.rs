//! Form submission: validate, clean up replaced images, upload, save.
//!
//! Progress is published as a single [`SubmissionState`] on a watch channel
//! so a client renders one value instead of juggling flags.

use std::sync::Arc;

use livebus_blob::{
    validate_batch, AssetCleaner, UploadCandidate, UploadCoordinator, UploadFailure,
};
use livebus_core::{CallerContext, DocumentStore, Locale, PlannerError, PlannerResult};
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use crate::form;
use crate::kind::Record;
use crate::repository::RecordRepository;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Validating,
    Cleaning,
    Uploading { files: usize },
    Saving,
    Succeeded { id: String },
    Failed { reason: String },
}

impl SubmissionState {
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SubmissionState::Validating
                | SubmissionState::Cleaning
                | SubmissionState::Uploading { .. }
                | SubmissionState::Saving
        )
    }
}

/// What to do with a record's images on save.
#[derive(Debug, Clone)]
pub enum ImageChange {
    /// Keep the stored images (none for a new record).
    Keep,
    /// Delete the stored images and upload these instead.
    Replace(Vec<UploadCandidate>),
}

#[derive(Debug, Clone)]
pub struct SubmissionReport {
    pub id: String,
    /// Image urls saved on the record.
    pub images: Vec<String>,
    /// Files skipped by a best-effort upload.
    pub failures: Vec<UploadFailure>,
}

impl SubmissionReport {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Runs create, edit and delete for one record family.
pub struct RecordSubmitter<R> {
    records: RecordRepository<R>,
    uploads: Arc<UploadCoordinator>,
    cleaner: AssetCleaner,
    locale: Locale,
    state: watch::Sender<SubmissionState>,
}

impl<R: Record> RecordSubmitter<R> {
    pub fn new(documents: Arc<dyn DocumentStore>, uploads: Arc<UploadCoordinator>) -> Self {
        let cleaner = AssetCleaner::new(uploads.store());
        let (state, _) = watch::channel(SubmissionState::Idle);
        Self {
            records: RecordRepository::new(documents),
            uploads,
            cleaner,
            locale: Locale::default(),
            state,
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn records(&self) -> &RecordRepository<R> {
        &self.records
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SubmissionState {
        self.state.borrow().clone()
    }

    fn publish(&self, state: SubmissionState) {
        self.state.send_replace(state);
    }

    fn fail(&self, err: PlannerError) -> PlannerError {
        self.publish(SubmissionState::Failed {
            reason: err.user_message(self.locale),
        });
        err
    }

    /// Save `record` as a new record, or over `existing_id`.
    #[instrument(skip(self, caller, record, images), fields(collection = R::KIND.collection(), user = %caller.user_id()))]
    pub async fn submit(
        &self,
        caller: &CallerContext,
        record: R,
        images: ImageChange,
        existing_id: Option<&str>,
    ) -> PlannerResult<SubmissionReport> {
        self.publish(SubmissionState::Validating);
        if let Err(err) = self.check(caller, &record, &images) {
            return Err(self.fail(err));
        }

        let existing = match existing_id {
            Some(id) => match self.records.get(caller, id).await {
                Ok(saved) => Some(saved),
                Err(err) => return Err(self.fail(err)),
            },
            None => None,
        };
        let old_images: Vec<String> = existing
            .as_ref()
            .map(|saved| saved.record.images().to_vec())
            .unwrap_or_default();

        let mut cleaned = false;
        let (urls, failures) = match images {
            ImageChange::Keep => (old_images, Vec::new()),
            ImageChange::Replace(candidates) => {
                cleaned = !old_images.is_empty();
                if cleaned {
                    self.publish(SubmissionState::Cleaning);
                    if let Err(err) = self.cleaner.delete_all(&old_images).await {
                        self.forget_images(caller, existing_id).await;
                        return Err(self.fail(err.into()));
                    }
                }

                match self.upload(caller, &candidates).await {
                    Ok(uploaded) => uploaded,
                    Err(err) => {
                        if cleaned {
                            self.forget_images(caller, existing_id).await;
                        }
                        return Err(self.fail(err));
                    }
                }
            }
        };

        self.publish(SubmissionState::Saving);
        let mut record = record;
        record.set_images(urls.clone());
        let id = match self.records.save(caller, record, existing_id).await {
            Ok(id) => id,
            Err(err) => {
                if existing.as_ref().map(|s| s.record.images()) != Some(urls.as_slice()) {
                    self.discard_uploads(&urls).await;
                }
                if cleaned {
                    self.forget_images(caller, existing_id).await;
                }
                return Err(self.fail(err));
            }
        };

        info!(%id, images = urls.len(), skipped = failures.len(), "record submitted");
        self.publish(SubmissionState::Succeeded { id: id.clone() });
        Ok(SubmissionReport {
            id,
            images: urls,
            failures,
        })
    }

    /// Delete a record: its images first, then the document.
    #[instrument(skip(self, caller), fields(collection = R::KIND.collection(), user = %caller.user_id()))]
    pub async fn delete(&self, caller: &CallerContext, id: &str) -> PlannerResult<()> {
        let saved = self.records.get(caller, id).await?;
        if let Err(err) = self.cleaner.delete_all(saved.record.images()).await {
            self.forget_images(caller, Some(id)).await;
            return Err(err.into());
        }
        self.records.remove(caller, id).await?;
        info!(%id, "record deleted");
        Ok(())
    }

    fn check(&self, caller: &CallerContext, record: &R, images: &ImageChange) -> PlannerResult<()> {
        caller.ensure_authenticated()?;
        form::check(record)?;

        if let ImageChange::Replace(candidates) = images {
            if R::KIND.image_prefix().is_none() && !candidates.is_empty() {
                return Err(PlannerError::validation(vec![format!(
                    "{}には画像を添付できません。",
                    R::KIND.label()
                )]));
            }
            validate_batch(candidates, self.uploads.rules()).map_err(|report| report.into_error(self.locale))?;
        }
        Ok(())
    }

    async fn upload(
        &self,
        caller: &CallerContext,
        candidates: &[UploadCandidate],
    ) -> PlannerResult<(Vec<String>, Vec<UploadFailure>)> {
        let Some(prefix) = R::KIND.image_prefix() else {
            return Ok((Vec::new(), Vec::new()));
        };
        if candidates.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        self.publish(SubmissionState::Uploading {
            files: candidates.len(),
        });
        let outcome = self
            .uploads
            .upload(caller, prefix, candidates, R::KIND.upload_policy())
            .await?;
        for failure in &outcome.failures {
            warn!(file = %failure.file_name, error = %failure.error, "image not saved");
        }
        let urls = outcome.urls();
        Ok((urls, outcome.failures))
    }

    /// Some or all of the stored images are gone; make sure the stored
    /// record stops pointing at them.
    async fn forget_images(&self, caller: &CallerContext, existing_id: Option<&str>) {
        let Some(id) = existing_id else { return };
        if let Err(e) = self.records.replace_images(caller, id, Vec::new()).await {
            error!(%id, error = %e, "could not clear images of record after failed cleanup");
        }
    }

    async fn discard_uploads(&self, urls: &[String]) {
        if let Err(e) = self.cleaner.delete_all(urls).await {
            error!(error = %e, "could not delete images of unsaved record");
        }
    }
}
