use std::sync::Arc;
use std::time::Duration;

use livebus_blob::prelude::*;
use livebus_blob::{Rejection, StoreError};
use livebus_core::{CallerContext, ErrorKind, PlannerError};

fn jpeg(name: &str) -> UploadCandidate {
    UploadCandidate::new(name, "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0])
}

fn caller() -> CallerContext {
    CallerContext::new("user-42")
}

#[tokio::test]
async fn oversized_file_never_reaches_the_store() {
    let store = Arc::new(MemoryObjectStore::new());
    let uploads = UploadCoordinator::new(store.clone());
    let huge = jpeg("huge.jpg").with_size(6 * 1024 * 1024);

    let err = uploads
        .upload(&caller(), "nightbus_images", &[huge], UploadPolicy::BestEffort)
        .await
        .unwrap_err();

    match &err {
        UploadError::Rejected(report) => {
            assert!(matches!(report.rejections[0], Rejection::TooLarge { .. }))
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(store.put_calls(), 0);

    let planner: PlannerError = err.into();
    assert_eq!(planner.kind, ErrorKind::Validation);
    assert_eq!(planner.reasons.len(), 1);
}

#[tokio::test]
async fn mixed_batch_with_bad_type_uploads_nothing() {
    let store = Arc::new(MemoryObjectStore::new());
    let uploads = UploadCoordinator::new(store.clone());
    let batch = [jpeg("valid.jpg"), UploadCandidate::new("bad.txt", "text/plain", "hi")];

    let err = uploads
        .upload(&caller(), "accommodation_images", &batch, UploadPolicy::Strict)
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Rejected(_)));
    assert_eq!(store.put_calls(), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn eleven_files_are_too_many() {
    let store = Arc::new(MemoryObjectStore::new());
    let uploads = UploadCoordinator::new(store.clone());
    let batch: Vec<_> = (0..11).map(|i| jpeg(&format!("{i}.jpg"))).collect();

    let err = uploads
        .upload(&caller(), "nightbus_images", &batch, UploadPolicy::BestEffort)
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Rejected(ref r) if r.rejections == vec![Rejection::TooMany { count: 11, max: 10 }]));
    assert_eq!(store.put_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn strict_batch_fails_when_second_file_fails() {
    let store = Arc::new(MemoryObjectStore::new());
    store.fail_puts("second.jpg", StoreError::backend("connection reset"));
    let uploads = UploadCoordinator::new(store.clone());

    let err = uploads
        .upload(
            &caller(),
            "accommodation_images",
            &[jpeg("first.jpg"), jpeg("second.jpg"), jpeg("third.jpg")],
            UploadPolicy::Strict,
        )
        .await
        .unwrap_err();

    assert_eq!(err.file_name(), Some("second.jpg"));
    // first and third were stored, then discarded with the batch
    assert!(store.is_empty());
    // 3 attempts for the failing file, 1 each for the others
    assert_eq!(store.put_calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn best_effort_batch_keeps_what_landed() {
    let store = Arc::new(MemoryObjectStore::new());
    store.fail_puts("second.jpg", StoreError::backend("connection reset"));
    let uploads = UploadCoordinator::new(store.clone());

    let outcome = uploads
        .upload(
            &caller(),
            "nightbus_images",
            &[jpeg("first.jpg"), jpeg("second.jpg"), jpeg("third.jpg")],
            UploadPolicy::BestEffort,
        )
        .await
        .unwrap();

    let urls = outcome.urls();
    assert_eq!(urls.len(), 2);
    assert!(urls[0].ends_with("_first.jpg"));
    assert!(urls[1].ends_with("_third.jpg"));
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].file_name, "second.jpg");
    assert_eq!(store.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried() {
    let store = Arc::new(MemoryObjectStore::new());
    store.fail_puts_times("flaky.jpg", StoreError::backend("503"), 2);
    let uploads = UploadCoordinator::new(store.clone());

    let started = tokio::time::Instant::now();
    let outcome = uploads
        .upload(&caller(), "nightbus_images", &[jpeg("flaky.jpg")], UploadPolicy::Strict)
        .await
        .unwrap();

    assert_eq!(outcome.assets.len(), 1);
    assert_eq!(store.put_calls(), 3);
    assert!(started.elapsed() >= Duration::from_millis(3000));
}

#[tokio::test]
async fn uploaded_urls_can_be_cleaned_up() {
    let store = Arc::new(MemoryObjectStore::new());
    let uploads = UploadCoordinator::new(store.clone());

    let outcome = uploads
        .upload(&caller(), "nightbus_images", &[jpeg("a.jpg"), jpeg("b.jpg")], UploadPolicy::Strict)
        .await
        .unwrap();
    assert_eq!(store.len(), 2);

    AssetCleaner::new(store.clone())
        .delete_all(&outcome.urls())
        .await
        .unwrap();
    assert!(store.is_empty());
}
