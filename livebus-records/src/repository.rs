use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use livebus_core::{
    CallerContext, Document, DocumentStore, Filter, PlannerError, PlannerResult, StoredDocument, LEGACY_OWNER_FIELD,
    OWNER_FIELD,
};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::kind::Record;

/// A record together with its store-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct Saved<R> {
    pub id: String,
    pub record: R,
}

/// Decode a stored document. Never fails: unreadable fields take their
/// defaults.
pub fn decode<R: Record>(doc: StoredDocument) -> Saved<R> {
    decode_tracking_owner(doc).0
}

/// Like [`decode`], also reporting whether the document still carries a
/// legacy owner field.
fn decode_tracking_owner<R: Record>(doc: StoredDocument) -> (Saved<R>, bool) {
    let mut data = doc.data;
    let legacy = take_legacy_owner(&mut data);
    let record = match serde_json::from_value::<R>(Value::Object(data)) {
        Ok(record) => record,
        Err(e) => {
            warn!(id = %doc.id, collection = R::KIND.collection(), error = %e, "unreadable record, using defaults");
            R::default()
        }
    };
    (Saved { id: doc.id, record }, legacy)
}

/// Fold the legacy owner field into the current one. A non-blank current
/// owner wins.
fn take_legacy_owner(data: &mut Document) -> bool {
    let Some(legacy) = data.remove(LEGACY_OWNER_FIELD) else {
        return false;
    };
    if legacy.is_null() {
        return false;
    }
    let has_owner = matches!(data.get(OWNER_FIELD), Some(Value::String(owner)) if !owner.trim().is_empty());
    if !has_owner {
        data.insert(OWNER_FIELD.to_string(), legacy);
    }
    true
}

/// Serialize a record, adding its derived display name.
pub fn encode<R: Record>(record: &R) -> PlannerResult<Document> {
    let mut doc = match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return Err(PlannerError::generic(format!(
                "{} did not serialize to an object: {}",
                R::KIND.collection(),
                other
            )))
        }
        Err(e) => return Err(PlannerError::generic(e.to_string()).with_source(e.into())),
    };
    doc.insert(
        R::KIND.display_field().to_string(),
        Value::String(record.display_name()),
    );
    Ok(doc)
}

/// Owner-checked persistence of one record family.
pub struct RecordRepository<R> {
    store: Arc<dyn DocumentStore>,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for RecordRepository<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> RecordRepository<R> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    pub fn collection(&self) -> &'static str {
        R::KIND.collection()
    }

    /// Create a record owned by `caller`, or overwrite `existing_id`.
    ///
    /// On update the stored owner and `created_at` are kept; a record owned
    /// by someone else is `Unauthorized`, a missing one `NotFound`. The owner
    /// is always written under `ownerId` and a legacy `userId` is nulled.
    #[instrument(skip(self, caller, record), fields(collection = self.collection(), user = %caller.user_id()))]
    pub async fn save(&self, caller: &CallerContext, mut record: R, existing_id: Option<&str>) -> PlannerResult<String> {
        caller.ensure_authenticated()?;

        match existing_id {
            None => {
                record.set_owner_id(caller.user_id().to_string());
                record.set_created_at(Utc::now());
                let id = self.store.create(self.collection(), encode(&record)?).await?;
                info!(%id, "record created");
                Ok(id)
            }
            Some(id) => {
                let (existing, legacy_owner) = self.load(caller, id).await?;
                record.set_owner_id(existing.record.owner_id().to_string());
                record.set_created_at(existing.record.created_at());
                let mut doc = encode(&record)?;
                if legacy_owner {
                    doc.insert(LEGACY_OWNER_FIELD.to_string(), Value::Null);
                }
                self.store.update(self.collection(), id, doc).await?;
                info!(%id, "record updated");
                Ok(id.to_string())
            }
        }
    }

    /// One of the caller's records.
    pub async fn get(&self, caller: &CallerContext, id: &str) -> PlannerResult<Saved<R>> {
        Ok(self.load(caller, id).await?.0)
    }

    async fn load(&self, caller: &CallerContext, id: &str) -> PlannerResult<(Saved<R>, bool)> {
        caller.ensure_authenticated()?;

        let doc = self
            .store
            .get(self.collection(), id)
            .await?
            .ok_or_else(|| PlannerError::not_found(format!("{}/{} does not exist", self.collection(), id)))?;

        let (saved, legacy_owner) = decode_tracking_owner::<R>(doc);
        if !caller.owns(saved.record.owner_id()) {
            return Err(PlannerError::unauthorized(format!(
                "{}/{} belongs to another user",
                self.collection(),
                id
            )));
        }
        Ok((saved, legacy_owner))
    }

    /// The caller's records, newest first. Documents that only carry the
    /// legacy owner field are included.
    pub async fn list(&self, caller: &CallerContext) -> PlannerResult<Vec<Saved<R>>> {
        caller.ensure_authenticated()?;

        let current = Filter::owner(caller.user_id());
        let legacy = Filter::legacy_owner(caller.user_id());
        let (owned, legacy_owned) = futures::try_join!(
            self.store.query(self.collection(), &current),
            self.store.query(self.collection(), &legacy),
        )?;

        let mut seen = HashSet::new();
        let mut records: Vec<Saved<R>> = owned
            .into_iter()
            .chain(legacy_owned)
            .filter(|doc| seen.insert(doc.id.clone()))
            .map(decode::<R>)
            .filter(|saved| caller.owns(saved.record.owner_id()))
            .collect();
        records.sort_by(|a, b| b.record.created_at().cmp(&a.record.created_at()));
        debug!(count = records.len(), collection = self.collection(), "records listed");
        Ok(records)
    }

    /// Delete the document. Stored images are the caller's concern; see
    /// [`crate::RecordSubmitter::delete`].
    #[instrument(skip(self, caller), fields(collection = self.collection(), user = %caller.user_id()))]
    pub async fn remove(&self, caller: &CallerContext, id: &str) -> PlannerResult<()> {
        self.get(caller, id).await?;
        self.store.delete(self.collection(), id).await?;
        info!("record removed");
        Ok(())
    }

    /// Overwrite only the `images` field.
    pub async fn replace_images(&self, caller: &CallerContext, id: &str, images: Vec<String>) -> PlannerResult<()> {
        self.get(caller, id).await?;
        let mut patch = Document::new();
        patch.insert(
            "images".to_string(),
            Value::Array(images.into_iter().map(Value::String).collect()),
        );
        self.store.update(self.collection(), id, patch).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Accommodation, Budget, Trip};
    use livebus_core::{ErrorKind, MemoryDocumentStore};
    use serde_json::json;

    fn repo<R: Record>(store: &Arc<MemoryDocumentStore>) -> RecordRepository<R> {
        RecordRepository::new(store.clone())
    }

    fn trip(station: &str) -> Trip {
        Trip {
            from: "東京".into(),
            to: "大阪".into(),
            from_station: station.into(),
            to_station: "大阪駅".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_sets_owner_and_display_name() {
        let store = Arc::new(MemoryDocumentStore::new());
        let alice = CallerContext::new("alice");

        let id = repo::<Trip>(&store).save(&alice, trip("新宿"), None).await.unwrap();

        let doc = store.get("night_buses", &id).await.unwrap().unwrap();
        assert_eq!(doc.data["ownerId"], json!("alice"));
        assert_eq!(doc.data["tripName"], json!("新宿 → 大阪駅 (未定)"));
    }

    #[tokio::test]
    async fn update_keeps_owner_and_created_at() {
        let store = Arc::new(MemoryDocumentStore::new());
        let alice = CallerContext::new("alice");
        let trips = repo::<Trip>(&store);

        let id = trips.save(&alice, trip("新宿"), None).await.unwrap();
        let created = trips.get(&alice, &id).await.unwrap().record.created_at;

        trips.save(&alice, trip("池袋"), Some(&id)).await.unwrap();
        let saved = trips.get(&alice, &id).await.unwrap();
        assert_eq!(saved.record.from_station, "池袋");
        assert_eq!(saved.record.created_at, created);
        assert_eq!(saved.record.owner_id, "alice");
    }

    #[tokio::test]
    async fn other_users_cannot_touch_a_record() {
        let store = Arc::new(MemoryDocumentStore::new());
        let trips = repo::<Trip>(&store);
        let id = trips.save(&CallerContext::new("alice"), trip("新宿"), None).await.unwrap();
        let mallory = CallerContext::new("mallory");

        let err = trips.save(&mallory, trip("渋谷"), Some(&id)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        let err = trips.remove(&mallory, &id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        assert_eq!(store.len("night_buses"), 1);
    }

    #[tokio::test]
    async fn missing_records_are_not_found() {
        let store = Arc::new(MemoryDocumentStore::new());
        let err = repo::<Accommodation>(&store)
            .save(&CallerContext::new("alice"), Accommodation::default(), Some("gone"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn list_is_owner_scoped_and_newest_first() {
        let store = Arc::new(MemoryDocumentStore::new());
        for (id, owner, created) in [
            ("b1", "alice", "2024-01-01T00:00:00Z"),
            ("b2", "alice", "2024-06-01T00:00:00Z"),
            ("b3", "bob", "2024-07-01T00:00:00Z"),
        ] {
            let doc = json!({"ownerId": owner, "bus": "100", "createdAt": created});
            store.insert_with_id("budgets", id, doc.as_object().cloned().unwrap());
        }

        let budgets = repo::<Budget>(&store).list(&CallerContext::new("alice")).await.unwrap();
        let ids: Vec<_> = budgets.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, ["b2", "b1"]);
        assert_eq!(budgets[0].record.bus, 100.0);
    }

    fn seed(store: &MemoryDocumentStore, collection: &str, id: &str, data: serde_json::Value) {
        store.insert_with_id(collection, id, data.as_object().cloned().unwrap());
    }

    #[tokio::test]
    async fn legacy_owner_documents_are_listed_and_stay_editable() {
        let store = Arc::new(MemoryDocumentStore::new());
        seed(
            &store,
            "night_buses",
            "t-old",
            json!({"userId": "alice", "fromStation": "新宿", "createdAt": "2023-05-01T00:00:00Z"}),
        );
        let alice = CallerContext::new("alice");
        let trips = repo::<Trip>(&store);

        let listed = trips.list(&alice).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].record.owner_id, "alice");

        trips.save(&alice, trip("池袋"), Some("t-old")).await.unwrap();

        let doc = store.get("night_buses", "t-old").await.unwrap().unwrap();
        assert_eq!(doc.data["ownerId"], json!("alice"));
        assert_eq!(doc.data["userId"], Value::Null);

        let saved = trips.get(&alice, "t-old").await.unwrap();
        assert_eq!(saved.record.owner_id, "alice");
        assert_eq!(saved.record.from_station, "池袋");
        assert_eq!(trips.list(&alice).await.unwrap().len(), 1);

        trips.save(&alice, trip("渋谷"), Some("t-old")).await.unwrap();
        assert_eq!(trips.get(&alice, "t-old").await.unwrap().record.from_station, "渋谷");
    }

    #[tokio::test]
    async fn current_owner_field_wins_over_legacy() {
        let store = Arc::new(MemoryDocumentStore::new());
        seed(&store, "budgets", "b1", json!({"ownerId": "alice", "userId": "bob", "bus": 100}));
        let budgets = repo::<Budget>(&store);

        assert_eq!(budgets.get(&CallerContext::new("alice"), "b1").await.unwrap().record.owner_id, "alice");
        let err = budgets.get(&CallerContext::new("bob"), "b1").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        assert!(budgets.list(&CallerContext::new("bob")).await.unwrap().is_empty());
        assert_eq!(budgets.list(&CallerContext::new("alice")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn signed_out_callers_are_refused() {
        let store = Arc::new(MemoryDocumentStore::new());
        let err = repo::<Trip>(&store)
            .list(&CallerContext::new(""))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }
}
