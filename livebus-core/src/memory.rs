use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::documents::{Document, DocumentError, DocumentResult, DocumentStore, Filter, StoredDocument};

type Collections = HashMap<String, BTreeMap<String, Document>>;

/// In-memory document store for development and tests.
///
/// Ids are random like the hosted store's, so callers cannot rely on them
/// being ordered.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    /// Insert with a chosen id, for seeding fixtures.
    pub fn insert_with_id(&self, collection: &str, id: &str, data: Document) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, collection: &str, data: Document) -> DocumentResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        self.insert_with_id(collection, &id, data);
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, data: Document) -> DocumentResult<()> {
        let mut collections = self.collections.write();
        let existing = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| DocumentError::not_found(collection, id))?;
        // Field-level merge, like the hosted store's update.
        for (key, value) in data {
            existing.insert(key, value);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> DocumentResult<()> {
        let mut collections = self.collections.write();
        collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .map(|_| ())
            .ok_or_else(|| DocumentError::not_found(collection, id))
    }

    async fn get(&self, collection: &str, id: &str) -> DocumentResult<Option<StoredDocument>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| StoredDocument {
                id: id.to_string(),
                data: data.clone(),
            }))
    }

    async fn query(&self, collection: &str, filter: &Filter) -> DocumentResult<Vec<StoredDocument>> {
        let collections = self.collections.read();
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|(id, data)| filter.matches(id, data))
            .map(|(id, data)| StoredDocument {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn create_then_query_by_owner() {
        let store = MemoryDocumentStore::new();
        let mine = store.create("budgets", doc(json!({"ownerId": "u1"}))).await.unwrap();
        store.create("budgets", doc(json!({"ownerId": "u2"}))).await.unwrap();

        let found = store.query("budgets", &Filter::owner("u1")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, mine);
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let store = MemoryDocumentStore::new();
        let id = store
            .create("budgets", doc(json!({"ownerId": "u1", "bus": 100})))
            .await
            .unwrap();
        store.update("budgets", &id, doc(json!({"bus": 200}))).await.unwrap();

        let stored = store.get("budgets", &id).await.unwrap().unwrap();
        assert_eq!(stored.data["bus"], 200);
        assert_eq!(stored.data["ownerId"], "u1");
    }

    #[tokio::test]
    async fn missing_documents_are_reported() {
        let store = MemoryDocumentStore::new();
        assert!(store.get("budgets", "nope").await.unwrap().is_none());
        assert!(matches!(
            store.update("budgets", "nope", Document::new()).await,
            Err(DocumentError::NotFound { .. })
        ));
        assert!(matches!(
            store.delete("budgets", "nope").await,
            Err(DocumentError::NotFound { .. })
        ));
    }
}
