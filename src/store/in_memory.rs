//! In-memory document store.
//!
//! Documents live in per-collection vectors in insertion order. Data is not
//! persisted and is lost when the store is dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::instrument;

use super::query::{apply_options, apply_set, matches, stamp_new};
use super::{Document, DocumentStore, Filter, FindOptions, StoreResult, ID_FIELD};

#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
    reads: Arc<AtomicU64>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `find` calls served so far
    pub fn find_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    #[instrument(skip(self, filter, options), fields(collection = %collection))]
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let collections = self.collections.read().await;
        let matched: Vec<Document> = collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches(d, filter)).cloned().collect())
            .unwrap_or_default();
        Ok(apply_options(matched, options))
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|docs| {
            docs.iter()
                .find(|d| d.get(ID_FIELD).and_then(|v| v.as_str()) == Some(id))
                .cloned()
        }))
    }

    async fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches(d, filter)).count() as u64)
            .unwrap_or(0))
    }

    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<Document> {
        let stamped = stamp_new(document);
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(stamped.clone());
        Ok(stamped)
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> StoreResult<Vec<Document>> {
        let stamped: Vec<Document> = documents.into_iter().map(stamp_new).collect();
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .extend(stamped.iter().cloned());
        Ok(stamped)
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        update: Document,
    ) -> StoreResult<Option<Document>> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(None);
        };
        match docs.iter_mut().find(|d| matches(d, filter)) {
            Some(doc) => {
                apply_set(doc, update);
                Ok(Some(doc.clone()))
            }
            None => Ok(None),
        }
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> StoreResult<Option<Document>> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(None);
        };
        match docs.iter().position(|d| matches(d, filter)) {
            Some(index) => Ok(Some(docs.remove(index))),
            None => Ok(None),
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
