//! Redis-backed document store.
//!
//! Each collection is one hash (`trackfit:store:{collection}`) mapping
//! document id to the JSON document. Queries load the candidate documents
//! and evaluate filters, ordering and paging in-process.
//!
//! Updates and deletes are compare-and-swap: a Lua script only replaces or
//! removes a document whose stored JSON is still the one that was read.
//! A lost race reloads and tries again.

use std::collections::HashMap;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::{AsyncCommands, Script};
use serde_json::Value;
use tracing::{debug, instrument};

use super::query::{
    apply_options, apply_set, compare_values, matches, stamp_new, CREATED_AT_FIELD,
};
use super::{Document, DocumentStore, Filter, FindOptions, StoreError, StoreResult, ID_FIELD};

/// Attempts at a conditional write before reporting a conflict
const WRITE_ATTEMPTS: usize = 8;

/// KEYS[1] = hash, ARGV = [id, expected JSON, replacement JSON]
static REPLACE_IF_UNCHANGED: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r"
        if redis.call('HGET', KEYS[1], ARGV[1]) ~= ARGV[2] then
            return 0
        end
        redis.call('HSET', KEYS[1], ARGV[1], ARGV[3])
        return 1
        ",
    )
});

/// KEYS[1] = hash, ARGV = [id, expected JSON]
static DELETE_IF_UNCHANGED: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r"
        if redis.call('HGET', KEYS[1], ARGV[1]) ~= ARGV[2] then
            return 0
        end
        return redis.call('HDEL', KEYS[1], ARGV[1])
        ",
    )
});

/// Hash key holding a collection
fn collection_key(collection: &str) -> String {
    format!("trackfit:store:{}", collection)
}

/// A document together with the exact JSON it was read from
struct Stored {
    raw: String,
    document: Document,
}

pub struct RedisDocumentStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisDocumentStore {
    pub fn new(conn: redis::aio::ConnectionManager) -> Self {
        Self { conn }
    }

    fn parse(raw: &str) -> StoreResult<Document> {
        match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::InvalidDocument(
                "stored value is not an object".to_string(),
            )),
        }
    }

    fn document_id(document: &Document) -> StoreResult<String> {
        document
            .get(ID_FIELD)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| StoreError::InvalidDocument("document has no _id".to_string()))
    }

    /// Load the documents that may match `filter`, in creation order.
    /// An `_id` condition short-circuits to a single hash lookup.
    async fn candidates(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Stored>> {
        let mut conn = self.conn.clone();
        let key = collection_key(collection);

        let id = filter
            .conditions()
            .iter()
            .find(|(field, _)| field == ID_FIELD)
            .and_then(|(_, value)| value.as_str());

        let raws: Vec<String> = match id {
            Some(id) => {
                let raw: Option<String> = conn.hget(&key, id).await?;
                raw.into_iter().collect()
            }
            None => {
                let all: HashMap<String, String> = conn.hgetall(&key).await?;
                all.into_values().collect()
            }
        };

        let mut stored = raws
            .into_iter()
            .map(|raw| {
                let document = Self::parse(&raw)?;
                Ok(Stored { raw, document })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        stored.retain(|s| matches(&s.document, filter));
        stored.sort_by(|a, b| {
            let null = Value::Null;
            let (a, b) = (&a.document, &b.document);
            compare_values(
                a.get(CREATED_AT_FIELD).unwrap_or(&null),
                b.get(CREATED_AT_FIELD).unwrap_or(&null),
            )
            .then_with(|| {
                compare_values(a.get(ID_FIELD).unwrap_or(&null), b.get(ID_FIELD).unwrap_or(&null))
            })
        });
        Ok(stored)
    }

    /// Replace the document stored under `id` only if it still reads `expected`
    async fn replace_if_unchanged(
        &self,
        key: &str,
        id: &str,
        expected: &str,
        replacement: &str,
    ) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let swapped: i64 = REPLACE_IF_UNCHANGED
            .key(key)
            .arg(id)
            .arg(expected)
            .arg(replacement)
            .invoke_async(&mut conn)
            .await?;
        Ok(swapped == 1)
    }

    /// Delete the document stored under `id` only if it still reads `expected`
    async fn delete_if_unchanged(&self, key: &str, id: &str, expected: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = DELETE_IF_UNCHANGED
            .key(key)
            .arg(id)
            .arg(expected)
            .invoke_async(&mut conn)
            .await?;
        Ok(removed == 1)
    }
}

#[async_trait]
impl DocumentStore for RedisDocumentStore {
    #[instrument(skip(self, filter, options), fields(collection = %collection))]
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let documents: Vec<Document> = self
            .candidates(collection, filter)
            .await?
            .into_iter()
            .map(|s| s.document)
            .collect();
        debug!(matched = documents.len(), "Loaded documents from Redis");
        Ok(apply_options(documents, options))
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.hget(collection_key(collection), id).await?;
        raw.map(|r| Self::parse(&r)).transpose()
    }

    async fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        if filter.conditions().is_empty() {
            let mut conn = self.conn.clone();
            let len: u64 = conn.hlen(collection_key(collection)).await?;
            return Ok(len);
        }
        Ok(self.candidates(collection, filter).await?.len() as u64)
    }

    #[instrument(skip(self, document), fields(collection = %collection))]
    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<Document> {
        let stamped = stamp_new(document);
        let id = Self::document_id(&stamped)?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .hset(
                collection_key(collection),
                id,
                serde_json::to_string(&stamped)?,
            )
            .await?;
        Ok(stamped)
    }

    #[instrument(skip(self, documents), fields(collection = %collection, count = documents.len()))]
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> StoreResult<Vec<Document>> {
        let stamped: Vec<Document> = documents.into_iter().map(stamp_new).collect();
        if stamped.is_empty() {
            return Ok(stamped);
        }

        let key = collection_key(collection);
        let mut pipe = redis::pipe();
        pipe.atomic();
        for document in &stamped {
            pipe.hset(&key, Self::document_id(document)?, serde_json::to_string(document)?)
                .ignore();
        }

        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(stamped)
    }

    #[instrument(skip(self, filter, update), fields(collection = %collection))]
    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        update: Document,
    ) -> StoreResult<Option<Document>> {
        let key = collection_key(collection);

        for _ in 0..WRITE_ATTEMPTS {
            let Some(Stored { raw, mut document }) =
                self.candidates(collection, filter).await?.into_iter().next()
            else {
                return Ok(None);
            };
            let id = Self::document_id(&document)?;
            apply_set(&mut document, update.clone());

            let replacement = serde_json::to_string(&document)?;
            if self
                .replace_if_unchanged(&key, &id, &raw, &replacement)
                .await?
            {
                return Ok(Some(document));
            }
            debug!(id = %id, "Document changed during update, reloading");
        }

        Err(StoreError::Conflict(format!(
            "{} kept changing during update",
            collection
        )))
    }

    #[instrument(skip(self, filter), fields(collection = %collection))]
    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> StoreResult<Option<Document>> {
        let key = collection_key(collection);

        for _ in 0..WRITE_ATTEMPTS {
            let Some(Stored { raw, document }) =
                self.candidates(collection, filter).await?.into_iter().next()
            else {
                return Ok(None);
            };
            let id = Self::document_id(&document)?;

            if self.delete_if_unchanged(&key, &id, &raw).await? {
                return Ok(Some(document));
            }
            debug!(id = %id, "Document changed during delete, reloading");
        }

        Err(StoreError::Conflict(format!(
            "{} kept changing during delete",
            collection
        )))
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
