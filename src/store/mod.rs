//! Document store
//!
//! Collections of JSON documents with the small query surface the handlers
//! need: equality filters, sort/skip/limit, and id-addressed mutations.
//! The store assigns `_id`, `createdAt`, `updatedAt` and `__v`.

pub mod in_memory;
pub mod query;
pub mod redis;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use self::in_memory::InMemoryDocumentStore;
pub use self::redis::RedisDocumentStore;

/// A stored document
pub type Document = Map<String, Value>;

/// Field holding the document id
pub const ID_FIELD: &str = "_id";
/// Field holding the owning principal
pub const OWNER_FIELD: &str = "userId";

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(String),

    /// The document kept changing underneath a conditional write
    #[error("Write conflict: {0}")]
    Conflict(String),
}

impl From<::redis::RedisError> for StoreError {
    fn from(err: ::redis::RedisError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Conjunction of field equality conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// Filter that matches every document
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter on a single field
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::all().and(field, value)
    }

    /// Filter on the document id
    pub fn by_id(id: &str) -> Self {
        Self::eq(ID_FIELD, id)
    }

    /// Add another equality condition
    pub fn and(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push((field.to_string(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Options applied to a `find`
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Field to sort by, and direction
    pub sort: Option<(String, SortOrder)>,
    pub skip: u64,
    /// `None` means unbounded
    pub limit: Option<u64>,
    /// Fields removed from every returned document
    pub exclude: Vec<String>,
}

/// A collection-oriented document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Find documents matching `filter`, then sort, skip, limit and project.
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>>;

    /// Find a document by id
    async fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Count documents matching `filter`
    async fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    /// Insert one document; returns it with id and timestamps assigned
    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<Document>;

    /// Insert all documents or none
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> StoreResult<Vec<Document>>;

    /// Set `update`'s fields on the first document matching `filter` and
    /// bump its `__v`, as one atomic step. Returns the updated document.
    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        update: Document,
    ) -> StoreResult<Option<Document>>;

    /// Delete the first document matching `filter`, returning it. Atomic
    /// like [`find_one_and_update`](Self::find_one_and_update).
    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> StoreResult<Option<Document>>;

    /// Check the backend is reachable
    async fn ping(&self) -> StoreResult<()>;

    /// Name used in health reports
    fn backend_name(&self) -> &'static str;
}

/// Serialize a value into a document
pub fn to_document<T: serde::Serialize>(value: &T) -> StoreResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

/// Deserialize a stored document
pub fn from_document<T: serde::de::DeserializeOwned>(document: Document) -> StoreResult<T> {
    Ok(serde_json::from_value(Value::Object(document))?)
}
