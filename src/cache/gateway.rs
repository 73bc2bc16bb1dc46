//! Cached Query Gateway
//!
//! Per-user list queries are served cache-aside under `kind:userId`. Every
//! write through the gateway deletes the affected users' entries before it
//! returns, so the caller can only respond once the cache no longer holds
//! data older than the write.
//!
//! A read that misses and repopulates the cache may race a concurrent
//! write's invalidation and leave a stale entry behind; the TTL bounds how
//! long that entry survives.
//!
//! Read-modify-write changes go through [`CachedQueryGateway::modify`],
//! which only writes if the record's `__v` is still the one it read.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{keys, CacheBackend};
use crate::error::AppResult;
use crate::resources::{Resource, ResourceKind};
use crate::routes::metrics::{record_cache_operation, record_store_write};
use crate::store::query::{version_of, VERSION_FIELD};
use crate::store::{
    from_document, Document, DocumentStore, Filter, FindOptions, SortOrder, StoreError,
    OWNER_FIELD,
};

/// Attempts at a version-guarded write before reporting a conflict
const MODIFY_ATTEMPTS: usize = 5;

/// Pagination and sort parameters of a list request, as sent by the client
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub limit: Option<String>,
    pub page: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

/// Parse the leading integer of `raw`, ignoring anything after it.
/// `"5"` and `"5abc"` give 5; `"abc"` and `""` give `None`.
pub fn parse_int(raw: Option<&str>) -> Option<i64> {
    let raw = raw?.trim_start();
    let digits_end = raw
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(raw.len());
    raw[..digits_end].parse().ok()
}

impl ListQuery {
    fn sort(&self, kind: ResourceKind) -> (String, SortOrder) {
        let field = self
            .sort_by
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(kind.default_sort());
        let order = match self.order.as_deref() {
            Some(o) if o.eq_ignore_ascii_case("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        };
        (field.to_string(), order)
    }

    /// Options for a user's list query. Missing or non-positive limits mean
    /// unbounded; skip is only applied when both limit and page are valid.
    pub fn find_options(&self, kind: ResourceKind) -> FindOptions {
        let limit = parse_int(self.limit.as_deref()).filter(|l| *l > 0);
        let page = parse_int(self.page.as_deref());
        let skip = match (limit, page) {
            (Some(limit), Some(page)) => page.saturating_sub(1).saturating_mul(limit).max(0),
            _ => 0,
        };

        FindOptions {
            sort: Some(self.sort(kind)),
            skip: skip as u64,
            limit: limit.map(|l| l as u64),
            exclude: kind.hidden_fields().iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Page window for listings that default to page 1 of `default_limit`
    pub fn page_window(&self, kind: ResourceKind, default_limit: u64) -> PageWindow {
        let limit = parse_int(self.limit.as_deref())
            .filter(|l| *l > 0)
            .map(|l| l as u64)
            .unwrap_or(default_limit);
        let page = parse_int(self.page.as_deref())
            .filter(|p| *p > 0)
            .map(|p| p as u64)
            .unwrap_or(1);

        PageWindow {
            page,
            limit,
            options: FindOptions {
                sort: Some(self.sort(kind)),
                skip: (page - 1).saturating_mul(limit),
                limit: Some(limit),
                exclude: kind.hidden_fields().iter().map(|f| f.to_string()).collect(),
            },
        }
    }
}

/// A resolved page of a paginated listing
#[derive(Debug, Clone)]
pub struct PageWindow {
    pub page: u64,
    pub limit: u64,
    pub options: FindOptions,
}

impl PageWindow {
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}

/// Outcome of a cached list query
#[derive(Debug, Clone, PartialEq)]
pub enum Listing<T> {
    /// Served from the cache without touching the store
    Cached(Vec<T>),
    /// Read from the store and written to the cache
    Fresh(Vec<T>),
    /// The store holds nothing for this user; nothing was cached
    Empty,
}

/// Serves per-user list queries through the cache and keeps it consistent
/// with writes. Lists are cached for the backend's default TTL.
#[derive(Clone)]
pub struct CachedQueryGateway {
    cache: Arc<dyn CacheBackend>,
    store: Arc<dyn DocumentStore>,
}

impl CachedQueryGateway {
    pub fn new(cache: Arc<dyn CacheBackend>, store: Arc<dyn DocumentStore>) -> Self {
        Self { cache, store }
    }

    pub fn cache(&self) -> &Arc<dyn CacheBackend> {
        &self.cache
    }

    /// List `user_id`'s records of kind `R`
    #[instrument(skip(self, query), fields(kind = %R::KIND))]
    pub async fn list<R: Resource>(
        &self,
        user_id: &str,
        query: &ListQuery,
    ) -> AppResult<Listing<R::Listed>> {
        let kind = R::KIND;
        let key = keys::list(kind, user_id);

        if let Some(cached) = self.cache.get::<Vec<R::Listed>>(&key).await? {
            debug!(key = %key, "Serving list from cache");
            record_cache_operation(kind.as_str(), "list", "hit");
            return Ok(Listing::Cached(cached));
        }
        record_cache_operation(kind.as_str(), "list", "miss");

        let documents = self
            .store
            .find(
                kind.collection(),
                &Filter::eq(OWNER_FIELD, user_id),
                &query.find_options(kind),
            )
            .await?;

        if documents.is_empty() {
            return Ok(Listing::Empty);
        }

        let records = documents
            .into_iter()
            .map(from_document)
            .collect::<Result<Vec<R::Listed>, _>>()?;

        self.cache.set(&key, &records).await?;
        debug!(key = %key, count = records.len(), "Cached list");

        Ok(Listing::Fresh(records))
    }

    /// Uncached read of one record by id
    pub async fn find<R: Resource>(&self, id: &str) -> AppResult<Option<R>> {
        let found = self.store.find_by_id(R::KIND.collection(), id).await?;
        Ok(found.map(from_document).transpose()?)
    }

    /// Uncached page of records matching `filter`
    pub async fn find_page<R: Resource>(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> AppResult<Vec<R>> {
        let documents = self
            .store
            .find(R::KIND.collection(), filter, options)
            .await?;
        Ok(documents
            .into_iter()
            .map(from_document::<R>)
            .collect::<Result<_, _>>()?)
    }

    /// Count records of `kind` matching `filter`
    pub async fn count(&self, kind: ResourceKind, filter: &Filter) -> AppResult<u64> {
        Ok(self.store.count(kind.collection(), filter).await?)
    }

    /// Insert one record for `principal`
    #[instrument(skip(self, document), fields(kind = %R::KIND))]
    pub async fn create<R: Resource>(&self, principal: &str, document: Document) -> AppResult<R> {
        let inserted = self
            .store
            .insert_one(R::KIND.collection(), document)
            .await?;
        record_store_write(R::KIND.as_str(), "insert", 1);

        self.invalidate(R::KIND, principal).await?;
        Ok(from_document(inserted)?)
    }

    /// Insert a batch of records for `principal`, all or nothing
    #[instrument(skip(self, documents), fields(kind = %R::KIND, count = documents.len()))]
    pub async fn create_many<R: Resource>(
        &self,
        principal: &str,
        documents: Vec<Document>,
    ) -> AppResult<Vec<R>> {
        let inserted = self
            .store
            .insert_many(R::KIND.collection(), documents)
            .await?;
        record_store_write(R::KIND.as_str(), "insert", inserted.len() as u64);

        self.invalidate(R::KIND, principal).await?;
        Ok(inserted
            .into_iter()
            .map(from_document::<R>)
            .collect::<Result<_, _>>()?)
    }

    /// Apply `update` to the first record matching `filter`.
    ///
    /// The principal's entry is invalidated whether or not a record matched;
    /// the owner's entry is invalidated too when someone else owns the record.
    #[instrument(skip(self, filter, update), fields(kind = %R::KIND))]
    pub async fn update<R: Resource>(
        &self,
        principal: &str,
        filter: &Filter,
        update: Document,
    ) -> AppResult<Option<R>> {
        let updated = self
            .store
            .find_one_and_update(R::KIND.collection(), filter, update)
            .await?
            .map(from_document::<R>)
            .transpose()?;
        if updated.is_some() {
            record_store_write(R::KIND.as_str(), "update", 1);
        }

        self.invalidate_affected(principal, updated.as_ref()).await?;
        Ok(updated)
    }

    /// Read the first record matching `filter`, derive an update from it with
    /// `change`, and write it only if the record is unchanged since the read.
    /// A concurrent write makes it re-read and call `change` again, so
    /// `change` must be safe to repeat. Invalidates like
    /// [`update`](Self::update).
    #[instrument(skip(self, filter, change), fields(kind = %R::KIND))]
    pub async fn modify<R, F>(
        &self,
        principal: &str,
        filter: &Filter,
        change: F,
    ) -> AppResult<Option<R>>
    where
        R: Resource,
        F: Fn(R) -> AppResult<Document> + Send + Sync,
    {
        let collection = R::KIND.collection();
        let first = FindOptions {
            limit: Some(1),
            ..FindOptions::default()
        };

        for attempt in 1..=MODIFY_ATTEMPTS {
            let Some(document) = self
                .store
                .find(collection, filter, &first)
                .await?
                .into_iter()
                .next()
            else {
                self.invalidate_affected::<R>(principal, None).await?;
                return Ok(None);
            };

            let guard = filter.clone().and(VERSION_FIELD, version_of(&document));
            let update = change(from_document::<R>(document)?)?;

            let updated = self
                .store
                .find_one_and_update(collection, &guard, update)
                .await?
                .map(from_document::<R>)
                .transpose()?;
            if let Some(updated) = updated {
                record_store_write(R::KIND.as_str(), "update", 1);
                self.invalidate_affected(principal, Some(&updated)).await?;
                return Ok(Some(updated));
            }
            debug!(attempt, "Record changed since read, retrying");
        }

        warn!(kind = %R::KIND, "Giving up on a record under concurrent writes");
        self.invalidate_affected::<R>(principal, None).await?;
        Err(StoreError::Conflict(format!("{} was modified concurrently", R::KIND)).into())
    }

    /// Delete the first record matching `filter`, with the same invalidation
    /// as [`update`](Self::update)
    #[instrument(skip(self, filter), fields(kind = %R::KIND))]
    pub async fn delete<R: Resource>(
        &self,
        principal: &str,
        filter: &Filter,
    ) -> AppResult<Option<R>> {
        let deleted = self
            .store
            .find_one_and_delete(R::KIND.collection(), filter)
            .await?
            .map(from_document::<R>)
            .transpose()?;
        if deleted.is_some() {
            record_store_write(R::KIND.as_str(), "delete", 1);
        }

        self.invalidate_affected(principal, deleted.as_ref()).await?;
        Ok(deleted)
    }

    async fn invalidate_affected<R: Resource>(
        &self,
        principal: &str,
        record: Option<&R>,
    ) -> AppResult<()> {
        self.invalidate(R::KIND, principal).await?;
        if let Some(owner) = record.map(Resource::owner).filter(|o| *o != principal) {
            self.invalidate(R::KIND, owner).await?;
        }
        Ok(())
    }

    /// Drop the cached list of `kind` for `user_id`
    pub async fn invalidate(&self, kind: ResourceKind, user_id: &str) -> AppResult<()> {
        let key = keys::list(kind, user_id);
        self.cache.delete(&key).await?;
        record_cache_operation(kind.as_str(), "invalidate", "ok");
        debug!(key = %key, "Invalidated cached list");
        Ok(())
    }
}
