//! Cache module
//!
//! TTL key/value caching behind [`CacheBackend`], with in-memory and Redis
//! implementations, and the [`CachedQueryGateway`] that serves per-user
//! list queries through it.

pub mod gateway;
pub mod in_memory;
pub mod keys;
pub mod redis;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::AppResult;

pub use self::gateway::{CachedQueryGateway, ListQuery, Listing};
pub use self::in_memory::InMemoryCache;
pub use self::redis::RedisCache;

/// A TTL key/value store holding serialized values
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get the raw serialized value, if present and not expired
    async fn get_raw(&self, key: &str) -> AppResult<Option<String>>;

    /// Store a serialized value. A TTL of 0 never expires.
    async fn set_raw(&self, key: &str, value: String, ttl_seconds: u64) -> AppResult<()>;

    /// Delete a key from cache
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check if a key exists (and is not expired)
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// TTL applied by `set`
    fn default_ttl(&self) -> u64;

    /// Check the backend is reachable
    async fn ping(&self) -> AppResult<()>;

    /// Name used in health reports
    fn backend_name(&self) -> &'static str;
}

impl dyn CacheBackend {
    /// Get a value from cache
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        match self.get_raw(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Set a value in cache with default TTL
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> AppResult<()> {
        let ttl = self.default_ttl();
        self.set_with_ttl(key, value, ttl).await
    }

    /// Set a value in cache with custom TTL
    pub async fn set_with_ttl<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> AppResult<()> {
        let serialized = serde_json::to_string(value)?;
        self.set_raw(key, serialized, ttl_seconds).await
    }
}
