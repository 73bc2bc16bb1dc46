//! In-memory cache implementation
//!
//! The default cache backend: a process-local map with per-entry expiry.
//! Entries do not survive a restart.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::CacheBackend;
use crate::error::AppResult;

/// Entry in the in-memory cache with expiration
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }
}

/// In-memory cache
///
/// Stores serialized values in a HashMap and supports TTL-based expiration.
/// Expired entries are never returned; [`purge_expired`](Self::purge_expired)
/// reclaims their memory.
pub struct InMemoryCache {
    data: RwLock<HashMap<String, CacheEntry>>,
    default_ttl: u64,
}

impl InMemoryCache {
    /// Create a new in-memory cache with the specified default TTL
    pub fn new(default_ttl: u64) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Drop every expired entry, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut data = self.data.write().await;
        let before = data.len();
        data.retain(|_, entry| !entry.is_expired(now));
        before - data.len()
    }

    /// Periodically purge expired entries for as long as the cache is alive
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let purged = cache.purge_expired().await;
                if purged > 0 {
                    debug!(purged, "Purged expired cache entries");
                }
            }
        })
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn get_raw(&self, key: &str) -> AppResult<Option<String>> {
        let data = self.data.read().await;
        match data.get(key) {
            Some(entry) if !entry.is_expired(Instant::now()) => Ok(Some(entry.value.clone())),
            _ => Ok(None),
        }
    }

    async fn set_raw(&self, key: &str, value: String, ttl_seconds: u64) -> AppResult<()> {
        let expires_at = if ttl_seconds > 0 {
            Some(Instant::now() + Duration::from_secs(ttl_seconds))
        } else {
            None
        };

        let mut data = self.data.write().await;
        data.insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.data.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let data = self.data.read().await;
        Ok(data
            .get(key)
            .map(|entry| !entry.is_expired(Instant::now()))
            .unwrap_or(false))
    }

    fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
