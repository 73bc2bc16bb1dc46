//! Cache backend whose operations can be made to fail on demand

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use trackfit::cache::keys;
use trackfit::error::{AppError, AppResult};
use trackfit::{CacheBackend, InMemoryCache};

/// An [`InMemoryCache`] with switchable outages. Session entries are never
/// affected, so requests still authenticate while list caching is down.
pub struct FaultyCache {
    inner: InMemoryCache,
    fail_deletes: AtomicBool,
    fail_list_reads: AtomicBool,
}

impl FaultyCache {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            inner: InMemoryCache::new(ttl_seconds),
            fail_deletes: AtomicBool::new(false),
            fail_list_reads: AtomicBool::new(false),
        }
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn fail_list_reads(&self) {
        self.fail_list_reads.store(true, Ordering::SeqCst);
    }

    fn outage(&self, key: &str, flag: &AtomicBool) -> AppResult<()> {
        if flag.load(Ordering::SeqCst) && !key.starts_with(&keys::session("")) {
            return Err(AppError::Internal(anyhow::anyhow!("cache unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for FaultyCache {
    async fn get_raw(&self, key: &str) -> AppResult<Option<String>> {
        self.outage(key, &self.fail_list_reads)?;
        self.inner.get_raw(key).await
    }

    async fn set_raw(&self, key: &str, value: String, ttl_seconds: u64) -> AppResult<()> {
        self.inner.set_raw(key, value, ttl_seconds).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.outage(key, &self.fail_deletes)?;
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.inner.exists(key).await
    }

    fn default_ttl(&self) -> u64 {
        self.inner.default_ttl()
    }

    async fn ping(&self) -> AppResult<()> {
        self.inner.ping().await
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}
