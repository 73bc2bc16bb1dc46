//! Redis cache implementation
//!
//! Shares cached listings across instances. Keys are namespaced under
//! `trackfit:cache:`.

use async_trait::async_trait;
use redis::AsyncCommands;

use super::CacheBackend;
use crate::error::AppResult;

const KEY_PREFIX: &str = "trackfit:cache:";

fn namespaced(key: &str) -> String {
    format!("{}{}", KEY_PREFIX, key)
}

/// Redis cache wrapper
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
    default_ttl: u64,
}

impl RedisCache {
    /// Create a new Redis cache
    pub fn new(conn: redis::aio::ConnectionManager, default_ttl: u64) -> Self {
        Self { conn, default_ttl }
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get_raw(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(namespaced(key)).await?;
        Ok(value)
    }

    async fn set_raw(&self, key: &str, value: String, ttl_seconds: u64) -> AppResult<()> {
        let mut conn = self.conn.clone();
        if ttl_seconds > 0 {
            let _: () = conn.set_ex(namespaced(key), value, ttl_seconds).await?;
        } else {
            let _: () = conn.set(namespaced(key), value).await?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(namespaced(key)).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(namespaced(key)).await?;
        Ok(exists)
    }

    fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    async fn ping(&self) -> AppResult<()> {
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
