//! Trackfit - expense, training and todo tracking backend
//!
//! This library provides the HTTP service: per-user resources stored in a
//! document store, list queries served through a write-invalidated cache,
//! and authentication against an external identity provider.

pub mod cache;
pub mod config;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod resources;
pub mod routes;
pub mod store;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::info;

pub use crate::cache::{CacheBackend, CachedQueryGateway, InMemoryCache, RedisCache};
pub use crate::config::{BackendKind, Config};
pub use crate::identity::IdentityClient;
pub use crate::middleware::rate_limiter::ClientRateLimiter;
pub use crate::store::{DocumentStore, InMemoryDocumentStore, RedisDocumentStore};

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    pub cache: Arc<dyn CacheBackend>,
    pub store: Arc<dyn DocumentStore>,
    pub gateway: CachedQueryGateway,
    pub identity: Arc<IdentityClient>,
    /// Present only when rate limiting is enabled
    pub rate_limiter: Option<Arc<ClientRateLimiter>>,
}

async fn connect_redis(url: &str) -> Result<redis::aio::ConnectionManager> {
    let client = redis::Client::open(url)?;
    Ok(redis::aio::ConnectionManager::new(client).await?)
}

impl AppState {
    /// Create the application state, connecting to the configured backends
    pub async fn new(config: Config) -> Result<Self> {
        let redis = if config.uses_redis() {
            info!("Connecting to Redis");
            Some(connect_redis(&config.redis_url).await?)
        } else {
            None
        };

        let ttl = config.cache_ttl_seconds;
        let cache: Arc<dyn CacheBackend> = match &redis {
            Some(conn) if config.cache_backend == BackendKind::Redis => {
                Arc::new(RedisCache::new(conn.clone(), ttl))
            }
            _ => {
                let cache = Arc::new(InMemoryCache::new(ttl));
                cache.spawn_sweeper(Duration::from_secs(ttl.max(1)));
                cache
            }
        };

        let store: Arc<dyn DocumentStore> = match &redis {
            Some(conn) if config.store_backend == BackendKind::Redis => {
                Arc::new(RedisDocumentStore::new(conn.clone()))
            }
            _ => Arc::new(InMemoryDocumentStore::new()),
        };

        info!(
            cache = cache.backend_name(),
            store = store.backend_name(),
            "Backends initialized"
        );

        let state = Self::with_backends(config, cache, store)?;

        if let Some(limiter) = &state.rate_limiter {
            let limiter = Arc::downgrade(limiter);
            let every = Duration::from_secs(state.config.rate_limit_window_seconds.max(1));
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(every);
                loop {
                    interval.tick().await;
                    let Some(limiter) = limiter.upgrade() else {
                        break;
                    };
                    limiter.retain_recent();
                }
            });
        }

        Ok(state)
    }

    /// Create the application state over existing cache and store backends
    pub fn with_backends(
        config: Config,
        cache: Arc<dyn CacheBackend>,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .timeout(Duration::from_secs(30))
            .build()?;
        let identity = Arc::new(IdentityClient::new(http_client, &config));

        let rate_limiter = if config.rate_limit_enabled {
            Some(Arc::new(ClientRateLimiter::new(
                config.rate_limit_max_requests,
                config.rate_limit_window_seconds,
            )?))
        } else {
            None
        };

        let gateway = CachedQueryGateway::new(cache.clone(), store.clone());

        Ok(Self {
            config,
            start_time: Instant::now(),
            cache,
            store,
            gateway,
            identity,
            rate_limiter,
        })
    }
}
