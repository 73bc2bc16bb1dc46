//! Configuration management for Trackfit
//!
//! Configuration is loaded from environment variables.

use std::env;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// Which implementation backs a pluggable component (cache or document store)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Redis,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => bail!("unknown backend '{}', expected 'memory' or 'redis'", other),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Allowed CORS origin; any origin when unset
    pub cors_origin: Option<String>,
    /// Maximum accepted request body size
    pub body_limit_bytes: usize,

    /// Backend for the list cache
    pub cache_backend: BackendKind,
    /// Backend for the document store
    pub store_backend: BackendKind,
    /// Redis connection URL (used by any Redis-backed component)
    pub redis_url: String,

    /// TTL for cached list queries (in seconds)
    pub cache_ttl_seconds: u64,
    /// TTL for cached session-token verification (in seconds)
    pub token_cache_ttl_seconds: u64,

    /// Identity provider base URL
    pub identity_api_url: String,
    /// Secret key for server-to-server identity provider calls
    pub identity_secret_key: String,

    /// Enable per-client rate limiting
    pub rate_limit_enabled: bool,
    /// Requests allowed per client per window
    pub rate_limit_max_requests: u32,
    /// Rate limit window (in seconds)
    pub rate_limit_window_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let config = Self {
            host: env::var("TRACKFIT_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("TRACKFIT_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid TRACKFIT_PORT")?,
            cors_origin: env::var("CORS_ORIGIN").ok().filter(|v| !v.is_empty()),
            body_limit_bytes: env::var("BODY_LIMIT_BYTES")
                .unwrap_or_else(|_| "16384".to_string())
                .parse()
                .context("Invalid BODY_LIMIT_BYTES")?,

            cache_backend: env::var("CACHE_BACKEND")
                .unwrap_or_else(|_| "memory".to_string())
                .parse()
                .context("Invalid CACHE_BACKEND")?,
            store_backend: env::var("STORE_BACKEND")
                .unwrap_or_else(|_| "memory".to_string())
                .parse()
                .context("Invalid STORE_BACKEND")?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),

            cache_ttl_seconds: env::var("CACHE_TTL_SECONDS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .context("Invalid CACHE_TTL_SECONDS")?,
            token_cache_ttl_seconds: env::var("TOKEN_CACHE_TTL_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid TOKEN_CACHE_TTL_SECONDS")?,

            identity_api_url: env::var("IDENTITY_API_URL")
                .context("IDENTITY_API_URL must be set")?,
            identity_secret_key: env::var("IDENTITY_SECRET_KEY")
                .context("IDENTITY_SECRET_KEY must be set")?,

            rate_limit_enabled: env::var("RATE_LIMIT_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            rate_limit_max_requests: env::var("RATE_LIMIT_MAX_REQUESTS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .context("Invalid RATE_LIMIT_MAX_REQUESTS")?,
            rate_limit_window_seconds: env::var("RATE_LIMIT_WINDOW_SECONDS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .context("Invalid RATE_LIMIT_WINDOW_SECONDS")?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that parse but cannot work. A zero TTL would make
    /// cache entries live forever.
    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl_seconds == 0 {
            bail!("CACHE_TTL_SECONDS must be at least 1");
        }
        if self.token_cache_ttl_seconds == 0 {
            bail!("TOKEN_CACHE_TTL_SECONDS must be at least 1");
        }
        Ok(())
    }

    /// Configuration with in-memory backends pointing at the given identity provider
    pub fn for_identity(identity_api_url: &str, identity_secret_key: &str) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origin: None,
            body_limit_bytes: 16 * 1024,
            cache_backend: BackendKind::Memory,
            store_backend: BackendKind::Memory,
            redis_url: "redis://localhost:6379".to_string(),
            cache_ttl_seconds: 600,
            token_cache_ttl_seconds: 300,
            identity_api_url: identity_api_url.to_string(),
            identity_secret_key: identity_secret_key.to_string(),
            rate_limit_enabled: false,
            rate_limit_max_requests: 100,
            rate_limit_window_seconds: 600,
        }
    }

    /// Whether any component needs a Redis connection
    pub fn uses_redis(&self) -> bool {
        self.cache_backend == BackendKind::Redis || self.store_backend == BackendKind::Redis
    }
}
