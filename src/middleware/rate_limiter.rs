//! Rate limiting middleware
//!
//! Per-client request limits with a keyed governor limiter. Clients are
//! identified by the first `x-forwarded-for` address, falling back to the
//! peer address.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter,
};
use tracing::warn;

use crate::{error::AppError, AppState};

/// Allows `max_requests` per window per client, refilling evenly
pub struct ClientRateLimiter {
    limiter: DefaultKeyedRateLimiter<String>,
    clock: DefaultClock,
}

impl ClientRateLimiter {
    pub fn new(max_requests: u32, window_seconds: u64) -> Result<Self> {
        let burst = NonZeroU32::new(max_requests)
            .ok_or_else(|| anyhow!("RATE_LIMIT_MAX_REQUESTS must be positive"))?;
        let quota = Quota::with_period(Duration::from_secs(window_seconds) / max_requests)
            .ok_or_else(|| anyhow!("RATE_LIMIT_WINDOW_SECONDS must be positive"))?
            .allow_burst(burst);

        Ok(Self {
            limiter: RateLimiter::keyed(quota),
            clock: DefaultClock::default(),
        })
    }

    /// Take one request from `client`'s allowance
    pub fn check(&self, client: &str) -> Result<(), AppError> {
        self.limiter
            .check_key(&client.to_string())
            .map_err(|not_until| {
                let wait = not_until.wait_time_from(self.clock.now());
                AppError::RateLimited {
                    retry_after_secs: wait.as_secs_f64().ceil() as u64,
                }
            })
    }

    /// Forget clients whose allowance has fully refilled
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
    }
}

/// Identify the client a request came from
fn client_key(request: &Request) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware
///
/// Passes every request through when no limiter is configured.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(limiter) = &state.rate_limiter {
        let client = client_key(&request);
        if let Err(e) = limiter.check(&client) {
            warn!(client = %client, "Rate limit exceeded");
            return Err(e);
        }
    }

    Ok(next.run(request).await)
}
