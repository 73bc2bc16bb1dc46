//! Health check endpoints
//!
//! Provides endpoints for monitoring and container orchestration:
//! - `/health` - Full health check with dependency status
//! - `/health/ready` - Readiness check
//! - `/health/live` - Liveness check

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

/// Health of the service or one of its backends
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    fn status_code(self) -> StatusCode {
        match self {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Individual dependency check result
#[derive(Debug, Serialize)]
pub struct DependencyCheck {
    pub status: HealthStatus,
    pub backend: &'static str,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Dependency checks collection
#[derive(Debug, Serialize)]
pub struct DependencyChecks {
    pub cache: DependencyCheck,
    pub store: DependencyCheck,
}

/// Full health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: String,
    pub checks: DependencyChecks,
}

/// Body of the liveness and readiness checks
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: HealthStatus,
}

fn status_response(status: HealthStatus) -> (StatusCode, Json<StatusResponse>) {
    (status.status_code(), Json(StatusResponse { status }))
}

impl DependencyCheck {
    fn from_ping<E: std::fmt::Display>(
        backend: &'static str,
        start: Instant,
        result: Result<(), E>,
    ) -> Self {
        let latency_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(()) => Self {
                status: HealthStatus::Healthy,
                backend,
                latency_ms,
                error: None,
            },
            Err(e) => Self {
                status: HealthStatus::Unhealthy,
                backend,
                latency_ms,
                error: Some(e.to_string()),
            },
        }
    }
}

async fn check_cache(state: &AppState) -> DependencyCheck {
    let start = Instant::now();
    let result = state.cache.ping().await;
    DependencyCheck::from_ping(state.cache.backend_name(), start, result)
}

async fn check_store(state: &AppState) -> DependencyCheck {
    let start = Instant::now();
    let result = state.store.ping().await;
    DependencyCheck::from_ping(state.store.backend_name(), start, result)
}

async fn check_dependencies(state: &AppState) -> DependencyChecks {
    let (cache, store) = tokio::join!(check_cache(state), check_store(state));
    DependencyChecks { cache, store }
}

impl DependencyChecks {
    /// Unhealthy if either backend is
    fn overall(&self) -> HealthStatus {
        if self.cache.status == HealthStatus::Healthy && self.store.status == HealthStatus::Healthy
        {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }
}

/// `GET /health`: version, uptime and the reachability of each backend
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let checks = check_dependencies(&state).await;
    let status = checks.overall();

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        checks,
    };

    (status.status_code(), Json(response))
}

/// `GET /health/ready`: 200 once the cache and store answer a ping
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<StatusResponse>) {
    status_response(check_dependencies(&state).await.overall())
}

/// `GET /health/live`: 200 while the process serves requests
pub async fn liveness_check() -> (StatusCode, Json<StatusResponse>) {
    status_response(HealthStatus::Healthy)
}
