//! Authentication middleware
//!
//! Verifies session tokens with the identity provider and caches the
//! result by token hash.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::{
    cache::keys,
    error::{AppError, AppResult},
    identity::VerifiedSession,
    AppState,
};

/// The principal a request was authenticated as
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Extract the Authorization header and return the bearer token
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Hash a session token for use as a cache key
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify `token`, consulting the session cache first
async fn verify(state: &AppState, token: &str) -> AppResult<VerifiedSession> {
    let cache_key = keys::session(&hash_token(token));

    if let Some(session) = state.cache.get::<VerifiedSession>(&cache_key).await? {
        debug!("Cache hit for session verification");
        return Ok(session);
    }

    let session = state.identity.verify_session(token).await?;
    state
        .cache
        .set_with_ttl(&cache_key, &session, state.config.token_cache_ttl_seconds)
        .await?;

    Ok(session)
}

/// Authentication middleware
///
/// Rejects requests without a valid bearer token and adds
/// [`AuthenticatedUser`] to the request extensions.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = extract_bearer_token(auth_header).ok_or(AppError::InvalidToken)?;

    let session = match verify(&state, token).await {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "Session verification failed");
            return Err(e);
        }
    };

    debug!(
        user_id = %session.user_id,
        session_id = session.session_id.as_deref().unwrap_or("-"),
        "User authenticated"
    );

    request.extensions_mut().insert(AuthenticatedUser {
        user_id: session.user_id,
    });

    Ok(next.run(request).await)
}
