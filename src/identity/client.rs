//! Identity API client
//!
//! HTTP client for the identity provider: session verification and user
//! lookups.

use reqwest::StatusCode;
use tracing::{debug, error, instrument, warn};

use crate::{
    config::Config,
    error::{AppError, AppResult},
    identity::models::{IdentityUser, VerifiedSession, VerifySessionRequest},
};

/// Identity API client
pub struct IdentityClient {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl IdentityClient {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.identity_api_url.trim_end_matches('/').to_string(),
            secret_key: config.identity_secret_key.clone(),
        }
    }

    /// Verify a session token, returning the principal it belongs to
    #[instrument(skip(self, token), fields(token_len = token.len()))]
    pub async fn verify_session(&self, token: &str) -> AppResult<VerifiedSession> {
        let url = format!("{}/v1/sessions/verify", self.base_url);

        debug!(url = %url, "Verifying session token");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .json(&VerifySessionRequest { token })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send request to identity service");
                e
            })?;

        let status = response.status();
        debug!(status = %status, "Session verification response status");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();

            if matches!(
                status,
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND
            ) {
                warn!(status = %status, body = %text, "Session token rejected");
                return Err(AppError::InvalidToken);
            }

            error!(status = %status, body = %text, "Session verification request failed");
            return Err(AppError::Upstream(format!(
                "Identity API error {}: {}",
                status, text
            )));
        }

        let body = response.text().await?;
        let session: VerifiedSession = serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, "Failed to parse session verification response");
            AppError::Upstream(format!("Failed to parse identity response: {}", e))
        })?;

        if session.user_id.trim().is_empty() {
            warn!("Session verified without a user id");
            return Err(AppError::InvalidToken);
        }

        debug!(user_id = %session.user_id, "Session verified");
        Ok(session)
    }

    /// Look up a user's record
    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: &str) -> AppResult<IdentityUser> {
        let url = format!("{}/v1/users/{}", self.base_url, user_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();

            if status == StatusCode::NOT_FOUND {
                warn!(user_id = %user_id, "Principal unknown to identity service");
                return Err(AppError::Unauthorized);
            }

            error!(status = %status, body = %text, "User lookup failed");
            return Err(AppError::Upstream(format!(
                "Identity API error {}: {}",
                status, text
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, "Failed to parse user response");
            AppError::Upstream(format!("Failed to parse identity response: {}", e))
        })
    }

    /// Whether the principal holds the admin role
    pub async fn is_admin(&self, user_id: &str) -> AppResult<bool> {
        let user = self.get_user(user_id).await?;
        debug!(user_id = %user_id, is_admin = user.is_admin(), "Resolved principal role");
        Ok(user.is_admin())
    }
}
