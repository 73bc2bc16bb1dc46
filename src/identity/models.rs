//! Identity API data models

use serde::{Deserialize, Serialize};

/// Role value that grants elevated privileges
pub const ADMIN_ROLE: &str = "admin";

/// Request to verify a session token
#[derive(Debug, Clone, Serialize)]
pub struct VerifySessionRequest<'a> {
    pub token: &'a str,
}

/// A verified session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedSession {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Metadata the identity service exposes to clients
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicMetadata {
    #[serde(default)]
    pub role: Option<String>,
}

/// A user record from the identity service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityUser {
    pub id: String,
    #[serde(default)]
    pub public_metadata: PublicMetadata,
}

impl IdentityUser {
    pub fn is_admin(&self) -> bool {
        self.public_metadata.role.as_deref() == Some(ADMIN_ROLE)
    }
}
