//! Cache key scheme

use crate::resources::ResourceKind;

/// Per-user list cache key: `resourceType:userId`
pub fn list(kind: ResourceKind, user_id: &str) -> String {
    format!("{}:{}", kind.as_str(), user_id)
}

/// Session verification cache key
pub fn session(token_hash: &str) -> String {
    format!("session:{}", token_hash)
}
