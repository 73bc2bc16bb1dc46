//! Mock infrastructure for testing external services
//!
//! Wiremock-based stand-ins for the identity provider and a cache with
//! switchable outages, reusable across test files.

pub mod cache;
pub mod identity;

pub use cache::*;
pub use identity::*;
