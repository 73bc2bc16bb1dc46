//! Identity provider integration
//!
//! Client for the external identity service that verifies session tokens
//! and reports user roles.

pub mod client;
pub mod models;

pub use client::IdentityClient;
pub use models::*;
