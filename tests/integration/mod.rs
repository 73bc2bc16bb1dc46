//! Integration tests for the Trackfit API
//!
//! Each test drives the real router over in-memory backends, with a mock
//! identity provider standing in for session verification and role lookups.

mod auth;
mod rate_limiting;
mod training;
