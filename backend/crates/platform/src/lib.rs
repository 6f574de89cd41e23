//! Platform Crate - Technical Infrastructure
//!
//! In-process building blocks shared by the service crates:
//! - Clock abstraction (wall clock and a manual clock for tests)
//! - Fixed-window rate limiting with per-endpoint-class policies
//! - TTL key-value cache with bounded size
//! - Client identification from request headers
//! - Base64 / data URL encoding

pub mod cache;
pub mod client;
pub mod clock;
pub mod encoding;
pub mod rate_limit;
