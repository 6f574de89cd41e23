//! Presentation Layer
//!
//! HTTP handlers, DTOs and the per-client rate-limit middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;
