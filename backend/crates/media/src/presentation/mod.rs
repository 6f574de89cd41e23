//! Presentation Layer
//!
//! HTTP handlers and DTOs for the upload API.

pub mod dto;
pub mod handlers;
pub mod router;
