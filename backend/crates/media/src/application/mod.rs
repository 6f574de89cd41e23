//! Application Layer - Use Cases
//!
//! Orchestrates domain rules, the codec strategy and the repository.

pub mod config;
pub mod upload_image;
