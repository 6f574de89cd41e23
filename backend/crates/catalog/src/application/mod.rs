//! Application Layer
//!
//! Configuration shared by the upstream clients and the handlers.

pub mod config;
