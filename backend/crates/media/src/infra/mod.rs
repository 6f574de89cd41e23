//! Infrastructure Layer - codec strategies and repositories

pub mod codec;
pub mod memory;
pub mod postgres;
