//! Infrastructure Layer - upstream HTTP clients

pub mod jikan;
pub mod translator;
