//! Domain Layer - catalog records and validated queries

pub mod models;
pub mod query;
