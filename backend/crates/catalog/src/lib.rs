//! Catalog Backend Module - anime metadata and translation
//!
//! Clean Architecture structure:
//! - `domain/` - Upstream records and validated queries
//! - `application/` - Upstream and cache configuration
//! - `infra/` - Jikan and Lingva HTTP clients
//! - `presentation/` - HTTP handlers, rate-limit middleware, router
//!
//! Every upstream answer is memoized in the shared TTL cache, so repeated
//! reads inside a TTL never leave the process.

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

pub use application::config::{CacheTtls, CatalogConfig, JikanConfig, TranslatorConfig};
pub use error::{CatalogError, CatalogResult};
pub use infra::jikan::JikanClient;
pub use infra::translator::{Translation, Translator};
pub use presentation::handlers::{CacheClass, CatalogAppState};
pub use presentation::middleware::ApiRateLimitState;
pub use presentation::router::catalog_router;
