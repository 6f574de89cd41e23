//! Media Backend Module - profile image uploads
//!
//! Clean Architecture structure:
//! - `domain/` - Upload rules, compression loop, codec and repository ports
//! - `application/` - Upload use case and configuration
//! - `infra/` - Codec strategies, PostgreSQL and in-memory repositories
//! - `presentation/` - HTTP handlers
//!
//! ## Pipeline
//! 1. Per-user admission through the upload rate-limit policy
//! 2. Declared content type checked against the allow-list
//! 3. Magic bytes checked before any decoding
//! 4. Codec strategy (resize + JPEG re-compression, or pass-through)
//! 5. `data:` URL size gate, then the profile slot is overwritten

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

pub use application::config::{CodecKind, MediaConfig};
pub use application::upload_image::{UploadImageInput, UploadImageOutput, UploadImageUseCase};
pub use domain::codec::ImageCodec;
pub use domain::repository::ProfileImageRepository;
pub use domain::value_objects::{ImageFormat, UploadKind};
pub use error::{MediaError, MediaResult};
pub use infra::codec::{PassThroughCodec, RasterCodec, codec_for};
pub use infra::memory::InMemoryProfileRepository;
pub use infra::postgres::PgProfileRepository;
pub use presentation::handlers::MediaAppState;
pub use presentation::router::media_router;

#[cfg(test)]
mod tests;
