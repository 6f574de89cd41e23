//! Domain Layer - upload rules independent of transport and storage
//!
//! - Value objects (UploadKind, ImageFormat, content-type allow-list)
//! - Entities (NormalizedImage)
//! - Domain services (compression loop, bounding-box math)
//! - Ports (ImageCodec, ProfileImageRepository)

pub mod codec;
pub mod entities;
pub mod repository;
pub mod services;
pub mod value_objects;
