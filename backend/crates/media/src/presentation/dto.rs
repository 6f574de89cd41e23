//! API DTOs (Data Transfer Objects)

use serde::Serialize;

/// Response for POST /api/user/upload-image
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    /// The stored `data:` URL
    pub url: String,
    pub message: String,
}
