//! API DTOs (Data Transfer Objects)

use serde::{Deserialize, Serialize};

/// Request for POST /api/translate
#[derive(Debug, Clone, Deserialize)]
pub struct TranslateRequest {
    #[serde(default)]
    pub text: String,
}

/// Response for POST /api/translate
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    pub translated_text: String,
    pub success: bool,
}
