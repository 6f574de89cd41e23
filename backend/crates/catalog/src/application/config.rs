//! Catalog Configuration

use std::time::Duration;

const HOUR: u64 = 60 * 60;

pub const DEFAULT_JIKAN_API_URL: &str = "https://api.jikan.moe/v4";

pub const DEFAULT_LINGVA_INSTANCES: [&str; 3] = [
    "https://lingva.ml/api/v1",
    "https://translate.plausibility.cloud/api/v1",
    "https://lingva.thedaviddelta.com/api/v1",
];

/// Time-to-live per cached data category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub anime_detail: Duration,
    pub top_anime: Duration,
    pub top_rated: Duration,
    pub current_season: Duration,
    pub upcoming: Duration,
    pub characters: Duration,
    pub recommendations: Duration,
    pub search: Duration,
    pub genres: Duration,
    pub translation: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            anime_detail: Duration::from_secs(24 * HOUR),
            top_anime: Duration::from_secs(6 * HOUR),
            top_rated: Duration::from_secs(6 * HOUR),
            current_season: Duration::from_secs(HOUR),
            upcoming: Duration::from_secs(HOUR),
            characters: Duration::from_secs(12 * HOUR),
            recommendations: Duration::from_secs(12 * HOUR),
            search: Duration::from_secs(10 * 60),
            genres: Duration::from_secs(30 * 60),
            translation: Duration::from_secs(30 * 24 * HOUR),
        }
    }
}

/// Upstream catalog API client settings
#[derive(Debug, Clone)]
pub struct JikanConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    /// Minimum spacing between two outbound requests
    pub min_request_interval: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Backoff before retry `n` is `backoff_base * 2^n`
    pub backoff_base: Duration,
}

impl Default for JikanConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_JIKAN_API_URL.to_string(),
            request_timeout: Duration::from_secs(15),
            min_request_interval: Duration::from_millis(500),
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

/// Translation service settings
#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    /// Lingva API roots, tried in order
    pub instances: Vec<String>,
    pub request_timeout: Duration,
    /// Longest chunk sent in one request, in characters
    pub max_chunk_chars: usize,
    pub source_lang: String,
    pub target_lang: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            instances: DEFAULT_LINGVA_INSTANCES.map(String::from).to_vec(),
            request_timeout: Duration::from_secs(10),
            max_chunk_chars: 2000,
            source_lang: "en".to_string(),
            target_lang: "es".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogConfig {
    pub jikan: JikanConfig,
    pub translator: TranslatorConfig,
    pub ttls: CacheTtls,
}
