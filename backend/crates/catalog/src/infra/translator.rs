//! English to Spanish translation through Lingva instances
//!
//! Translation is best effort: any failure hands back the source text, and
//! only complete translations are cached.

use std::sync::Arc;

use futures_util::future::join_all;
use platform::cache::TtlCache;
use serde::Deserialize;

use crate::application::config::TranslatorConfig;
use crate::domain::query::keys;
use crate::error::{CatalogError, CatalogResult};

/// Words whose presence (surrounded by spaces) marks a text as English
const ENGLISH_MARKERS: [&str; 8] = ["the", "and", "is", "in", "at", "of", "to", "a"];

#[derive(Debug, Deserialize)]
struct LingvaResponse {
    translation: String,
}

/// Result of a translation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    /// `false` when `text` is the untranslated source
    pub translated: bool,
}

pub struct Translator {
    http: reqwest::Client,
    config: TranslatorConfig,
    cache: Arc<TtlCache>,
    ttl: std::time::Duration,
}

impl Translator {
    pub fn new(
        config: TranslatorConfig,
        cache: Arc<TtlCache>,
        ttl: std::time::Duration,
    ) -> CatalogResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            cache,
            ttl,
        })
    }

    /// Translated text, or `text` itself when translation is not possible.
    pub async fn translate_to_spanish(&self, text: &str) -> String {
        self.translate(text).await.text
    }

    /// Like [`Self::translate_to_spanish`], reporting whether it succeeded.
    pub async fn translate(&self, text: &str) -> Translation {
        if text.trim().is_empty() {
            return Translation {
                text: text.to_string(),
                translated: true,
            };
        }

        let key = keys::translation(text);
        if let Some(cached) = self.cache.get::<String>(&key) {
            tracing::debug!(key = %key, "Translation from cache");
            return Translation {
                text: cached,
                translated: true,
            };
        }

        let chunks = split_into_chunks(text, self.config.max_chunk_chars);
        let mut parts = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            match self.translate_chunk(chunk).await {
                Ok(translated) => parts.push(translated),
                Err(e) => {
                    tracing::warn!(error = %e, chunks = chunks.len(), "Translation failed, keeping original text");
                    return Translation {
                        text: text.to_string(),
                        translated: false,
                    };
                }
            }
        }

        let joined = parts.join(" ").trim().to_string();
        self.cache.set(key, joined.clone(), self.ttl);
        tracing::debug!(chars = text.chars().count(), chunks = chunks.len(), "Translation cached");
        Translation {
            text: joined,
            translated: true,
        }
    }

    /// Translate every text concurrently, preserving order.
    pub async fn translate_batch(&self, texts: &[String]) -> Vec<String> {
        join_all(texts.iter().map(|t| self.translate_to_spanish(t))).await
    }

    /// Translate only texts that look English.
    pub async fn translate_if_needed(&self, text: &str) -> String {
        if looks_english(text) {
            self.translate_to_spanish(text).await
        } else {
            text.to_string()
        }
    }

    /// Try each instance in order until one answers.
    async fn translate_chunk(&self, chunk: &str) -> CatalogResult<String> {
        for instance in &self.config.instances {
            match self.request_instance(instance, chunk).await {
                Ok(translation) => return Ok(translation),
                Err(e) => {
                    tracing::debug!(instance = %instance, error = %e, "Translation instance failed, trying next");
                }
            }
        }
        Err(CatalogError::UpstreamUnavailable)
    }

    async fn request_instance(&self, instance: &str, chunk: &str) -> CatalogResult<String> {
        let mut url = reqwest::Url::parse(instance)
            .map_err(|e| CatalogError::Internal(format!("invalid instance url {instance:?}: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| CatalogError::Internal(format!("instance url {instance:?} cannot have a path")))?
            .pop_if_empty()
            .extend([
                self.config.source_lang.as_str(),
                self.config.target_lang.as_str(),
                chunk,
            ]);

        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::UpstreamStatus {
                status: status.as_u16(),
            });
        }
        Ok(response.json::<LingvaResponse>().await?.translation)
    }
}

/// Whether `text` contains a common English word surrounded by spaces
pub fn looks_english(text: &str) -> bool {
    let lower = text.to_lowercase();
    ENGLISH_MARKERS
        .iter()
        .any(|word| lower.contains(&format!(" {word} ")))
}

/// Split `text` into chunks of at most `max_chars` characters, cutting only
/// after sentence-ending punctuation. A single sentence longer than
/// `max_chars` becomes its own chunk.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in sentences(text) {
        let len = sentence.chars().count();
        if current_len + len > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current.push_str(sentence);
        current_len += len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Sentences including their trailing punctuation; trailing text without
/// punctuation forms a final sentence.
fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            while let Some(&(_, next)) = chars.peek() {
                if matches!(next, '.' | '!' | '?') {
                    chars.next();
                } else {
                    break;
                }
            }
            let end = chars.peek().map_or(text.len(), |&(i, _)| i);
            out.push(&text[start..end]);
            start = end;
        }
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}
