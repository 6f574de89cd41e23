//! HTTP Handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, header};
use axum::response::IntoResponse;

use crate::domain::models::Envelope;
use crate::domain::query::{GenreQuery, PageQuery, SearchQuery};
use crate::error::{CatalogError, CatalogResult};
use crate::infra::jikan::JikanClient;
use crate::infra::translator::Translator;
use crate::presentation::dto::{TranslateRequest, TranslateResponse};

/// Shared state for catalog handlers
#[derive(Clone)]
pub struct CatalogAppState {
    pub jikan: Arc<JikanClient>,
    pub translator: Arc<Translator>,
}

/// Downstream caching class of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheClass {
    /// Single anime and its characters
    Detail,
    /// Rankings and seasonal lists
    Top,
    /// Searches, genre listings, recommendations
    Search,
    NoStore,
}

impl CacheClass {
    /// `(max-age, stale-while-revalidate)` in seconds
    pub const fn ages(&self) -> Option<(u32, u32)> {
        match self {
            CacheClass::Detail => Some((3600, 86_400)),
            CacheClass::Top => Some((1800, 3600)),
            CacheClass::Search => Some((300, 600)),
            CacheClass::NoStore => None,
        }
    }

    pub fn header_value(&self) -> HeaderValue {
        match self.ages() {
            Some((max_age, swr)) => HeaderValue::from_str(&format!(
                "public, s-maxage={max_age}, stale-while-revalidate={swr}, max-age={max_age}"
            ))
            .unwrap_or_else(|_| HeaderValue::from_static("no-store")),
            None => HeaderValue::from_static("no-store"),
        }
    }
}

fn cached_json<T: serde::Serialize>(class: CacheClass, body: T) -> impl IntoResponse {
    ([(header::CACHE_CONTROL, class.header_value())], Json(body))
}

/// GET /api/anime/{id}
pub async fn anime_detail(
    State(state): State<CatalogAppState>,
    Path(id): Path<u32>,
) -> CatalogResult<impl IntoResponse> {
    let anime = state
        .jikan
        .anime_by_id(id)
        .await
        .ok_or(CatalogError::NotFound)?;
    Ok(cached_json(CacheClass::Detail, Envelope { data: anime }))
}

/// GET /api/anime/{id}/characters
pub async fn anime_characters(
    State(state): State<CatalogAppState>,
    Path(id): Path<u32>,
) -> impl IntoResponse {
    let characters = state.jikan.characters(id).await;
    cached_json(CacheClass::Detail, Envelope { data: characters })
}

/// GET /api/anime/{id}/recommendations
pub async fn anime_recommendations(
    State(state): State<CatalogAppState>,
    Path(id): Path<u32>,
) -> impl IntoResponse {
    let recommendations = state.jikan.recommendations(id).await;
    cached_json(CacheClass::Search, Envelope {
        data: recommendations,
    })
}

/// GET /api/anime/search
pub async fn search(
    State(state): State<CatalogAppState>,
    Query(query): Query<SearchQuery>,
) -> CatalogResult<impl IntoResponse> {
    let query = query.validate()?;
    let page = state
        .jikan
        .search(&query)
        .await
        .ok_or(CatalogError::UpstreamUnavailable)?;
    Ok(cached_json(CacheClass::Search, page))
}

/// GET /api/anime/top
pub async fn top(
    State(state): State<CatalogAppState>,
    Query(query): Query<PageQuery>,
) -> CatalogResult<impl IntoResponse> {
    let PageQuery { page, limit } = query.validate()?;
    let result = state
        .jikan
        .top_anime(page, limit)
        .await
        .ok_or(CatalogError::UpstreamUnavailable)?;
    Ok(cached_json(CacheClass::Top, result))
}

/// GET /api/anime/top-rated
pub async fn top_rated(
    State(state): State<CatalogAppState>,
    Query(query): Query<PageQuery>,
) -> CatalogResult<impl IntoResponse> {
    let PageQuery { page, limit } = query.validate()?;
    let result = state
        .jikan
        .top_rated(page, limit)
        .await
        .ok_or(CatalogError::UpstreamUnavailable)?;
    Ok(cached_json(CacheClass::Top, result))
}

/// GET /api/anime/season/now
pub async fn season_now(
    State(state): State<CatalogAppState>,
    Query(query): Query<PageQuery>,
) -> CatalogResult<impl IntoResponse> {
    let PageQuery { page, .. } = query.validate()?;
    let result = state
        .jikan
        .current_season(page)
        .await
        .ok_or(CatalogError::UpstreamUnavailable)?;
    Ok(cached_json(CacheClass::Top, result))
}

/// GET /api/anime/season/upcoming
pub async fn season_upcoming(
    State(state): State<CatalogAppState>,
    Query(query): Query<PageQuery>,
) -> CatalogResult<impl IntoResponse> {
    let PageQuery { page, .. } = query.validate()?;
    let result = state
        .jikan
        .upcoming(page)
        .await
        .ok_or(CatalogError::UpstreamUnavailable)?;
    Ok(cached_json(CacheClass::Top, result))
}

/// GET /api/anime/genres?ids=1,4&page=1&type=tv
pub async fn by_genres(
    State(state): State<CatalogAppState>,
    Query(query): Query<GenreQuery>,
) -> CatalogResult<impl IntoResponse> {
    let (ids, page, kind) = query.validate()?;
    let result = state
        .jikan
        .by_genres(&ids, page, &kind)
        .await
        .ok_or(CatalogError::UpstreamUnavailable)?;
    Ok(cached_json(CacheClass::Search, result))
}

/// GET /api/anime/random
pub async fn random(State(state): State<CatalogAppState>) -> CatalogResult<impl IntoResponse> {
    let anime = state.jikan.random().await.ok_or(CatalogError::NotFound)?;
    Ok(cached_json(CacheClass::NoStore, Envelope { data: anime }))
}

/// POST /api/translate
///
/// Always 200; `success` is false when the original text is returned.
pub async fn translate(
    State(state): State<CatalogAppState>,
    Json(req): Json<TranslateRequest>,
) -> Json<TranslateResponse> {
    let translation = state.translator.translate(&req.text).await;
    Json(TranslateResponse {
        translated_text: translation.text,
        success: translation.translated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_control_values() {
        assert_eq!(
            CacheClass::Detail.header_value(),
            "public, s-maxage=3600, stale-while-revalidate=86400, max-age=3600"
        );
        assert_eq!(
            CacheClass::Top.header_value(),
            "public, s-maxage=1800, stale-while-revalidate=3600, max-age=1800"
        );
        assert_eq!(
            CacheClass::Search.header_value(),
            "public, s-maxage=300, stale-while-revalidate=600, max-age=300"
        );
        assert_eq!(CacheClass::NoStore.header_value(), "no-store");
    }
}
