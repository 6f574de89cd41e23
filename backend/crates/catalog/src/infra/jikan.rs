//! Jikan (MyAnimeList) API client
//!
//! Every call goes through three layers:
//! 1. the shared [`TtlCache`] (except `random`)
//! 2. bounded retries with exponential backoff on transient failures
//! 3. process-wide pacing, at most one request per `min_request_interval`
//!
//! Failures never reach the caller as errors: details become `None` and
//! lists become empty, with the cause logged.

use std::sync::Arc;
use std::time::Duration;

use platform::cache::TtlCache;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::application::config::{CacheTtls, JikanConfig};
use crate::domain::models::{Anime, AnimeCharacter, AnimePage, AnimeRecommendation, Envelope};
use crate::domain::query::{SearchQuery, keys};
use crate::error::{CatalogError, CatalogResult};

type Params = [(&'static str, String)];

pub struct JikanClient {
    http: reqwest::Client,
    config: JikanConfig,
    ttls: CacheTtls,
    cache: Arc<TtlCache>,
    last_request: Mutex<Option<Instant>>,
}

impl JikanClient {
    pub fn new(config: JikanConfig, ttls: CacheTtls, cache: Arc<TtlCache>) -> CatalogResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("animeka/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            config,
            ttls,
            cache,
            last_request: Mutex::new(None),
        })
    }

    pub async fn anime_by_id(&self, id: u32) -> Option<Anime> {
        self.cached::<Envelope<Anime>>(keys::anime(id), self.ttls.anime_detail, &format!("/anime/{id}"), &[])
            .await
            .map(|envelope| envelope.data)
    }

    pub async fn characters(&self, id: u32) -> Vec<AnimeCharacter> {
        self.cached::<Envelope<Vec<AnimeCharacter>>>(
            keys::characters(id),
            self.ttls.characters,
            &format!("/anime/{id}/characters"),
            &[],
        )
        .await
        .map(|envelope| envelope.data)
        .unwrap_or_default()
    }

    pub async fn recommendations(&self, id: u32) -> Vec<AnimeRecommendation> {
        self.cached::<Envelope<Vec<AnimeRecommendation>>>(
            keys::recommendations(id),
            self.ttls.recommendations,
            &format!("/anime/{id}/recommendations"),
            &[],
        )
        .await
        .map(|envelope| envelope.data)
        .unwrap_or_default()
    }

    pub async fn search(&self, query: &SearchQuery) -> Option<AnimePage> {
        self.cached(query.cache_key(), self.ttls.search, "/anime", &query.params())
            .await
    }

    /// Most popular first
    pub async fn top_anime(&self, page: u32, limit: u32) -> Option<AnimePage> {
        let params = [
            ("order_by", "popularity".to_string()),
            ("sort", "asc".to_string()),
            ("page", page.to_string()),
            ("limit", limit.to_string()),
        ];
        self.cached(keys::top_anime(page, limit), self.ttls.top_anime, "/anime", &params)
            .await
    }

    /// Highest score first
    pub async fn top_rated(&self, page: u32, limit: u32) -> Option<AnimePage> {
        let params = [
            ("order_by", "score".to_string()),
            ("sort", "desc".to_string()),
            ("page", page.to_string()),
            ("limit", limit.to_string()),
        ];
        self.cached(keys::top_rated(page, limit), self.ttls.top_rated, "/anime", &params)
            .await
    }

    pub async fn current_season(&self, page: u32) -> Option<AnimePage> {
        let params = [("page", page.to_string())];
        self.cached(
            keys::current_season(page),
            self.ttls.current_season,
            "/seasons/now",
            &params,
        )
        .await
    }

    pub async fn upcoming(&self, page: u32) -> Option<AnimePage> {
        let params = [("page", page.to_string())];
        self.cached(keys::upcoming(page), self.ttls.upcoming, "/seasons/upcoming", &params)
            .await
    }

    /// Best-scored anime in all of `genre_ids`, filtered by media type
    pub async fn by_genres(&self, genre_ids: &[u32], page: u32, kind: &str) -> Option<AnimePage> {
        let genres = genre_ids
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let params = [
            ("genres", genres),
            ("type", kind.to_string()),
            ("order_by", "score".to_string()),
            ("sort", "desc".to_string()),
            ("page", page.to_string()),
        ];
        self.cached(keys::genres(genre_ids, page, kind), self.ttls.genres, "/anime", &params)
            .await
    }

    /// Never cached
    pub async fn random(&self) -> Option<Anime> {
        match self.fetch::<Envelope<Anime>>("/random/anime", &[]).await {
            Ok(envelope) => Some(envelope.data),
            Err(e) => {
                log_unavailable("/random/anime", &e);
                None
            }
        }
    }

    async fn cached<T>(&self, key: String, ttl: Duration, path: &str, params: &Params) -> Option<T>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.cache
            .get_or_fetch(&key, ttl, || async {
                match self.fetch::<T>(path, params).await {
                    Ok(value) => Some(value),
                    Err(e) => {
                        log_unavailable(path, &e);
                        None
                    }
                }
            })
            .await
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str, params: &Params) -> CatalogResult<T> {
        let mut attempt = 0u32;
        loop {
            match self.fetch_once(path, params).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let wait = self.config.backoff_base * 2u32.pow(attempt);
                    tracing::warn!(
                        path,
                        attempt = attempt + 1,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "Retrying catalog request"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once<T: DeserializeOwned>(&self, path: &str, params: &Params) -> CatalogResult<T> {
        self.pace().await;

        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let response = self.http.get(&url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::UpstreamStatus {
                status: status.as_u16(),
            });
        }
        Ok(response.json::<T>().await?)
    }

    /// Wait until `min_request_interval` has passed since the previous request.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.config.min_request_interval).await;
        }
        *last = Some(Instant::now());
    }
}

fn log_unavailable(path: &str, cause: &CatalogError) {
    tracing::warn!(path, error = %cause, "{}", CatalogError::UpstreamUnavailable);
}
