//! Catalog Router

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use platform::rate_limit::RateLimitStore;

use crate::presentation::handlers::{self, CatalogAppState};
use crate::presentation::middleware::{ApiRateLimitState, api_rate_limit};

/// Routes mounted under `/api`, all behind the per-client `api` limit
pub fn catalog_router<L>(state: CatalogAppState, rate_limit: ApiRateLimitState<L>) -> Router
where
    L: RateLimitStore + Send + Sync + 'static,
{
    Router::new()
        .route("/anime/search", get(handlers::search))
        .route("/anime/top", get(handlers::top))
        .route("/anime/top-rated", get(handlers::top_rated))
        .route("/anime/season/now", get(handlers::season_now))
        .route("/anime/season/upcoming", get(handlers::season_upcoming))
        .route("/anime/genres", get(handlers::by_genres))
        .route("/anime/random", get(handlers::random))
        .route("/anime/{id}", get(handlers::anime_detail))
        .route("/anime/{id}/characters", get(handlers::anime_characters))
        .route(
            "/anime/{id}/recommendations",
            get(handlers::anime_recommendations),
        )
        .route("/translate", post(handlers::translate))
        .route_layer(middleware::from_fn_with_state(
            rate_limit,
            api_rate_limit::<L>,
        ))
        .with_state(state)
}
