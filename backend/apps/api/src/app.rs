//! Top-level router assembly

use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;

use media::presentation::handlers::USER_ID_HEADER;

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            HeaderName::from_static(USER_ID_HEADER),
        ]))
        .allow_credentials(true)
}

/// Mount the media routes under `/api/user` and the catalog under `/api`.
pub fn build_router(media: Router, catalog: Router, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/user", media)
        .nest("/api", catalog)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
