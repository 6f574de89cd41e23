//! API Server Entry Point
//!
//! Reads the environment, builds the shared rate limiter and cache, and
//! serves the media and catalog routers. Uses `anyhow` for startup errors;
//! request-level errors go through each crate's error type.

mod app;
mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use catalog::{ApiRateLimitState, CatalogAppState, JikanClient, Translator, catalog_router};
use media::{
    InMemoryProfileRepository, MediaAppState, PgProfileRepository, ProfileImageRepository,
    codec_for, media_router,
};
use platform::cache::{self, TtlCache};
use platform::rate_limit::{self, FixedWindowRateLimiter, RateLimitPolicy, RateLimitStore};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "api=info,media=info,catalog=info,platform=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    // Shared tables, one per process
    let limiter = Arc::new(FixedWindowRateLimiter::new());
    limiter.spawn_sweeper(rate_limit::DEFAULT_SWEEP_INTERVAL);

    let cache = Arc::new(TtlCache::new(config.cache_max_entries));
    cache.spawn_sweeper(cache::DEFAULT_SWEEP_INTERVAL);

    // Media: PostgreSQL when configured, otherwise in-memory profiles
    let media_routes = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            tracing::info!("Connected to database");
            media_routes(&config, PgProfileRepository::new(pool), limiter.clone())
        }
        None => {
            tracing::warn!("DATABASE_URL not set, profile images are kept in memory");
            media_routes(
                &config,
                InMemoryProfileRepository::auto_registering(),
                limiter.clone(),
            )
        }
    };

    // Catalog and translation
    let catalog_state = CatalogAppState {
        jikan: Arc::new(JikanClient::new(
            config.catalog.jikan.clone(),
            config.catalog.ttls,
            cache.clone(),
        )?),
        translator: Arc::new(Translator::new(
            config.catalog.translator.clone(),
            cache.clone(),
            config.catalog.ttls.translation,
        )?),
    };
    let catalog_routes = catalog_router(
        catalog_state,
        ApiRateLimitState {
            limiter,
            config: config.rate_limits.get(RateLimitPolicy::Api),
        },
    );

    // Build router
    let app = app::build_router(
        media_routes,
        catalog_routes,
        app::cors_layer(&config.frontend_origins),
    );

    // Start server
    let addr = config.bind_addr;
    tracing::info!(
        codec = %config.media.codec,
        cache_max_entries = config.cache_max_entries,
        "Listening on {}",
        addr
    );

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn media_routes<R, L>(config: &AppConfig, repo: R, limiter: Arc<L>) -> Router
where
    R: ProfileImageRepository + Send + Sync + 'static,
    L: RateLimitStore + Send + Sync + 'static,
{
    tracing::info!(codec = %config.media.codec, "Media pipeline ready");
    media_router(MediaAppState {
        repo: Arc::new(repo),
        limiter,
        codec: codec_for(&config.media),
        config: Arc::new(config.media.clone()),
    })
}
