//! Process configuration read from the environment

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use catalog::CatalogConfig;
use media::{CodecKind, MediaConfig};
use media::application::config::UnknownCodec;
use platform::cache::DEFAULT_MAX_ENTRIES;
use platform::rate_limit::{RateLimitConfigError, RateLimitPolicies, RateLimitPolicy};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 31113;
pub const DEFAULT_FRONTEND_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("{key} must not be empty")]
    Empty { key: &'static str },

    #[error(transparent)]
    Codec(#[from] UnknownCodec),

    #[error(transparent)]
    RateLimit(#[from] RateLimitConfigError),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// In-memory profile storage when unset
    pub database_url: Option<String>,
    pub frontend_origins: Vec<String>,
    pub cache_max_entries: usize,
    pub rate_limits: RateLimitPolicies,
    pub media: MediaConfig,
    pub catalog: CatalogConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from `lookup`; unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let ip = parse_or(get("BIND_ADDR"), "BIND_ADDR", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?;
        let port = parse_or(get("PORT"), "PORT", DEFAULT_PORT)?;
        let cache_max_entries = parse_or(get("CACHE_MAX_ENTRIES"), "CACHE_MAX_ENTRIES", DEFAULT_MAX_ENTRIES)?;
        if cache_max_entries == 0 {
            return Err(ConfigError::Invalid {
                key: "CACHE_MAX_ENTRIES",
                value: "0".into(),
            });
        }

        let frontend_origins = split_list(
            &get("FRONTEND_ORIGINS").unwrap_or_else(|| DEFAULT_FRONTEND_ORIGINS.to_string()),
        );

        let rate_limits = RateLimitPolicies::from_lookup(&get)?;

        let mut media = MediaConfig {
            rate_limit: rate_limits.get(RateLimitPolicy::Upload),
            ..MediaConfig::default()
        };
        if let Some(codec) = get("MEDIA_CODEC") {
            media.codec = codec.parse::<CodecKind>()?;
        }

        let mut catalog = CatalogConfig::default();
        if let Some(url) = get("JIKAN_API_URL") {
            catalog.jikan.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(raw) = get("LINGVA_INSTANCES") {
            let instances = split_list(&raw);
            if instances.is_empty() {
                return Err(ConfigError::Empty {
                    key: "LINGVA_INSTANCES",
                });
            }
            catalog.translator.instances = instances;
        }

        Ok(Self {
            bind_addr: SocketAddr::new(ip, port),
            database_url: get("DATABASE_URL"),
            frontend_origins,
            cache_max_entries,
            rate_limits,
            media,
            catalog,
        })
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
