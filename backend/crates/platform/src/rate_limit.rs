//! Rate Limiting Infrastructure
//!
//! Fixed-window admission control keyed by an arbitrary identifier
//! (user id, email or client IP), plus the per-endpoint-class policy table.
//!
//! ## Window semantics
//! - First request for an identifier, or any request at/after the window's
//!   reset instant, opens a new window with `count = 1`.
//! - Inside a window the `limit`-th request is the last one granted.
//! - Denials report `remaining = 0` and the unchanged `reset_at_ms`.
//!
//! State is per process: N server instances admit up to N × `limit`
//! requests per window. [`RateLimitStore`] is the seam for a shared backend.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::{Clock, SystemClock};

/// Interval of the background sweep removing elapsed windows
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Longest window a policy may configure
pub const MAX_WINDOW: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Rate limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 20,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub const fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn window_ms(&self) -> i64 {
        i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX)
    }

    /// Reject configs that would deny everything or never reset.
    pub fn validate(&self) -> Result<(), RateLimitConfigError> {
        if self.max_requests == 0 {
            return Err(RateLimitConfigError::ZeroLimit);
        }
        if self.window.is_zero() {
            return Err(RateLimitConfigError::ZeroWindow);
        }
        if self.window > MAX_WINDOW {
            return Err(RateLimitConfigError::WindowTooLong {
                max_secs: MAX_WINDOW.as_secs(),
            });
        }
        Ok(())
    }
}

/// Rate limit check result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at_ms: i64,
}

impl RateLimitResult {
    /// Time left until the window resets.
    pub fn retry_after(&self, now_ms: i64) -> Duration {
        let left = self.reset_at_ms.saturating_sub(now_ms);
        Duration::from_millis(u64::try_from(left).unwrap_or(0))
    }

    /// Whole seconds until the window resets, rounded up.
    pub fn retry_after_secs(&self, now_ms: i64) -> u64 {
        self.retry_after(now_ms).as_millis().div_ceil(1000).try_into().unwrap_or(u64::MAX)
    }
}

/// Trait for rate limit storage backends
#[trait_variant::make(RateLimitStore: Send)]
pub trait LocalRateLimitStore {
    /// Check and increment the counter for `key`.
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, Box<dyn std::error::Error + Send + Sync>>;

    /// Current time as seen by the store, for retry-after computation.
    fn now_ms(&self) -> i64;
}

// ============================================================================
// In-memory fixed-window limiter
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    reset_at_ms: i64,
}

/// In-memory fixed-window rate limiter.
///
/// Each identifier lives in one `DashMap` shard, so check-and-increment is
/// atomic per key without a global lock.
pub struct FixedWindowRateLimiter<C: Clock = SystemClock> {
    entries: DashMap<String, RateLimitEntry>,
    clock: C,
}

impl FixedWindowRateLimiter<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for FixedWindowRateLimiter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> FixedWindowRateLimiter<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Admit or deny one request from `identifier`.
    pub fn check(&self, identifier: &str, config: &RateLimitConfig) -> RateLimitResult {
        let now = self.clock.now_ms();
        let limit = config.max_requests;
        let fresh_reset_at = now.saturating_add(config.window_ms());

        if limit == 0 {
            return RateLimitResult {
                allowed: false,
                remaining: 0,
                reset_at_ms: fresh_reset_at,
            };
        }

        let fresh = RateLimitEntry {
            count: 1,
            reset_at_ms: fresh_reset_at,
        };

        match self.entries.entry(identifier.to_owned()) {
            Entry::Occupied(mut occupied) if now < occupied.get().reset_at_ms => {
                let entry = occupied.get_mut();
                if entry.count >= limit {
                    return RateLimitResult {
                        allowed: false,
                        remaining: 0,
                        reset_at_ms: entry.reset_at_ms,
                    };
                }
                entry.count += 1;
                RateLimitResult {
                    allowed: true,
                    remaining: limit - entry.count,
                    reset_at_ms: entry.reset_at_ms,
                }
            }
            Entry::Occupied(mut occupied) => {
                occupied.insert(fresh);
                Self::opened(limit, fresh)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                Self::opened(limit, fresh)
            }
        }
    }

    fn opened(limit: u32, entry: RateLimitEntry) -> RateLimitResult {
        RateLimitResult {
            allowed: true,
            remaining: limit - entry.count,
            reset_at_ms: entry.reset_at_ms,
        }
    }

    /// Drop every entry whose window has elapsed. Returns how many went.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = now < entry.reset_at_ms;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Number of tracked identifiers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run [`Self::sweep`] every `every` until the limiter is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(limiter) = weak.upgrade() else {
                    break;
                };
                let removed = limiter.sweep();
                if removed > 0 {
                    tracing::debug!(removed, remaining = limiter.len(), "Swept rate-limit windows");
                }
            }
        })
    }
}

impl<C: Clock> RateLimitStore for FixedWindowRateLimiter<C> {
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.check(key, config))
    }

    fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }
}

// ============================================================================
// Policies
// ============================================================================

/// Endpoint classes with their own numeric limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitPolicy {
    SignUp,
    SignIn,
    Api,
    Recommendations,
    Likes,
    Upload,
}

impl RateLimitPolicy {
    pub const ALL: [RateLimitPolicy; 6] = [
        RateLimitPolicy::SignUp,
        RateLimitPolicy::SignIn,
        RateLimitPolicy::Api,
        RateLimitPolicy::Recommendations,
        RateLimitPolicy::Likes,
        RateLimitPolicy::Upload,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            RateLimitPolicy::SignUp => "signup",
            RateLimitPolicy::SignIn => "signin",
            RateLimitPolicy::Api => "api",
            RateLimitPolicy::Recommendations => "recommendations",
            RateLimitPolicy::Likes => "likes",
            RateLimitPolicy::Upload => "upload",
        }
    }

    /// Environment variable overriding this policy (`<limit>/<window secs>`).
    pub const fn env_key(&self) -> &'static str {
        match self {
            RateLimitPolicy::SignUp => "RATE_LIMIT_SIGNUP",
            RateLimitPolicy::SignIn => "RATE_LIMIT_SIGNIN",
            RateLimitPolicy::Api => "RATE_LIMIT_API",
            RateLimitPolicy::Recommendations => "RATE_LIMIT_RECOMMENDATIONS",
            RateLimitPolicy::Likes => "RATE_LIMIT_LIKES",
            RateLimitPolicy::Upload => "RATE_LIMIT_UPLOAD",
        }
    }

    /// Account creation and uploads get the tightest windows.
    pub const fn default_config(&self) -> RateLimitConfig {
        match self {
            RateLimitPolicy::SignUp => RateLimitConfig::new(3, 15 * 60),
            RateLimitPolicy::SignIn => RateLimitConfig::new(5, 15 * 60),
            RateLimitPolicy::Api => RateLimitConfig::new(20, 60),
            RateLimitPolicy::Recommendations => RateLimitConfig::new(5, 60),
            RateLimitPolicy::Likes => RateLimitConfig::new(30, 60),
            RateLimitPolicy::Upload => RateLimitConfig::new(5, 60),
        }
    }

    const fn index(&self) -> usize {
        match self {
            RateLimitPolicy::SignUp => 0,
            RateLimitPolicy::SignIn => 1,
            RateLimitPolicy::Api => 2,
            RateLimitPolicy::Recommendations => 3,
            RateLimitPolicy::Likes => 4,
            RateLimitPolicy::Upload => 5,
        }
    }

    /// Limiter key for `subject` under this policy.
    pub fn key(&self, subject: &str) -> String {
        format!("{}:{}", self.as_str(), subject)
    }
}

impl fmt::Display for RateLimitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error in a rate-limit configuration value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitConfigError {
    #[error("rate limit must allow at least one request")]
    ZeroLimit,

    #[error("rate limit window must be longer than zero")]
    ZeroWindow,

    #[error("rate limit window must not exceed {max_secs}s")]
    WindowTooLong { max_secs: u64 },

    #[error("invalid value for {key}: expected <limit>/<window secs>, got {value:?}")]
    Malformed { key: &'static str, value: String },

    #[error("{key}: {source}")]
    Invalid {
        key: &'static str,
        #[source]
        source: Box<RateLimitConfigError>,
    },
}

/// Validated policy table, one [`RateLimitConfig`] per [`RateLimitPolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicies {
    configs: [RateLimitConfig; 6],
}

impl Default for RateLimitPolicies {
    fn default() -> Self {
        Self {
            configs: RateLimitPolicy::ALL.map(|policy| policy.default_config()),
        }
    }
}

impl RateLimitPolicies {
    /// Defaults overridden by `RATE_LIMIT_*` environment variables.
    pub fn from_env() -> Result<Self, RateLimitConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each policy's key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RateLimitConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut policies = Self::default();
        for policy in RateLimitPolicy::ALL {
            if let Some(raw) = lookup(policy.env_key()) {
                let config = parse_config(policy.env_key(), &raw)?;
                policies.set(policy, config);
            }
        }
        policies.validate()?;
        Ok(policies)
    }

    pub fn get(&self, policy: RateLimitPolicy) -> RateLimitConfig {
        self.configs[policy.index()]
    }

    pub fn set(&mut self, policy: RateLimitPolicy, config: RateLimitConfig) {
        self.configs[policy.index()] = config;
    }

    pub fn validate(&self) -> Result<(), RateLimitConfigError> {
        for policy in RateLimitPolicy::ALL {
            self.get(policy)
                .validate()
                .map_err(|e| RateLimitConfigError::Invalid {
                    key: policy.env_key(),
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }
}

fn parse_config(key: &'static str, raw: &str) -> Result<RateLimitConfig, RateLimitConfigError> {
    let malformed = || RateLimitConfigError::Malformed {
        key,
        value: raw.to_string(),
    };
    let (limit, window) = raw.trim().split_once('/').ok_or_else(malformed)?;
    let max_requests = limit.trim().parse::<u32>().map_err(|_| malformed())?;
    let window_secs = window.trim().parse::<u64>().map_err(|_| malformed())?;
    Ok(RateLimitConfig::new(max_requests, window_secs))
}
