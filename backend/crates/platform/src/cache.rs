//! In-process TTL cache
//!
//! Memoizes upstream responses (anime records, search pages, translated
//! strings) with a per-entry time-to-live and a bounded entry count.
//!
//! - A read after `stored_at + ttl` is a miss and evicts the entry.
//! - When a write pushes the size over `max_entries`, expired entries are
//!   purged, then the oldest by `stored_at` until the bound holds again.
//! - Values of any `Clone + Send + Sync + 'static` type share one table;
//!   reading a key with a different type than was stored is a miss.
//!
//! Concurrent misses on the same key each run the fetch and both write;
//! the last write wins. Fetches behind this cache are idempotent reads, so
//! no single-flight de-duplication is done.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::{Clock, SystemClock};

pub const DEFAULT_MAX_ENTRIES: usize = 500;
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

type Payload = Arc<dyn Any + Send + Sync>;

struct CacheEntry {
    value: Payload,
    stored_at_ms: i64,
    ttl_ms: i64,
    /// Insertion order, breaks `stored_at_ms` ties during eviction
    seq: u64,
}

impl CacheEntry {
    fn is_expired(&self, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.stored_at_ms) > self.ttl_ms
    }
}

struct Inner {
    entries: HashMap<String, CacheEntry>,
    next_seq: u64,
}

/// Size snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
}

pub struct TtlCache<C: Clock = SystemClock> {
    inner: Mutex<Inner>,
    max_entries: usize,
    clock: C,
}

impl TtlCache<SystemClock> {
    pub fn new(max_entries: usize) -> Self {
        Self::with_clock(max_entries, SystemClock)
    }
}

impl Default for TtlCache<SystemClock> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl<C: Clock> TtlCache<C> {
    pub fn with_clock(max_entries: usize, clock: C) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                next_seq: 0,
            }),
            max_entries: max_entries.max(1),
            clock,
        }
    }

    /// Fresh value for `key`, or `None` on miss/expiry/type mismatch.
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();
        let entry = inner.entries.get(key)?;
        if entry.is_expired(now) {
            inner.entries.remove(key);
            return None;
        }
        entry.value.downcast_ref::<T>().cloned()
    }

    /// Store `value` under `key` for `ttl`, replacing any previous entry.
    pub fn set<T>(&self, key: impl Into<String>, value: T, ttl: Duration)
    where
        T: Send + Sync + 'static,
    {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            key.into(),
            CacheEntry {
                value: Arc::new(value),
                stored_at_ms: now,
                ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
                seq,
            },
        );
        if inner.entries.len() > self.max_entries {
            Self::shrink(&mut inner, now, self.max_entries);
        }
    }

    /// Same expiry semantics as [`Self::get`], without reading the value.
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();
        match inner.entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                inner.entries.remove(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Returns whether a live entry was removed.
    pub fn delete(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        self.inner
            .lock()
            .entries
            .remove(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    /// Entries currently held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            max_size: self.max_entries,
        }
    }

    /// Purge expired entries and enforce the size bound. Returns how many went.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        Self::shrink(&mut inner, now, self.max_entries);
        before - inner.entries.len()
    }

    fn shrink(inner: &mut Inner, now: i64, max_entries: usize) {
        inner.entries.retain(|_, entry| !entry.is_expired(now));

        let overflow = inner.entries.len().saturating_sub(max_entries);
        if overflow == 0 {
            return;
        }

        let mut by_age: Vec<(i64, u64, String)> = inner
            .entries
            .iter()
            .map(|(key, entry)| (entry.stored_at_ms, entry.seq, key.clone()))
            .collect();
        by_age.sort_unstable();
        for (_, _, key) in by_age.into_iter().take(overflow) {
            inner.entries.remove(&key);
        }
    }

    /// Read-through helper: return the cached value, or run `fetch` and cache
    /// its result. A `None` from `fetch` (upstream unavailable) is not cached.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        if let Some(hit) = self.get::<T>(key) {
            tracing::trace!(key, "cache hit");
            return Some(hit);
        }
        tracing::trace!(key, "cache miss");
        let value = fetch().await?;
        self.set(key, value.clone(), ttl);
        Some(value)
    }

    /// Run [`Self::sweep`] every `every` until the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = weak.upgrade() else {
                    break;
                };
                let removed = cache.sweep();
                if removed > 0 {
                    tracing::debug!(removed, size = cache.len(), "Swept cache entries");
                }
            }
        })
    }
}
