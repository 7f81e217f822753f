//! In-memory TTL cache.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use ecs_sd_core::error::{EcsSdError, Result};

/// Cache entry with an optional expiry instant.
#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired_at(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if now > at)
    }
}

/// Result of a cache lookup.
///
/// `Stale` is only produced by caches configured with `return_stale`; it lets
/// callers tell "have an answer, just old" apart from "never had this".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup<V> {
    /// Present and not expired.
    Fresh(V),
    /// Present but expired.
    Stale(V),
    /// Not present (or expired, when stale reads are disabled).
    Absent,
}

impl<V> Lookup<V> {
    /// Returns the value only if it is fresh.
    pub fn fresh(self) -> Option<V> {
        match self {
            Lookup::Fresh(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the value whether fresh or stale.
    pub fn value(self) -> Option<V> {
        match self {
            Lookup::Fresh(v) | Lookup::Stale(v) => Some(v),
            Lookup::Absent => None,
        }
    }

    /// Returns true for `Fresh`.
    pub fn is_fresh(&self) -> bool {
        matches!(self, Lookup::Fresh(_))
    }
}

/// Cache configuration.
#[derive(Clone, Debug, Default)]
pub struct CacheConfig {
    /// TTL used by [`TtlCache::set_default`]; `None` means never expire
    pub default_ttl: Option<Duration>,
    /// Interval of the background sweep; `None` disables it
    pub janitor_interval: Option<Duration>,
    /// Whether `get` surfaces expired values as [`Lookup::Stale`]
    pub return_stale: bool,
}

impl CacheConfig {
    /// Sets the default TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Enables the background sweep.
    pub fn with_janitor(mut self, interval: Duration) -> Self {
        self.janitor_interval = Some(interval);
        self
    }

    /// Makes `get` return expired values as stale.
    pub fn with_stale_reads(mut self) -> Self {
        self.return_stale = true;
        self
    }
}

/// Concurrent key/value cache with per-entry TTL.
///
/// All operations take `&self` and may be called from any number of tasks or
/// threads. Freshness is enforced on read; the janitor only bounds memory for
/// keys that are written once and never read again.
pub struct TtlCache<K, V>
where
    K: Eq + Hash,
{
    entries: Arc<DashMap<K, CacheEntry<V>>>,
    config: CacheConfig,
    shutdown_tx: watch::Sender<bool>,
    janitor: Option<JoinHandle<()>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache with no default TTL, no janitor and no stale reads.
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            entries: Arc::new(DashMap::new()),
            config: CacheConfig::default(),
            shutdown_tx,
            janitor: None,
        }
    }

    /// Creates a cache with custom configuration.
    ///
    /// A janitor interval must be positive and requires a running tokio
    /// runtime to spawn the sweep task on.
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let entries = Arc::new(DashMap::new());

        let janitor = match config.janitor_interval {
            None => None,
            Some(interval) if interval.is_zero() => {
                return Err(EcsSdError::ConfigError(
                    "janitor interval must be greater than 0".into(),
                ));
            }
            Some(interval) => {
                let handle = tokio::runtime::Handle::try_current().map_err(|_| {
                    EcsSdError::ConfigError("cache janitor requires a tokio runtime".into())
                })?;
                Some(handle.spawn(run_janitor(entries.clone(), interval, shutdown_rx)))
            }
        };

        Ok(Self {
            entries,
            config,
            shutdown_tx,
            janitor,
        })
    }

    /// Looks up a key.
    pub fn get(&self, key: &K) -> Lookup<V> {
        let Some(entry) = self.entries.get(key) else {
            return Lookup::Absent;
        };

        if entry.is_expired_at(Instant::now()) {
            if self.config.return_stale {
                return Lookup::Stale(entry.value.clone());
            }
            return Lookup::Absent;
        }

        Lookup::Fresh(entry.value.clone())
    }

    /// Stores a value. A zero `ttl`, or one too large to represent as a
    /// deadline, means the value never expires.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Instant::now().checked_add(ttl)
        };
        self.entries.insert(key, CacheEntry { value, expires_at });
    }

    /// Stores a value with the configured default TTL.
    pub fn set_default(&self, key: K, value: V) {
        self.set(key, value, self.config.default_ttl.unwrap_or(Duration::ZERO));
    }

    /// Calls `f` for every live entry until it returns `false`.
    ///
    /// Iterates over a snapshot, so `f` may itself read or write the cache.
    pub fn range<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let now = Instant::now();
        let live: Vec<(K, V)> = self
            .entries
            .iter()
            .filter(|e| !e.value().is_expired_at(now))
            .map(|e| (e.key().clone(), e.value().value.clone()))
            .collect();

        for (key, value) in &live {
            if !f(key, value) {
                break;
            }
        }
    }

    /// Removes an entry.
    pub fn delete(&self, key: &K) {
        self.entries.remove(key);
    }

    /// Removes all expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        purge(&self.entries)
    }

    /// Returns the number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stops the janitor and drops every entry.
    pub fn close(&self) {
        let _ = self.shutdown_tx.send(true);
        self.entries.clear();
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Drop for TtlCache<K, V>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.janitor.take() {
            handle.abort();
        }
    }
}

fn purge<K, V>(entries: &DashMap<K, CacheEntry<V>>) -> usize
where
    K: Eq + Hash,
{
    let now = Instant::now();
    let mut removed = 0;
    entries.retain(|_, entry| {
        if entry.is_expired_at(now) {
            removed += 1;
            false
        } else {
            true
        }
    });
    removed
}

async fn run_janitor<K, V>(
    entries: Arc<DashMap<K, CacheEntry<V>>>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    K: Eq + Hash,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(interval_ms = period.as_millis() as u64, "cache janitor started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = purge(&entries);
                if removed > 0 {
                    debug!(removed, remaining = entries.len(), "evicted expired cache entries");
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("cache janitor shutting down");
                    break;
                }
            }
        }
    }
}
