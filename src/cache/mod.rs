/// In-memory result cache for aggregated dossiers
///
/// Entries live for a fixed 24 hours. Expired entries are treated as absent
/// and removed on lookup; a background job sweeps the rest. Nothing survives
/// a restart and there is no size bound.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Time source for expiry decisions
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Cached value with its expiry
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Value,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Cache statistics reported by `GET /cache/stats`
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub total: usize,
    pub valid: usize,
    pub expired: usize,
}

/// Build the composite cache key for a dossier
pub fn dossier_key(jurisdiction_id: &str, dossier_id: &str) -> String {
    format!("{}:{}", jurisdiction_id, dossier_id)
}

/// Dossier result cache
pub struct ResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    /// TTL for every entry (24 hours)
    ttl: Duration,
    clock: Arc<dyn Clock>,
    /// Bumped on every full clear; only changed while `entries` is locked
    generation: AtomicU64,
}

impl ResultCache {
    /// Create a cache on the wall clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a cache on a custom clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::hours(24),
            clock,
            generation: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get a live entry; an expired one is removed and reported as a miss
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        let mut entries = self.lock();

        match entries.get(key) {
            Some(entry) if entry.is_valid_at(now) => Some(entry.value.clone()),
            Some(_) => {
                debug!(key, "Cache entry expired");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a value for the fixed TTL
    pub fn put(&self, key: &str, value: Value) {
        let expires_at = self.clock.now() + self.ttl;
        let mut entries = self.lock();
        entries.insert(key.to_string(), CacheEntry { value, expires_at });
        crate::metrics::CACHE_ENTRIES.set(entries.len() as i64);
    }

    /// Current clear generation, to pair with [`ResultCache::put_if_generation`]
    pub fn generation(&self) -> u64 {
        let _entries = self.lock();
        self.generation.load(Ordering::SeqCst)
    }

    /// Store a value only if no clear happened since `generation` was read.
    /// Returns whether the value was stored.
    pub fn put_if_generation(&self, key: &str, value: Value, generation: u64) -> bool {
        let expires_at = self.clock.now() + self.ttl;
        let mut entries = self.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(key, "Cache cleared since fetch started; result not stored");
            return false;
        }
        entries.insert(key.to_string(), CacheEntry { value, expires_at });
        crate::metrics::CACHE_ENTRIES.set(entries.len() as i64);
        true
    }

    /// Drop every entry, returning how many were removed
    pub fn clear(&self) -> usize {
        self.clear_with(|| {})
    }

    /// Run `f` and clear the cache under a single lock acquisition
    pub fn clear_with<F: FnOnce()>(&self, f: F) -> usize {
        let mut entries = self.lock();
        f();
        self.generation.fetch_add(1, Ordering::SeqCst);
        let removed = entries.len();
        entries.clear();
        crate::metrics::CACHE_ENTRIES.set(0);
        removed
    }

    /// Remove expired entries, returning how many were purged
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_valid_at(now));
        crate::metrics::CACHE_ENTRIES.set(entries.len() as i64);
        before - entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let entries = self.lock();
        let total = entries.len();
        let valid = entries.values().filter(|e| e.is_valid_at(now)).count();
        CacheStats {
            total,
            valid,
            expired: total - valid,
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Clock that only moves when told to
#[cfg(test)]
#[derive(Clone)]
pub struct ManualClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap();
        *current = *current + by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn cache_at_noon() -> (ResultCache, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap());
        (ResultCache::with_clock(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_put_and_get() {
        let (cache, _) = cache_at_noon();
        let value = json!({"carte": {"idDossierCivil": 42}});

        cache.put("13:202512025555", value.clone());

        assert_eq!(cache.get("13:202512025555"), Some(value));
        assert_eq!(cache.get("13:other"), None);
    }

    #[test]
    fn test_entry_valid_just_before_ttl() {
        let (cache, clock) = cache_at_noon();
        cache.put("k", json!(1));

        clock.advance(Duration::hours(23) + Duration::minutes(59));
        assert_eq!(cache.get("k"), Some(json!(1)));
    }

    #[test]
    fn test_entry_absent_just_after_ttl() {
        let (cache, clock) = cache_at_noon();
        cache.put("k", json!(1));

        clock.advance(Duration::hours(24) + Duration::seconds(1));
        assert_eq!(cache.get("k"), None);
        // Lazy purge removed it
        assert_eq!(cache.stats().total, 0);
    }

    #[test]
    fn test_entry_expires_exactly_at_ttl() {
        let (cache, clock) = cache_at_noon();
        cache.put("k", json!(1));

        clock.advance(Duration::hours(24));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_put_if_generation_skips_after_clear() {
        let (cache, _) = cache_at_noon();
        let before = cache.generation();

        cache.clear();
        assert!(!cache.put_if_generation("k", json!(1), before));
        assert_eq!(cache.stats().total, 0);

        assert!(cache.put_if_generation("k", json!(2), cache.generation()));
        assert_eq!(cache.get("k"), Some(json!(2)));
    }

    #[test]
    fn test_put_refreshes_expiry() {
        let (cache, clock) = cache_at_noon();
        cache.put("k", json!(1));
        clock.advance(Duration::hours(20));
        cache.put("k", json!(2));
        clock.advance(Duration::hours(20));

        assert_eq!(cache.get("k"), Some(json!(2)));
    }

    #[test]
    fn test_stats_counts_expired_until_purged() {
        let (cache, clock) = cache_at_noon();
        cache.put("old", json!(1));
        clock.advance(Duration::hours(25));
        cache.put("new", json!(2));

        assert_eq!(
            cache.stats(),
            CacheStats {
                total: 2,
                valid: 1,
                expired: 1
            }
        );

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                total: 1,
                valid: 1,
                expired: 0
            }
        );
    }

    #[test]
    fn test_clear() {
        let (cache, _) = cache_at_noon();
        cache.put("a", json!(1));
        cache.put("b", json!(2));

        assert_eq!(cache.clear(), 2);
        assert_eq!(cache.stats().total, 0);
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn test_clear_with_runs_closure() {
        let (cache, _) = cache_at_noon();
        cache.put("a", json!(1));

        let mut ran = false;
        let removed = cache.clear_with(|| ran = true);

        assert!(ran);
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_dossier_key() {
        assert_eq!(dossier_key("13", "202512025555"), "13:202512025555");
    }
}
