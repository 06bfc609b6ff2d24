//! Concurrent key to artifact store with per-entry expiry

use crate::clock::{Clock, SystemClock};
use crate::types::{CacheConfig, CacheStats};
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

/// A stored artifact together with its expiry deadline.
///
/// The artifact itself is immutable; only `expires_at` changes after
/// creation, and only under its own lock.
struct Slot<A> {
    artifact: Arc<A>,
    expires_at: Mutex<DateTime<Utc>>,
}

/// Time-bounded cache holding one artifact per key.
///
/// Every hit pushes the entry's deadline forward by `hit_extension`.
/// Entries found past their deadline are dropped by the lookup that
/// observes them. Concurrent misses on the same key are not
/// coordinated: whichever `insert` lands last wins.
pub struct ArtifactCache<A> {
    entries: DashMap<String, Arc<Slot<A>>>,
    ttl: TimeDelta,
    hit_extension: TimeDelta,
    clock: Arc<dyn Clock>,
    /// Cache hit counter
    hits: AtomicU64,
    /// Cache miss counter, expired lookups included
    misses: AtomicU64,
    /// Entries dropped because their deadline had passed
    expirations: AtomicU64,
}

impl<A> ArtifactCache<A> {
    /// Create a cache backed by the wall clock
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache that reads time from `clock`
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: to_delta(config.ttl),
            hit_extension: to_delta(config.hit_extension),
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    /// Look up a fresh artifact, extending its lifetime on success.
    ///
    /// An entry whose deadline is not strictly in the future is evicted and
    /// reported as absent.
    pub fn lookup(&self, key: &str) -> Option<Arc<A>> {
        // Clone the slot out so the shard guard is released before any
        // removal below touches the same shard.
        let slot = self.entries.get(key).map(|entry| Arc::clone(entry.value()));

        let Some(slot) = slot else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache miss");
            return None;
        };

        let now = self.clock.now();
        {
            let mut expires_at = slot.expires_at.lock().unwrap_or_else(PoisonError::into_inner);
            if now < *expires_at {
                *expires_at = deadline(*expires_at, self.hit_extension);
                let expires_at = *expires_at;
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, expires_at = %expires_at, "Cache hit");
                return Some(Arc::clone(&slot.artifact));
            }
        }

        // Only drop the slot we saw expire; a replacement inserted in the
        // meantime stays.
        if self
            .entries
            .remove_if(key, |_, current| Arc::ptr_eq(current, &slot))
            .is_some()
        {
            self.expirations.fetch_add(1, Ordering::Relaxed);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Cache entry expired");
        None
    }

    /// Store `artifact` under `key`, replacing whatever was there
    pub fn insert(&self, key: impl Into<String>, artifact: Arc<A>) {
        let key = key.into();
        let expires_at = deadline(self.clock.now(), self.ttl);
        let slot = Arc::new(Slot {
            artifact,
            expires_at: Mutex::new(expires_at),
        });

        debug!(key = %key, expires_at = %expires_at, "Cached artifact");
        self.entries.insert(key, slot);
    }

    /// Current deadline for `key`, without counting as a hit or extending it
    pub fn expires_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries
            .get(key)
            .map(|entry| *entry.expires_at.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of stored entries, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get current cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}

fn to_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}

fn deadline(from: DateTime<Utc>, lifetime: TimeDelta) -> DateTime<Utc> {
    from.checked_add_signed(lifetime)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::thread;

    fn test_cache(ttl_secs: u64, hit_secs: u64) -> (ArtifactCache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let config = CacheConfig {
            ttl: Duration::from_secs(ttl_secs),
            hit_extension: Duration::from_secs(hit_secs),
        };
        let cache = ArtifactCache::with_clock(config, clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_insert_then_lookup() {
        let (cache, clock) = test_cache(300, 60);
        let inserted_at = clock.now();
        cache.insert("a.png", Arc::new("gif".to_string()));

        let found = cache.lookup("a.png");
        assert_eq!(found.as_deref().map(String::as_str), Some("gif"));
        assert_eq!(
            cache.expires_at("a.png"),
            Some(inserted_at + TimeDelta::seconds(360))
        );
    }

    #[test]
    fn test_every_hit_advances_expiry_with_default_config() {
        let clock = Arc::new(ManualClock::default());
        let cache = ArtifactCache::with_clock(CacheConfig::default(), clock.clone());
        cache.insert("a.png", Arc::new("gif".to_string()));
        let before = cache.expires_at("a.png").unwrap();

        clock.advance(TimeDelta::seconds(1));
        assert!(cache.lookup("a.png").is_some());
        let after = cache.expires_at("a.png").unwrap();
        assert_eq!(after - before, TimeDelta::seconds(60));

        assert!(cache.lookup("a.png").is_some());
        assert_eq!(
            cache.expires_at("a.png"),
            Some(before + TimeDelta::seconds(120))
        );
    }

    #[test]
    fn test_lookup_returns_shared_artifact() {
        let (cache, _clock) = test_cache(300, 60);
        let artifact = Arc::new("gif".to_string());
        cache.insert("a.png", artifact.clone());

        let found = cache.lookup("a.png").unwrap();
        assert!(Arc::ptr_eq(&found, &artifact));
    }

    #[test]
    fn test_hit_extends_past_ttl() {
        let (cache, clock) = test_cache(1, 60);
        let t0 = clock.now();
        cache.insert("a.png", Arc::new("gif".to_string()));

        clock.advance(TimeDelta::milliseconds(500));
        assert!(cache.lookup("a.png").is_some());
        assert_eq!(cache.expires_at("a.png"), Some(t0 + TimeDelta::seconds(61)));

        // Still alive well past the original one-second TTL
        clock.advance(TimeDelta::seconds(30));
        assert!(cache.lookup("a.png").is_some());
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let (cache, clock) = test_cache(1, 60);
        cache.insert("a.png", Arc::new("gif".to_string()));

        clock.advance(TimeDelta::seconds(2));
        assert!(cache.lookup("a.png").is_none());
        assert!(cache.expires_at("a.png").is_none());
        assert!(cache.is_empty());

        // Stays gone
        assert!(cache.lookup("a.png").is_none());
    }

    #[test]
    fn test_entry_is_stale_exactly_at_deadline() {
        let (cache, clock) = test_cache(10, 60);
        cache.insert("a.png", Arc::new("gif".to_string()));

        clock.advance(TimeDelta::seconds(10));
        assert!(cache.lookup("a.png").is_none());
    }

    #[test]
    fn test_reinsert_after_expiry() {
        let (cache, clock) = test_cache(1, 60);
        cache.insert("a.png", Arc::new("old".to_string()));
        clock.advance(TimeDelta::seconds(2));
        assert!(cache.lookup("a.png").is_none());

        cache.insert("a.png", Arc::new("new".to_string()));
        assert_eq!(cache.lookup("a.png").unwrap().as_str(), "new");
    }

    #[test]
    fn test_last_insert_wins() {
        let (cache, _clock) = test_cache(300, 60);
        cache.insert("a.png", Arc::new("first".to_string()));
        cache.insert("a.png", Arc::new("second".to_string()));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup("a.png").unwrap().as_str(), "second");
    }

    #[test]
    fn test_keys_are_independent() {
        let (cache, clock) = test_cache(5, 60);
        cache.insert("a.png", Arc::new("a".to_string()));
        clock.advance(TimeDelta::seconds(3));
        cache.insert("b.png", Arc::new("b".to_string()));
        clock.advance(TimeDelta::seconds(3));

        assert!(cache.lookup("a.png").is_none());
        assert_eq!(cache.lookup("b.png").unwrap().as_str(), "b");
    }

    #[test]
    fn test_hit_miss_counters() {
        let (cache, clock) = test_cache(1, 60);

        // Miss
        cache.lookup("a.png");
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);

        // Put and hit
        cache.insert("a.png", Arc::new("gif".to_string()));
        cache.lookup("a.png");
        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);

        // Expire
        clock.advance(TimeDelta::seconds(120));
        cache.lookup("a.png");
        let stats = cache.stats();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.expirations, 1);
    }

    #[test]
    fn test_huge_durations_saturate() {
        let clock = Arc::new(ManualClock::default());
        let config = CacheConfig {
            ttl: Duration::MAX,
            hit_extension: Duration::MAX,
        };
        let cache = ArtifactCache::with_clock(config, clock);
        cache.insert("a.png", Arc::new(1u8));
        assert!(cache.lookup("a.png").is_some());
        assert_eq!(cache.expires_at("a.png"), Some(DateTime::<Utc>::MAX_UTC));
    }

    #[test]
    fn test_concurrent_hits_on_one_key() {
        let (cache, clock) = test_cache(300, 60);
        let cache = Arc::new(cache);
        cache.insert("a.png", Arc::new("gif".to_string()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for _ in 0..100 {
                        assert!(cache.lookup("a.png").is_some());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.stats().hits, 800);
        assert!(cache.expires_at("a.png").unwrap() > clock.now());
    }

    #[test]
    fn test_concurrent_inserts_leave_one_entry_per_key() {
        let (cache, _clock) = test_cache(300, 60);
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    cache.insert("shared.png", Arc::new(format!("writer-{}", i)));
                    cache.insert(format!("own-{}.png", i), Arc::new(format!("writer-{}", i)));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 9);
        assert!(cache.lookup("shared.png").unwrap().starts_with("writer-"));
    }
}
