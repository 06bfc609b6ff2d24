//! Cache types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Expiry policy for the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Lifetime of a freshly inserted entry
    pub ttl: Duration,
    /// Added to an entry's deadline on each hit
    pub hit_extension: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            hit_extension: Duration::from_secs(60),
        }
    }
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(300));
        assert_eq!(config.hit_extension, Duration::from_secs(60));
    }

    #[test]
    fn test_cache_stats_default() {
        let stats = CacheStats::default();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.expirations, 0);
    }

    #[test]
    fn test_cache_stats_serialization() {
        let stats = CacheStats {
            entries: 3,
            hits: 41,
            misses: 7,
            expirations: 2,
        };

        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"hits\":41"));

        let deserialized: CacheStats = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.entries, 3);
        assert_eq!(deserialized.expirations, 2);
    }
}
