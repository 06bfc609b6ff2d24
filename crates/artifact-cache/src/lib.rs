//! In-memory artifact cache with extend-on-hit expiry
//!
//! Stores one computed artifact per source key. Each entry carries its own
//! expiry timestamp, guarded by a lock scoped to that entry, so lookups for
//! different keys never contend with each other. Eviction is lazy: an
//! expired entry is removed by the lookup that notices it.

mod cache;
mod clock;
mod types;

pub use cache::ArtifactCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use types::{CacheConfig, CacheStats};
