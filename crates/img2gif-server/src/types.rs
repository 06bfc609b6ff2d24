//! Core types for the img2gif server

use artifact_cache::CacheStats;
use serde::{Deserialize, Serialize};

/// Snapshot of frame-generation worker usage
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WorkerStats {
    pub capacity: usize,
    pub in_flight: usize,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub frames_per_animation: usize,
    pub cache: CacheStats,
    pub workers: WorkerStats,
}
