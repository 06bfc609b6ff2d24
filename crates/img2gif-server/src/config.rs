//! Server configuration read from environment variables

use crate::error::{Result, ServerError};
use artifact_cache::CacheConfig;
use gif_tint::{Palette, DEFAULT_OPACITY};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub image_dir: PathBuf,
    pub cache: CacheConfig,
    /// Per-frame display time in hundredths of a second
    pub frame_delay_centis: u16,
    pub palette: Palette,
    /// Frame-generation pool size; `None` lets rayon decide
    pub worker_threads: Option<usize>,
    /// Load factor above which the worker pool is reported as busy
    pub busy_threshold: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5050,
            image_dir: PathBuf::from("./images"),
            cache: CacheConfig::default(),
            frame_delay_centis: 10,
            palette: Palette::default(),
            worker_threads: None,
            busy_threshold: 0.8,
        }
    }
}

impl ServerConfig {
    /// Parse configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Parse configuration from an arbitrary variable source
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let port = parse_or(&var, "PORT", defaults.port);

        let image_dir = var("IMAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.image_dir);

        let cache = CacheConfig {
            ttl: var("CACHE_TTL_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache.ttl),
            hit_extension: var("CACHE_HIT_EXTENSION_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache.hit_extension),
        };

        let frame_delay_centis = parse_or(&var, "FRAME_DELAY_CS", defaults.frame_delay_centis);

        let opacity = parse_or(&var, "TINT_OPACITY", DEFAULT_OPACITY);
        let palette = match var("PALETTE") {
            Some(list) => Palette::parse(&list, opacity),
            None => Palette::new(defaults.palette.colors().to_vec(), opacity),
        }
        .map_err(|e| ServerError::Config(e.to_string()))?;
        if palette.is_empty() {
            return Err(ServerError::Config(
                "PALETTE must contain at least one color".to_string(),
            ));
        }

        let worker_threads = match var("WORKER_THREADS") {
            Some(s) => match s.parse::<usize>() {
                Ok(0) | Err(_) => {
                    return Err(ServerError::Config(format!(
                        "WORKER_THREADS must be a positive integer, got {:?}",
                        s
                    )))
                }
                Ok(n) => Some(n),
            },
            None => None,
        };

        let busy_threshold = parse_or(&var, "BUSY_THRESHOLD", defaults.busy_threshold);

        Ok(Self {
            port,
            image_dir,
            cache,
            frame_delay_centis,
            palette,
            worker_threads,
            busy_threshold,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    var(name)
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}
