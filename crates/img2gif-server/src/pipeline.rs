//! Request pipeline: cache lookup, then load, assemble and install on a miss

use crate::error::Result;
use crate::loader::SourceLoader;
use crate::types::WorkerStats;
use artifact_cache::{ArtifactCache, CacheStats};
use gif_tint::{AnimationAssembler, Artifact};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// How a request was satisfied
#[derive(Debug, Clone)]
pub enum Served {
    /// Taken from the cache
    Hit(Arc<Artifact>),
    /// Built for this request and installed in the cache
    Fresh(Arc<Artifact>),
}

impl Served {
    pub fn artifact(&self) -> &Arc<Artifact> {
        match self {
            Served::Hit(artifact) | Served::Fresh(artifact) => artifact,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Served::Hit(_))
    }
}

/// Counts assemblies in progress against the worker capacity.
///
/// Purely advisory: nothing is ever refused because of it.
pub struct WorkerLoad {
    capacity: usize,
    in_flight: AtomicUsize,
}

impl WorkerLoad {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Register one assembly; it is released when the permit drops
    pub fn enter(&self) -> WorkerPermit<'_> {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        WorkerPermit { load: self }
    }

    /// Fraction of capacity in use, may exceed 1.0
    pub fn load_factor(&self) -> f64 {
        self.in_flight.load(Ordering::Relaxed) as f64 / self.capacity as f64
    }

    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            capacity: self.capacity,
            in_flight: self.in_flight.load(Ordering::Relaxed),
        }
    }
}

pub struct WorkerPermit<'a> {
    load: &'a WorkerLoad,
}

impl Drop for WorkerPermit<'_> {
    fn drop(&mut self) {
        self.load.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Serves animations by key.
///
/// Concurrent misses on one key are not coalesced; each builds its own
/// artifact and the last insert wins.
pub struct RequestPipeline {
    cache: ArtifactCache<Artifact>,
    loader: Arc<dyn SourceLoader>,
    assembler: AnimationAssembler,
    load: WorkerLoad,
    busy_threshold: f64,
}

impl RequestPipeline {
    pub fn new(
        cache: ArtifactCache<Artifact>,
        loader: Arc<dyn SourceLoader>,
        assembler: AnimationAssembler,
        busy_threshold: f64,
    ) -> Self {
        let load = WorkerLoad::new(assembler.generator().capacity());
        Self {
            cache,
            loader,
            assembler,
            load,
            busy_threshold,
        }
    }

    /// Return the animation for `key`, building and caching it on a miss.
    ///
    /// Blocks for the duration of loading and assembly; call it from a
    /// blocking-capable thread.
    pub fn serve(&self, key: &str) -> Result<Served> {
        if let Some(artifact) = self.cache.lookup(key) {
            debug!(key = %key, "Serving cached animation");
            return Ok(Served::Hit(artifact));
        }

        let started = Instant::now();
        let source = self.loader.load(key)?;

        let artifact = {
            let _permit = self.load.enter();
            let load_factor = self.load.load_factor();
            if load_factor > self.busy_threshold {
                warn!(key = %key, load_factor, "Frame workers busy, assembly may be slow");
            }
            Arc::new(self.assembler.assemble(&source)?)
        };

        self.cache.insert(key, Arc::clone(&artifact));
        info!(
            key = %key,
            frames = artifact.frame_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Built animation"
        );
        Ok(Served::Fresh(artifact))
    }

    #[cfg(test)]
    pub fn cache(&self) -> &ArtifactCache<Artifact> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn worker_stats(&self) -> WorkerStats {
        self.load.stats()
    }

    pub fn frames_per_animation(&self) -> usize {
        self.assembler.generator().palette().len()
    }
}
