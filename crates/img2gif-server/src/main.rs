//! img2gif - tinted animated GIFs from still images
//!
//! Serves every image under the image directory as a looping GIF with one
//! tinted frame per palette colour. Built animations are kept in memory and
//! their lifetime is extended each time they are served.

mod config;
mod error;
mod loader;
mod pipeline;
mod server;
mod types;

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::loader::FsSourceLoader;
use crate::pipeline::RequestPipeline;
use crate::server::{start_server, ServerState, SharedState};
use artifact_cache::ArtifactCache;
use gif_tint::{build_thread_pool, AnimationAssembler, FrameGenerator};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env().add_directive("img2gif_server=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting img2gif server...");

    // Load configuration from environment
    let config = ServerConfig::from_env()?;
    info!("Port: {}", config.port);
    info!("Image dir: {:?}", config.image_dir);
    info!(
        "Cache TTL: {} seconds, hit extension: {} seconds",
        config.cache.ttl.as_secs(),
        config.cache.hit_extension.as_secs()
    );
    info!(
        "Palette: {} colors at opacity {}, frame delay {} cs",
        config.palette.len(),
        config.palette.opacity(),
        config.frame_delay_centis
    );

    // Frame generation pool
    let pool = build_thread_pool(config.worker_threads)
        .map_err(|e| ServerError::Config(e.to_string()))?;
    let generator = FrameGenerator::new(config.palette.clone(), config.frame_delay_centis)
        .with_pool(Arc::new(pool));
    info!("Frame workers: {}", generator.capacity());

    let pipeline = RequestPipeline::new(
        ArtifactCache::new(config.cache),
        Arc::new(FsSourceLoader::new(config.image_dir.clone())),
        AnimationAssembler::new(generator),
        config.busy_threshold,
    );

    // Create shared state
    let state: SharedState = Arc::new(ServerState::new(pipeline));

    // Start HTTP server (blocking)
    start_server(state, config.port)
        .await
        .map_err(|e| ServerError::Config(format!("Server error: {}", e)))?;

    Ok(())
}
