//! HTTP server for animation endpoints
//!
//! Provides /health and /{*key}, where key is an image path relative to the
//! image directory. `/health` is reserved: a source named `health` at the
//! top of the image directory cannot be served, though one in a
//! subdirectory can.

use crate::error::{Result, ServerError};
use crate::pipeline::RequestPipeline;
use crate::types::HealthResponse;
use axum::{
    extract::{Path, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::info;

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Shared state for the HTTP server
pub struct ServerState {
    pub pipeline: RequestPipeline,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(pipeline: RequestPipeline) -> Self {
        Self {
            pipeline,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(missing_name))
        .route("/{*key}", get(get_animation))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: SharedState, port: u16) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds() as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        frames_per_animation: state.pipeline.frames_per_animation(),
        cache: state.pipeline.cache_stats(),
        workers: state.pipeline.worker_stats(),
    })
}

async fn missing_name() -> ServerError {
    ServerError::MissingName
}

/// Get the animation for an image
async fn get_animation(State(state): State<SharedState>, Path(key): Path<String>) -> Response {
    let started = Instant::now();

    let response = match render(state, key.clone()).await {
        Ok((bytes, from_cache)) => {
            let cache_header = if from_cache { "HIT" } else { "MISS" };
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "image/gif"), (X_CACHE, cache_header)],
                bytes,
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    };

    info!(
        key = %key,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Request handled"
    );
    response
}

/// Run the pipeline and encode the result off the async runtime
async fn render(state: SharedState, key: String) -> Result<(Vec<u8>, bool)> {
    if key.trim_matches('/').is_empty() {
        return Err(ServerError::MissingName);
    }

    tokio::task::spawn_blocking(move || -> Result<(Vec<u8>, bool)> {
        let served = state.pipeline.serve(&key)?;
        let bytes = served.artifact().encode_gif()?;
        Ok((bytes, served.is_hit()))
    })
    .await
    .map_err(|e| ServerError::Assembly(format!("worker task failed: {}", e)))?
}
