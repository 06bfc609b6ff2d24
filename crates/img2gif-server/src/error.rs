//! Error types for the img2gif server

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use std::fmt;

/// Failure to produce a decoded source image for a key
#[derive(Debug)]
pub enum LoadError {
    /// No source exists for the key
    NotFound(String),
    Io(Box<std::io::Error>),
    Decode(Box<image::ImageError>),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::NotFound(key) => write!(f, "Source not found: {}", key),
            LoadError::Io(err) => write!(f, "IO error: {}", err),
            LoadError::Decode(err) => write!(f, "Decode error: {}", err),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(err) => Some(err.as_ref()),
            LoadError::Decode(err) => Some(err.as_ref()),
            LoadError::NotFound(_) => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        LoadError::Io(Box::new(err))
    }
}

impl From<image::ImageError> for LoadError {
    fn from(err: image::ImageError) -> Self {
        LoadError::Decode(Box::new(err))
    }
}

#[derive(Debug)]
pub enum ServerError {
    /// Request did not name an image
    MissingName,
    SourceNotFound(String),
    /// Source exists but could not be decoded or turned into an animation
    Assembly(String),
    Config(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::MissingName => write!(f, "No image name given"),
            ServerError::SourceNotFound(key) => write!(f, "Image not found: {}", key),
            ServerError::Assembly(msg) => write!(f, "Assembly error: {}", msg),
            ServerError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<LoadError> for ServerError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::NotFound(key) => ServerError::SourceNotFound(key),
            other => ServerError::Assembly(other.to_string()),
        }
    }
}

impl From<gif_tint::TintError> for ServerError {
    fn from(err: gif_tint::TintError) -> Self {
        ServerError::Assembly(err.to_string())
    }
}

impl From<tracing_subscriber::filter::ParseError> for ServerError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        ServerError::Config(err.to_string())
    }
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::MissingName => (StatusCode::FORBIDDEN, "Please insert image name"),
            ServerError::SourceNotFound(key) => {
                tracing::warn!(key = %key, "Image not found");
                (StatusCode::NOT_FOUND, "Image not found")
            }
            other => {
                tracing::error!(error = %other, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: message.to_string(),
            }),
        )
            .into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
