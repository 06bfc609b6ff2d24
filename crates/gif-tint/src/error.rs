//! Error types for frame generation and assembly

use std::fmt;

#[derive(Debug)]
pub enum TintError {
    Image(Box<image::ImageError>),
    /// Source image has no pixels
    EmptySource,
    /// Dimensions the animation format cannot represent
    Dimensions { width: u32, height: u32 },
    /// Animation holds no frames to encode
    NoFrames,
    InvalidColor(String),
    InvalidOpacity(f32),
    ThreadPool(String),
}

impl fmt::Display for TintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TintError::Image(err) => write!(f, "Image error: {}", err),
            TintError::EmptySource => write!(f, "Source image is empty"),
            TintError::Dimensions { width, height } => {
                write!(f, "Unsupported animation size {}x{}", width, height)
            }
            TintError::NoFrames => write!(f, "Animation has no frames"),
            TintError::InvalidColor(value) => write!(f, "Invalid tint color: {}", value),
            TintError::InvalidOpacity(value) => {
                write!(f, "Tint opacity must be within [0, 1], got {}", value)
            }
            TintError::ThreadPool(msg) => write!(f, "Thread pool error: {}", msg),
        }
    }
}

impl std::error::Error for TintError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TintError::Image(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<image::ImageError> for TintError {
    fn from(err: image::ImageError) -> Self {
        TintError::Image(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, TintError>;
