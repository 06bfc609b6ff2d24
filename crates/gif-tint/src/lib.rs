//! Tinted animation builder
//!
//! Turns a still image into a looping animation: one frame per palette
//! colour, each frame being the source with that colour laid over it at a
//! fixed opacity. Frames are generated in parallel on a rayon pool and
//! assembled in palette order.

pub mod animation;
pub mod error;
pub mod frames;
pub mod palette;

pub use animation::{AnimatedImage, AnimationAssembler, Artifact};
pub use error::{Result, TintError};
pub use frames::{build_thread_pool, tint, FrameGenerator};
pub use palette::{Palette, TintColor, DEFAULT_OPACITY};
