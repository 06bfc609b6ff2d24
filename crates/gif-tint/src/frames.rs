//! Parallel generation of tinted frames

use crate::error::{Result, TintError};
use crate::palette::{Palette, TintColor};
use image::{Delay, Frame, RgbaImage};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::sync::Arc;
use tracing::debug;

/// Produces one tinted copy of a source image per palette colour.
///
/// Every frame is computed on its own clone of the source, so the workers
/// share nothing mutable. Output order always follows palette order.
#[derive(Clone)]
pub struct FrameGenerator {
    palette: Palette,
    delay: Delay,
    pool: Option<Arc<ThreadPool>>,
}

impl FrameGenerator {
    /// `delay_centis` is the display time of each frame in hundredths of a
    /// second, the native GIF unit. Work runs on rayon's global pool.
    pub fn new(palette: Palette, delay_centis: u16) -> Self {
        Self {
            palette,
            delay: Delay::from_numer_denom_ms(u32::from(delay_centis) * 10, 1),
            pool: None,
        }
    }

    /// Run frame generation on a dedicated pool instead of the global one
    pub fn with_pool(mut self, pool: Arc<ThreadPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Number of worker threads frames are spread over
    pub fn capacity(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Generate `palette.len()` frames from `source`, in palette order.
    ///
    /// Fails as a whole if any single frame fails; no partial output is
    /// returned.
    pub fn generate(&self, source: &RgbaImage) -> Result<Vec<Frame>> {
        if source.width() == 0 || source.height() == 0 {
            return Err(TintError::EmptySource);
        }

        let colors = self.palette.colors();
        let opacity = self.palette.opacity();
        let delay = self.delay;

        let frames = fan_out(self.pool.as_deref(), colors.len(), |i| {
            let layer = tint(source, colors[i], opacity);
            Ok(Frame::from_parts(layer, 0, 0, delay))
        })?;

        debug!(
            frames = frames.len(),
            width = source.width(),
            height = source.height(),
            "Generated tinted frames"
        );
        Ok(frames)
    }
}

/// Run `task(0..count)` in parallel and collect the results by index.
///
/// The returned vector is ordered by index regardless of which task
/// finished first. The first error aborts the collection.
fn fan_out<T, F>(pool: Option<&ThreadPool>, count: usize, task: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> Result<T> + Sync + Send,
{
    let run = || {
        (0..count)
            .into_par_iter()
            .map(&task)
            .collect::<Result<Vec<T>>>()
    };

    match pool {
        Some(pool) => pool.install(run),
        None => run(),
    }
}

/// Copy of `source` with `color` composited over every pixel at `opacity`.
///
/// Uses source-over blending, so transparent regions of the source pick up
/// the tint's own alpha.
pub fn tint(source: &RgbaImage, color: TintColor, opacity: f32) -> RgbaImage {
    let mut layer = source.clone();
    let over_a = opacity.clamp(0.0, 1.0);

    for pixel in layer.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let under_a = f32::from(a) / 255.0;
        let out_a = over_a + under_a * (1.0 - over_a);
        if out_a <= 0.0 {
            pixel.0 = [0, 0, 0, 0];
            continue;
        }

        let mix = |over: u8, under: u8| {
            let value =
                (f32::from(over) * over_a + f32::from(under) * under_a * (1.0 - over_a)) / out_a;
            value.round().clamp(0.0, 255.0) as u8
        };
        pixel.0 = [
            mix(color.r, r),
            mix(color.g, g),
            mix(color.b, b),
            (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
        ];
    }

    layer
}

/// Build the pool frame generation runs on. `None` uses rayon's default size.
pub fn build_thread_pool(threads: Option<usize>) -> Result<ThreadPool> {
    if threads == Some(0) {
        return Err(TintError::ThreadPool(
            "worker thread count must be >= 1 when set".to_string(),
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("frame-gen-{}", i));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| TintError::ThreadPool(format!("failed to build thread pool: {}", e)))
}
