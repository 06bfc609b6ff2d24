//! Animation assembly and GIF encoding

use crate::error::{Result, TintError};
use crate::frames::FrameGenerator;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};
use std::fmt;
use std::time::Instant;
use tracing::debug;

/// Quantizer speed passed to the GIF encoder (1 = best, 30 = fastest)
const ENCODE_SPEED: i32 = 10;

/// An animation under construction.
///
/// Like most animation containers it is never frameless: a new image holds
/// a single blank frame of its own size, which callers strip once real
/// frames have been added.
pub struct AnimatedImage {
    width: u32,
    height: u32,
    repeat: Repeat,
    frames: Vec<Frame>,
}

impl AnimatedImage {
    /// Create an infinitely looping `width`x`height` animation holding one
    /// blank frame
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let max = u32::from(u16::MAX);
        if width == 0 || height == 0 || width > max || height > max {
            return Err(TintError::Dimensions { width, height });
        }

        let blank = Frame::from_parts(
            RgbaImage::new(width, height),
            0,
            0,
            Delay::from_numer_denom_ms(0, 1),
        );
        Ok(Self {
            width,
            height,
            repeat: Repeat::Infinite,
            frames: vec![blank],
        })
    }

    pub fn set_repeat(&mut self, repeat: Repeat) {
        self.repeat = repeat;
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn remove_frame(&mut self, index: usize) -> Option<Frame> {
        (index < self.frames.len()).then(|| self.frames.remove(index))
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Freeze the animation as it currently stands
    pub fn into_artifact(self) -> Artifact {
        Artifact {
            width: self.width,
            height: self.height,
            repeat: self.repeat,
            frames: self.frames,
        }
    }
}

/// A finished, immutable animation ready to be cached and served
pub struct Artifact {
    width: u32,
    height: u32,
    repeat: Repeat,
    frames: Vec<Frame>,
}

impl Artifact {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn repeat(&self) -> Repeat {
        self.repeat
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Encode as an animated GIF. A frameless artifact has no valid GIF
    /// form and is rejected.
    pub fn encode_gif(&self) -> Result<Vec<u8>> {
        if self.frames.is_empty() {
            return Err(TintError::NoFrames);
        }

        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new_with_speed(&mut bytes, ENCODE_SPEED);
            encoder.set_repeat(self.repeat)?;
            encoder.encode_frames(self.frames.iter().map(|frame| {
                Frame::from_parts(frame.buffer().clone(), frame.left(), frame.top(), frame.delay())
            }))?;
        }
        Ok(bytes)
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("repeat", &self.repeat)
            .field("frames", &self.frames.len())
            .finish()
    }
}

/// Builds artifacts from source images using a [`FrameGenerator`]
#[derive(Clone)]
pub struct AnimationAssembler {
    generator: FrameGenerator,
}

impl AnimationAssembler {
    pub fn new(generator: FrameGenerator) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &FrameGenerator {
        &self.generator
    }

    /// Build a looping animation with one tinted frame per palette colour
    pub fn assemble(&self, source: &RgbaImage) -> Result<Artifact> {
        let started = Instant::now();
        let (width, height) = source.dimensions();

        let mut animation = AnimatedImage::new(width, height)?;
        animation.set_repeat(Repeat::Infinite);

        for frame in self.generator.generate(source)? {
            animation.push_frame(frame);
        }
        animation.remove_frame(0);

        let artifact = animation.into_artifact();
        debug!(
            frames = artifact.frame_count(),
            width,
            height,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Assembled animation"
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{Palette, TintColor};
    use image::codecs::gif::GifDecoder;
    use image::{AnimationDecoder, Rgba};
    use std::io::Cursor;

    fn white(size: u32) -> RgbaImage {
        RgbaImage::from_pixel(size, size, Rgba([255, 255, 255, 255]))
    }

    fn assembler(colors: Vec<TintColor>, delay: u16) -> AnimationAssembler {
        let palette = Palette::new(colors, 0.3).unwrap();
        AnimationAssembler::new(FrameGenerator::new(palette, delay))
    }

    fn within(actual: [u8; 4], expected: [u8; 4], tolerance: u8) -> bool {
        actual
            .iter()
            .zip(expected.iter())
            .all(|(a, e)| a.abs_diff(*e) <= tolerance)
    }

    #[test]
    fn test_new_animation_has_one_blank_frame() {
        let animation = AnimatedImage::new(3, 2).unwrap();
        assert_eq!(animation.frame_count(), 1);

        let artifact = animation.into_artifact();
        assert!(matches!(artifact.repeat(), Repeat::Infinite));
        let blank = &artifact.frames()[0];
        assert_eq!(blank.buffer().dimensions(), (3, 2));
        assert!(blank.buffer().pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn test_new_animation_rejects_bad_dimensions() {
        assert!(matches!(
            AnimatedImage::new(0, 4),
            Err(TintError::Dimensions { width: 0, height: 4 })
        ));
        assert!(AnimatedImage::new(70_000, 4).is_err());
    }

    #[test]
    fn test_remove_frame_out_of_range() {
        let mut animation = AnimatedImage::new(1, 1).unwrap();
        assert!(animation.remove_frame(3).is_none());
        assert!(animation.remove_frame(0).is_some());
        assert_eq!(animation.frame_count(), 0);
    }

    #[test]
    fn test_red_blue_white_square() {
        let artifact = assembler(vec![TintColor::RED, TintColor::BLUE], 10)
            .assemble(&white(4))
            .unwrap();

        assert_eq!(artifact.frame_count(), 2);
        assert_eq!(artifact.dimensions(), (4, 4));
        assert!(matches!(artifact.repeat(), Repeat::Infinite));

        let expected = [[255, 179, 179, 255], [179, 179, 255, 255]];
        for (frame, want) in artifact.frames().iter().zip(expected) {
            assert_eq!(frame.buffer().dimensions(), (4, 4));
            assert_eq!(frame.delay().numer_denom_ms(), (100, 1));
            for pixel in frame.buffer().pixels() {
                assert!(within(pixel.0, want, 1), "got {:?}", pixel.0);
            }
        }
    }

    #[test]
    fn test_frame_count_matches_palette_size() {
        let all = [
            TintColor::RED,
            TintColor::GREEN,
            TintColor::BLUE,
            TintColor::WHITE,
            TintColor::BLACK,
            TintColor::CORAL,
            TintColor::CRIMSON,
        ];
        for n in 0..=all.len() {
            let artifact = assembler(all[..n].to_vec(), 10).assemble(&white(2)).unwrap();
            assert_eq!(artifact.frame_count(), n);
        }
    }

    #[test]
    fn test_blank_base_never_leaks() {
        let artifact = assembler(vec![TintColor::BLACK], 10).assemble(&white(2)).unwrap();
        for frame in artifact.frames() {
            assert!(frame.buffer().pixels().all(|p| p.0[3] == 255));
        }
    }

    #[test]
    fn test_assembly_is_repeatable() {
        let source = RgbaImage::from_fn(5, 3, |x, y| Rgba([(x * 40) as u8, (y * 70) as u8, 9, 255]));
        let assembler = AnimationAssembler::new(FrameGenerator::new(Palette::default(), 7));

        let first = assembler.assemble(&source).unwrap();
        let second = assembler.assemble(&source).unwrap();

        assert_eq!(first.frame_count(), second.frame_count());
        for (a, b) in first.frames().iter().zip(second.frames()) {
            assert_eq!(a.delay(), b.delay());
            assert_eq!(a.buffer(), b.buffer());
        }
    }

    #[test]
    fn test_assemble_empty_source_fails() {
        let err = assembler(vec![TintColor::RED], 10)
            .assemble(&RgbaImage::new(0, 0))
            .unwrap_err();
        assert!(matches!(err, TintError::Dimensions { .. }));
    }

    #[test]
    fn test_encode_frameless_artifact_fails() {
        let artifact = assembler(Vec::new(), 10).assemble(&white(2)).unwrap();
        assert_eq!(artifact.frame_count(), 0);
        assert!(matches!(artifact.encode_gif(), Err(TintError::NoFrames)));
    }

    #[test]
    fn test_encode_finite_repeat() {
        let mut animation = AnimatedImage::new(2, 2).unwrap();
        animation.set_repeat(Repeat::Finite(3));
        let artifact = animation.into_artifact();
        assert!(matches!(artifact.repeat(), Repeat::Finite(3)));

        let bytes = artifact.encode_gif().unwrap();
        assert!(bytes.starts_with(b"GIF89a"));
        let frames = GifDecoder::new(Cursor::new(bytes))
            .unwrap()
            .into_frames()
            .collect_frames()
            .unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_encode_gif_round_trip() {
        let artifact = assembler(vec![TintColor::RED, TintColor::BLUE], 10)
            .assemble(&white(4))
            .unwrap();
        let bytes = artifact.encode_gif().unwrap();

        assert!(bytes.starts_with(b"GIF89a"));
        // Looping is signalled through the NETSCAPE application extension
        assert!(bytes.windows(11).any(|w| w == b"NETSCAPE2.0"));

        let decoder = GifDecoder::new(Cursor::new(bytes)).unwrap();
        let frames = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(frames.len(), 2);

        let expected = [[255, 179, 179, 255], [179, 179, 255, 255]];
        for (frame, want) in frames.iter().zip(expected) {
            assert_eq!(frame.buffer().dimensions(), (4, 4));
            assert_eq!(frame.delay().numer_denom_ms(), (100, 1));
            assert!(within(frame.buffer().get_pixel(1, 1).0, want, 12));
        }
    }
}
