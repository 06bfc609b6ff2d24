//! Tint colours and the palette that drives frame generation

use crate::error::{Result, TintError};
use std::fmt;
use std::str::FromStr;

/// Overlay opacity used when none is configured
pub const DEFAULT_OPACITY: f32 = 0.3;

/// An opaque RGB colour laid over the source image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TintColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl TintColor {
    pub const BLACK: TintColor = TintColor::rgb(0, 0, 0);
    pub const BLUE: TintColor = TintColor::rgb(0, 0, 255);
    pub const CHOCOLATE: TintColor = TintColor::rgb(210, 105, 30);
    pub const CORAL: TintColor = TintColor::rgb(255, 127, 80);
    pub const CRIMSON: TintColor = TintColor::rgb(220, 20, 60);
    pub const DARK_CYAN: TintColor = TintColor::rgb(0, 139, 139);
    pub const DIM_GREY: TintColor = TintColor::rgb(105, 105, 105);
    pub const GREEN: TintColor = TintColor::rgb(0, 128, 0);
    pub const RED: TintColor = TintColor::rgb(255, 0, 0);
    pub const WHITE: TintColor = TintColor::rgb(255, 255, 255);
    pub const YELLOW: TintColor = TintColor::rgb(255, 255, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn named(name: &str) -> Option<Self> {
        let color = match name.to_ascii_lowercase().as_str() {
            "black" => Self::BLACK,
            "blue" => Self::BLUE,
            "chocolate" => Self::CHOCOLATE,
            "coral" => Self::CORAL,
            "crimson" => Self::CRIMSON,
            "darkcyan" => Self::DARK_CYAN,
            "dimgrey" | "dimgray" => Self::DIM_GREY,
            "green" => Self::GREEN,
            "red" => Self::RED,
            "white" => Self::WHITE,
            "yellow" => Self::YELLOW,
            _ => return None,
        };
        Some(color)
    }
}

/// Accepts `#rrggbb`, `rrggbb` or one of the built-in colour names
impl FromStr for TintColor {
    type Err = TintError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(color) = Self::named(s) {
            return Ok(color);
        }

        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TintError::InvalidColor(s.to_string()));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| TintError::InvalidColor(s.to_string()))
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl fmt::Display for TintColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Ordered tint colours plus the opacity each one is applied with.
///
/// Frame `i` of every animation is tinted with `colors()[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<TintColor>,
    opacity: f32,
}

impl Palette {
    pub fn new(colors: Vec<TintColor>, opacity: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(TintError::InvalidOpacity(opacity));
        }
        Ok(Self { colors, opacity })
    }

    /// Parse a comma-separated colour list such as `coral,#00ff00`
    pub fn parse(list: &str, opacity: f32) -> Result<Self> {
        let colors = list
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(TintColor::from_str)
            .collect::<Result<Vec<_>>>()?;
        Self::new(colors, opacity)
    }

    pub fn colors(&self) -> &[TintColor] {
        &self.colors
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: vec![
                TintColor::CORAL,
                TintColor::WHITE,
                TintColor::CHOCOLATE,
                TintColor::CRIMSON,
                TintColor::DARK_CYAN,
                TintColor::DIM_GREY,
            ],
            opacity: DEFAULT_OPACITY,
        }
    }
}
