//! Colors for annotations and the pen color rotation

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// RGBA color with 8-bit channels and a fractional alpha
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Opacity in `0.0..=1.0`
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_opaque(&self) -> bool {
        self.a >= 1.0
    }

    /// Channels as normalized floats
    pub fn to_normalized(&self) -> (f32, f32, f32, f32) {
        (self.r as f32 / 255.0, self.g as f32 / 255.0, self.b as f32 / 255.0, self.a)
    }
}

/// Opaque colors render as `#RRGGBB`, translucent ones as `rgba(r, g, b, a)`
impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_opaque() {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized color: {0}")]
pub struct ParseColorError(String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let invalid = || ParseColorError(s.to_owned());

        if let Some(hex) = input.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return Err(invalid());
            }
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
            return Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?));
        }

        let (body, expects_alpha) = if let Some(rest) = input.strip_prefix("rgba(") {
            (rest, true)
        } else if let Some(rest) = input.strip_prefix("rgb(") {
            (rest, false)
        } else {
            return Err(invalid());
        };

        let body = body.strip_suffix(')').ok_or_else(invalid)?;
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        if parts.len() != if expects_alpha { 4 } else { 3 } {
            return Err(invalid());
        }

        let channel = |i: usize| parts[i].parse::<u8>().map_err(|_| invalid());
        let a = if expects_alpha {
            parts[3].parse::<f32>().ok().filter(|a| (0.0..=1.0).contains(a)).ok_or_else(invalid)?
        } else {
            1.0
        };

        Ok(Color::rgba(channel(0)?, channel(1)?, channel(2)?, a))
    }
}

impl TryFrom<String> for Color {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}

/// Colorblind-safe stroke palette
pub const STROKE_PALETTE: [Color; 7] = [
    Color::rgb(0xE6, 0x9F, 0x00), // orange
    Color::rgb(0x56, 0xB4, 0xE9), // sky blue
    Color::rgb(0x00, 0x9E, 0x73), // green
    Color::rgb(0xF0, 0xE4, 0x42), // yellow
    Color::rgb(0x00, 0x72, 0xB2), // blue
    Color::rgb(0xD5, 0x5E, 0x00), // vermillion
    Color::rgb(0xCC, 0x79, 0xA7), // reddish purple
];

/// Random palette walk that never returns the same color twice in a row
#[derive(Debug, Clone)]
pub struct ColorRotation {
    palette: Vec<Color>,
    last: Option<usize>,
    rng: StdRng,
}

impl Default for ColorRotation {
    fn default() -> Self {
        Self::new(STROKE_PALETTE.to_vec())
    }
}

impl ColorRotation {
    /// Rotation over a custom palette; an empty palette falls back to the default one
    pub fn new(palette: Vec<Color>) -> Self {
        Self::with_rng(palette, StdRng::from_entropy())
    }

    /// Deterministic rotation for reproducible sessions and tests
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(STROKE_PALETTE.to_vec(), StdRng::seed_from_u64(seed))
    }

    fn with_rng(palette: Vec<Color>, rng: StdRng) -> Self {
        let palette = if palette.is_empty() { STROKE_PALETTE.to_vec() } else { palette };
        Self { palette, last: None, rng }
    }

    pub fn palette(&self) -> &[Color] {
        &self.palette
    }

    pub fn next_color(&mut self) -> Color {
        let pool: Vec<usize> =
            (0..self.palette.len()).filter(|&i| Some(i) != self.last).collect();

        // Single-color palettes have nothing to alternate with
        let index = if pool.is_empty() {
            0
        } else {
            pool[self.rng.gen_range(0..pool.len())]
        };

        self.last = Some(index);
        self.palette[index]
    }
}
