use std::fmt;

use anyhow::{Context, anyhow};
use serde::Serialize;

pub const DEFAULT_OUTSIDE_ALPHA: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parses `#RRGGBB`.
    pub fn parse_hex(raw: &str) -> anyhow::Result<Self> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix('#')
            .ok_or_else(|| anyhow!("color must start with '#': {trimmed}"))?;
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow!("expected #RRGGBB color, got: {trimmed}"));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .with_context(|| format!("invalid hex channel in {trimmed}"))
        };

        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    pub fn with_alpha(self, alpha: f64) -> Rgba {
        Rgba {
            r: self.r,
            g: self.g,
            b: self.b,
            a: alpha.clamp(0.0, 1.0),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    /// Composites this color over an opaque background.
    pub fn blend_over(self, background: Rgb) -> Rgb {
        let mix = |fg: u8, bg: u8| -> u8 {
            let value = f64::from(fg) * self.a + f64::from(bg) * (1.0 - self.a);
            value.round().clamp(0.0, 255.0) as u8
        };
        Rgb {
            r: mix(self.r, background.r),
            g: mix(self.g, background.g),
            b: mix(self.b, background.b),
        }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

/// Same color as `color_hex` at opacity `alpha`.
///
/// Used to fade events drawn on week-fill days outside the visible month.
pub fn attenuate(color_hex: &str, alpha: f64) -> anyhow::Result<Rgba> {
    if alpha.is_nan() {
        return Err(anyhow!("alpha must be a number between 0 and 1"));
    }
    let rgb = Rgb::parse_hex(color_hex)?;
    Ok(rgb.with_alpha(alpha))
}
