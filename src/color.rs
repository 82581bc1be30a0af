//! Hex ↔ RGB conversion and the swatch palette.

use image::Rgba;

use crate::error::{EditorError, Result};

pub const DEFAULT_SWATCHES: [&str; 5] = ["#000000", "#FFFFFF", "#FF0000", "#00FF00", "#0000FF"];

/// An opaque RGB triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Swatch(pub [u8; 3]);

impl Swatch {
    pub const BLACK: Swatch = Swatch([0, 0, 0]);
    pub const WHITE: Swatch = Swatch([255, 255, 255]);

    pub fn rgb(self) -> [u8; 3] {
        self.0
    }

    pub fn to_rgba(self, alpha: f32) -> Rgba<u8> {
        let a = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba([self.0[0], self.0[1], self.0[2], a])
    }

    pub fn to_hex(self) -> String {
        rgb2hex(self.0)
    }
}

impl std::str::FromStr for Swatch {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self> {
        hex2rgb(s).map(Swatch)
    }
}

/// Parse `RRGGBB` or `#RRGGBB` (either case).
pub fn hex2rgb(text: &str) -> Result<[u8; 3]> {
    let hex = text.strip_prefix('#').unwrap_or(text);
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(EditorError::InvalidColor(text.to_string()));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| EditorError::InvalidColor(text.to_string()))
    };
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

/// Uppercase `#RRGGBB`.
pub fn rgb2hex(rgb: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
}

/// Parse a list of hex colors, skipping entries that don't parse.
pub fn parse_palette<'a>(entries: impl IntoIterator<Item = &'a str>) -> Vec<Swatch> {
    entries
        .into_iter()
        .filter_map(|e| e.trim().parse::<Swatch>().ok())
        .collect()
}

pub fn default_palette() -> Vec<Swatch> {
    parse_palette(DEFAULT_SWATCHES)
}
