//! Hex colour handling and WCAG contrast estimation.

use std::fmt;

/// WCAG AA ratio for normal text.
pub const AA_TEXT: f64 = 4.5;
/// Relaxed ratio applied to accent colours.
pub const AA_ACCENT: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb { r: 255, g: 255, b: 255 };

    /// Parses `#rgb` or `#rrggbb`, the leading `#` being optional.
    pub fn from_hex(input: &str) -> Option<Rgb> {
        let hex = input.trim().trim_start_matches('#');
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return None,
        };
        let channel = |i: usize| u8::from_str_radix(expanded.get(i..i + 2)?, 16).ok();
        Some(Rgb {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Gamma-corrected relative luminance in `[0, 1]`.
    pub fn luminance(self) -> f64 {
        fn linear(channel: u8) -> f64 {
            let c = f64::from(channel) / 255.0;
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        0.2126 * linear(self.r) + 0.7152 * linear(self.g) + 0.0722 * linear(self.b)
    }

    /// Adds `delta` to every channel, clamping to `[0, 255]`.
    pub fn shifted(self, delta: i16) -> Rgb {
        let shift = |c: u8| (i16::from(c) + delta).clamp(0, 255) as u8;
        Rgb {
            r: shift(self.r),
            g: shift(self.g),
            b: shift(self.b),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let (la, lb) = (a.luminance(), b.luminance());
    let (lighter, darker) = if la >= lb { (la, lb) } else { (lb, la) };
    (lighter + 0.05) / (darker + 0.05)
}

/// Contrast between two hex strings. Unparseable colours count as black.
pub fn estimate_contrast(a: &str, b: &str) -> f64 {
    contrast_ratio(
        Rgb::from_hex(a).unwrap_or(Rgb::BLACK),
        Rgb::from_hex(b).unwrap_or(Rgb::BLACK),
    )
}
