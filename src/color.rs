/*!
 # Color parsing and conversion utilities

 All zone colors travel through the engine as 6-digit lowercase hex strings;
 this module converts between that canonical form, raw RGB triples and HSV.
*/

use crate::{Error, Result};

/// An RGB triple, one byte per channel
pub type Rgb = (u8, u8, u8);

/// Parses a user-supplied color token.
///
/// Accepted shapes:
/// * a 6-digit case-insensitive hex string (`"39c5bb"`)
/// * a comma-separated decimal triple (`"57, 197, 187"`), each component
///   clamped to 0-255; extra components beyond the third are ignored
///
/// A blank token is not an error: it returns `Ok(None)`, meaning "no color
/// supplied" (the frame encoder carries the previous zone's color forward).
pub fn parse(token: &str) -> Result<Option<Rgb>> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(None);
    }

    let lower = token.to_lowercase();
    if lower.len() == 6 && lower.bytes().all(|b| b.is_ascii_hexdigit()) {
        let r = u8::from_str_radix(&lower[0..2], 16).expect("checked hex");
        let g = u8::from_str_radix(&lower[2..4], 16).expect("checked hex");
        let b = u8::from_str_radix(&lower[4..6], 16).expect("checked hex");
        return Ok(Some((r, g, b)));
    }

    if lower.contains(',') {
        let components: Vec<&str> = lower.split(',').map(str::trim).collect();
        if components.len() < 3 || components.iter().any(|c| c.is_empty() || !c.bytes().all(|b| b.is_ascii_digit())) {
            return Err(Error::InvalidColorFormat(token.to_string()));
        }
        let mut channels = [0u8; 3];
        for (slot, component) in channels.iter_mut().zip(&components) {
            *slot = component.parse::<u32>().map(|v| v.min(255) as u8).unwrap_or(255);
        }
        return Ok(Some((channels[0], channels[1], channels[2])));
    }

    Err(Error::InvalidColorModel(token.to_string()))
}

/// Formats an RGB triple as a 6-digit lowercase hex string (no `#`)
pub fn to_hex((r, g, b): Rgb) -> String {
    format!("{:02x}{:02x}{:02x}", r, g, b)
}

/// Linear per-channel interpolation between two colors, integer-truncated
pub fn interpolate(c1: Rgb, c2: Rgb, t: f32) -> Rgb {
    let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t) as u8;
    (lerp(c1.0, c2.0), lerp(c1.1, c2.1), lerp(c1.2, c2.2))
}

/// Per-channel inversion (255 - value)
pub fn invert((r, g, b): Rgb) -> Rgb {
    (255 - r, 255 - g, 255 - b)
}

/// Scales each channel by `factor`, integer-truncated
pub fn dim((r, g, b): Rgb, factor: f32) -> Rgb {
    (
        (r as f32 * factor) as u8,
        (g as f32 * factor) as u8,
        (b as f32 * factor) as u8,
    )
}

/// Convert HSV to RGB
/// h: hue (0-360)
/// s: saturation (0-1)
/// v: value/brightness (0-1)
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    (
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}

/// Convert RGB to HSV, the inverse of [`hsv_to_rgb`]
pub fn rgb_to_hsv((r, g, b): Rgb) -> (f32, f32, f32) {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let s = if max == 0.0 { 0.0 } else { delta / max };

    (h, s, max)
}
