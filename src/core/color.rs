//! Colour parsing for cell and overlay styling
//!
//! cityIO ships colours either as hex strings (`"ff0000"`, `"#ff0000aa"`) or as
//! channel arrays (`[255, 0, 0]`). Everything ends up as a [`Color`] that
//! serializes back to the 3- or 4-channel array a painter expects.

use serde::Serialize;
use serde_json::Value;

/// An RGB or RGBA colour, 0-255 per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Color {
    Rgb([u8; 3]),
    Rgba([u8; 4]),
}

impl Color {
    /// Fallback for absent or unparseable colours
    pub const BLACK: Color = Color::Rgb([0, 0, 0]);

    /// Channels as a slice of length 3 or 4
    pub fn channels(&self) -> &[u8] {
        match self {
            Color::Rgb(c) => c,
            Color::Rgba(c) => c,
        }
    }

    /// Always four channels; RGB colours are fully opaque
    pub fn to_rgba(&self) -> [u8; 4] {
        match *self {
            Color::Rgb([r, g, b]) => [r, g, b, 255],
            Color::Rgba(c) => c,
        }
    }

    /// Channel-wise `255 - c` on the colour channels. Alpha is left alone so an
    /// inverted label stays as visible as the cell it sits on.
    pub fn inverted(&self) -> Color {
        match *self {
            Color::Rgb([r, g, b]) => Color::Rgb([255 - r, 255 - g, 255 - b]),
            Color::Rgba([r, g, b, a]) => Color::Rgba([255 - r, 255 - g, 255 - b, a]),
        }
    }

    /// Read a colour from a JSON property: hex string or 3/4 number array.
    pub fn from_json(value: &Value) -> Option<Color> {
        match value {
            Value::String(s) => parse_hex(s),
            Value::Array(items) => {
                let channels: Option<Vec<u8>> = items.iter().map(channel_from_json).collect();
                match channels?.as_slice() {
                    &[r, g, b] => Some(Color::Rgb([r, g, b])),
                    &[r, g, b, a] => Some(Color::Rgba([r, g, b, a])),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

fn channel_from_json(value: &Value) -> Option<u8> {
    let v = value.as_f64()?;
    if !v.is_finite() {
        return None;
    }
    Some(v.round().clamp(0.0, 255.0) as u8)
}

/// Parse a 6-digit (RGB) or 8-digit (RGBA) hex string, optional leading `#`.
pub fn parse_hex(hex: &str) -> Option<Color> {
    let hex = hex.trim().trim_start_matches('#');
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |i: usize| u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok();
    match hex.len() {
        6 => Some(Color::Rgb([channel(0)?, channel(1)?, channel(2)?])),
        8 => Some(Color::Rgba([channel(0)?, channel(1)?, channel(2)?, channel(3)?])),
        _ => None,
    }
}

/// Hex string to colour channels; absent or invalid input is black.
pub fn hex_to_rgba(hex: Option<&str>) -> Color {
    hex.and_then(parse_hex).unwrap_or(Color::BLACK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hex_rgb() {
        assert_eq!(hex_to_rgba(Some("ff0000")).channels(), &[255, 0, 0]);
    }

    #[test]
    fn test_hex_rgba() {
        assert_eq!(hex_to_rgba(Some("ff0000aa")).channels(), &[255, 0, 0, 170]);
        assert_eq!(hex_to_rgba(Some("#00FF0080")), Color::Rgba([0, 255, 0, 128]));
    }

    #[test]
    fn test_hex_fallback_black() {
        assert_eq!(hex_to_rgba(None), Color::BLACK);
        assert_eq!(hex_to_rgba(Some("")), Color::BLACK);
        assert_eq!(hex_to_rgba(Some("ff00")), Color::BLACK);
        assert_eq!(hex_to_rgba(Some("gg0000")), Color::BLACK);
        // multi-byte input must not panic on slicing
        assert_eq!(hex_to_rgba(Some("ffé000")), Color::BLACK);
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Color::from_json(&json!([10, 20, 30])), Some(Color::Rgb([10, 20, 30])));
        assert_eq!(
            Color::from_json(&json!([10, 20, 300, 1])),
            Some(Color::Rgba([10, 20, 255, 1]))
        );
        assert_eq!(Color::from_json(&json!("0a141e")), Some(Color::Rgb([10, 20, 30])));
        assert_eq!(Color::from_json(&json!([1, 2])), None);
        assert_eq!(Color::from_json(&json!(null)), None);
    }

    #[test]
    fn test_inverted_keeps_alpha() {
        assert_eq!(Color::Rgb([255, 0, 10]).inverted(), Color::Rgb([0, 255, 245]));
        assert_eq!(Color::Rgba([255, 0, 10, 99]).inverted(), Color::Rgba([0, 255, 245, 99]));
    }

    #[test]
    fn test_serializes_as_array() {
        let s = serde_json::to_string(&Color::Rgba([1, 2, 3, 4])).unwrap();
        assert_eq!(s, "[1,2,3,4]");
    }
}
