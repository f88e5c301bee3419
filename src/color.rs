//! RGBA color values and hex parsing/formatting
//!
//! Colors are 8-bit-per-channel RGBA. The textual form used in persisted
//! artifacts is lowercase `#rrggbbaa`; `#rgb`, `#rgba` and `#rrggbb` are
//! accepted on input with the usual digit-doubling and opaque-alpha rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error type for color parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    /// Input string was empty
    #[error("empty color string")]
    Empty,
    /// Input string doesn't start with '#'
    #[error("color must start with '#'")]
    MissingHash,
    /// Invalid length (must be 3, 4, 6, or 8 hex chars after #)
    #[error("invalid color length {0}, expected 3, 4, 6, or 8")]
    InvalidLength(usize),
    /// Contains non-hex characters
    #[error("invalid hex character '{0}'")]
    InvalidHex(char),
}

/// An 8-bit-per-channel RGBA color. Equality is exact channel-wise equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Fully transparent black, the conventional palette entry at index 0.
pub const TRANSPARENT: Color = Color {
    r: 0,
    g: 0,
    b: 0,
    a: 0,
};

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from RGB channels.
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Parse a hex color string (`#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`).
    pub fn parse(s: &str) -> Result<Self, ColorError> {
        if s.is_empty() {
            return Err(ColorError::Empty);
        }
        let hex = s.strip_prefix('#').ok_or(ColorError::MissingHash)?;
        let len = hex.len();

        match len {
            3 => {
                // #rgb -> #rrggbb (doubled digits), alpha = 255
                let mut chars = hex.chars();
                let r = parse_hex_digit(chars.next().ok_or(ColorError::InvalidLength(len))?)? * 17;
                let g = parse_hex_digit(chars.next().ok_or(ColorError::InvalidLength(len))?)? * 17;
                let b = parse_hex_digit(chars.next().ok_or(ColorError::InvalidLength(len))?)? * 17;
                Ok(Color::new(r, g, b, 255))
            }
            4 => {
                // #rgba -> #rrggbbaa (doubled digits)
                let mut chars = hex.chars();
                let r = parse_hex_digit(chars.next().ok_or(ColorError::InvalidLength(len))?)? * 17;
                let g = parse_hex_digit(chars.next().ok_or(ColorError::InvalidLength(len))?)? * 17;
                let b = parse_hex_digit(chars.next().ok_or(ColorError::InvalidLength(len))?)? * 17;
                let a = parse_hex_digit(chars.next().ok_or(ColorError::InvalidLength(len))?)? * 17;
                Ok(Color::new(r, g, b, a))
            }
            6 => {
                // #rrggbb, alpha = 255
                let r = parse_hex_pair(&hex[0..2])?;
                let g = parse_hex_pair(&hex[2..4])?;
                let b = parse_hex_pair(&hex[4..6])?;
                Ok(Color::new(r, g, b, 255))
            }
            8 => {
                // #rrggbbaa
                let r = parse_hex_pair(&hex[0..2])?;
                let g = parse_hex_pair(&hex[2..4])?;
                let b = parse_hex_pair(&hex[4..6])?;
                let a = parse_hex_pair(&hex[6..8])?;
                Ok(Color::new(r, g, b, a))
            }
            _ => Err(ColorError::InvalidLength(len)),
        }
    }

    /// Render in the fixed textual form used by persisted artifacts.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_hex()
    }
}

impl TryFrom<String> for Color {
    type Error = ColorError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Color::parse(&s)
    }
}

impl From<image::Rgba<u8>> for Color {
    fn from(p: image::Rgba<u8>) -> Self {
        Color::new(p.0[0], p.0[1], p.0[2], p.0[3])
    }
}

impl From<Color> for image::Rgba<u8> {
    fn from(c: Color) -> Self {
        image::Rgba([c.r, c.g, c.b, c.a])
    }
}

/// Parse a single hex digit (0-9, A-F, a-f) to u8 (0-15)
fn parse_hex_digit(c: char) -> Result<u8, ColorError> {
    match c {
        '0'..='9' => Ok(c as u8 - b'0'),
        'a'..='f' => Ok(c as u8 - b'a' + 10),
        'A'..='F' => Ok(c as u8 - b'A' + 10),
        _ => Err(ColorError::InvalidHex(c)),
    }
}

/// Parse a two-character hex string to u8 (0-255)
fn parse_hex_pair(s: &str) -> Result<u8, ColorError> {
    let mut chars = s.chars();
    let high = parse_hex_digit(chars.next().ok_or(ColorError::Empty)?)?;
    let low = parse_hex_digit(chars.next().ok_or(ColorError::Empty)?)?;
    Ok(high * 16 + low)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_hex() {
        assert_eq!(Color::parse("#f00").unwrap(), Color::opaque(255, 0, 0));
        assert_eq!(Color::parse("#f00f").unwrap(), Color::opaque(255, 0, 0));
        assert_eq!(Color::parse("#0000").unwrap(), TRANSPARENT);
    }

    #[test]
    fn test_parse_long_hex() {
        assert_eq!(Color::parse("#ff8000").unwrap(), Color::opaque(255, 128, 0));
        assert_eq!(
            Color::parse("#FF800080").unwrap(),
            Color::new(255, 128, 0, 128)
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Color::parse(""), Err(ColorError::Empty));
        assert_eq!(Color::parse("ff0000"), Err(ColorError::MissingHash));
        assert_eq!(Color::parse("#ff00f"), Err(ColorError::InvalidLength(5)));
        assert_eq!(Color::parse("#gg0000"), Err(ColorError::InvalidHex('g')));
    }

    #[test]
    fn test_hex_roundtrip() {
        let c = Color::new(18, 52, 86, 120);
        assert_eq!(c.to_hex(), "#12345678");
        assert_eq!(Color::parse(&c.to_hex()).unwrap(), c);
    }

    #[test]
    fn test_serde_as_hex_string() {
        let json = serde_json::to_string(&Color::opaque(255, 0, 0)).unwrap();
        assert_eq!(json, r##""#ff0000ff""##);
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::opaque(255, 0, 0));
    }

    #[test]
    fn test_transparency() {
        assert!(TRANSPARENT.is_transparent());
        assert!(Color::new(10, 20, 30, 0).is_transparent());
        assert!(!Color::opaque(0, 0, 0).is_transparent());
    }
}
