//! 24-bit RGB color

use core::fmt::Write;

/// An RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::from_rgb24(0xFF_FF_FF);
    pub const BLACK: Color = Color::from_rgb24(0);

    pub const fn from_rgb24(rgb: u32) -> Self {
        Self {
            r: (rgb >> 16) as u8,
            g: (rgb >> 8) as u8,
            b: rgb as u8,
        }
    }

    pub const fn to_rgb24(self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    /// Parse `#RRGGBB`, `RRGGBB` or `0xRRGGBB`
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let digits = value
            .strip_prefix('#')
            .or_else(|| value.strip_prefix("0x"))
            .or_else(|| value.strip_prefix("0X"))
            .unwrap_or(value);
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(digits, 16).ok().map(Self::from_rgb24)
    }

    /// Canonical `#RRGGBB` form
    pub fn hex(self) -> heapless::String<7> {
        let mut out = heapless::String::new();
        // Exactly 7 characters
        let _ = write!(out, "#{:06X}", self.to_rgb24());
        out
    }

    /// Scale toward black by `opacity` / 255
    pub fn scale(self, opacity: u8) -> Self {
        let s = |c: u8| ((c as u16 * opacity as u16 + 127) / 255) as u8;
        Self {
            r: s(self.r),
            g: s(self.g),
            b: s(self.b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        let orange = Color::from_rgb24(0xFF8800);
        assert_eq!(Color::parse("#FF8800"), Some(orange));
        assert_eq!(Color::parse("ff8800"), Some(orange));
        assert_eq!(Color::parse("0xff8800"), Some(orange));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(Color::parse("#FFF"), None);
        assert_eq!(Color::parse("red"), None);
        assert_eq!(Color::parse("#+12345"), None);
        assert_eq!(Color::parse(""), None);
    }

    #[test]
    fn test_hex_is_canonical() {
        assert_eq!(Color::parse("#00ff0a").unwrap().hex().as_str(), "#00FF0A");
    }

    #[test]
    fn test_scale() {
        assert_eq!(Color::WHITE.scale(255), Color::WHITE);
        assert_eq!(Color::WHITE.scale(0), Color::BLACK);
        assert_eq!(Color::from_rgb24(0xFF0000).scale(128).r, 128);
    }
}
