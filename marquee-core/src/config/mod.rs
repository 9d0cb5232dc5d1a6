//! Device configuration
//!
//! Static configuration (`MarqueeConfig`) is fixed at build time. Runtime
//! settings arrive through the settings feed and are parsed by [`settings`].

mod settings;
mod types;

pub use settings::{parse_bool, SettingKey};
pub use types::*;

use core::fmt;

/// Configuration and settings errors
///
/// A settings update that fails leaves the previous value in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Value is empty or structurally wrong
    InvalidValue,
    /// Color is not `#RRGGBB`, `RRGGBB` or `0xRRGGBB`
    InvalidColor,
    /// Switch value is not a recognised boolean
    InvalidBool,
    /// Name exceeds `MAX_NAME_LEN`
    NameTooLong,
    /// Font is not in the font table
    UnknownFont,
    /// Numeric field outside its allowed range
    OutOfRange(&'static str),
    /// Embedded configuration blob failed to decode
    Corrupt,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue => f.write_str("invalid value"),
            ConfigError::InvalidColor => f.write_str("invalid color"),
            ConfigError::InvalidBool => f.write_str("invalid boolean"),
            ConfigError::NameTooLong => f.write_str("name too long"),
            ConfigError::UnknownFont => f.write_str("unknown font"),
            ConfigError::OutOfRange(field) => write!(f, "{} out of range", field),
            ConfigError::Corrupt => f.write_str("corrupt configuration blob"),
        }
    }
}
