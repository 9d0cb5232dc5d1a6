//! Settings feed keys
//!
//! Every feed in the settings group is keyed `<group>.<setting>`, e.g.
//! `scroller.font`. Keys outside the known set are ignored.

use super::ConfigError;

/// A setting the device understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingKey {
    /// Global font name
    Font,
    /// Background image while a message plays
    Background,
    /// Background image between messages
    Wallpaper,
    /// Global text color
    Color,
    /// Background images on/off
    BackgroundOn,
    /// Global icon: image name or inline base64 BMP
    Icon,
    /// Rendering on/off
    SystemOn,
}

impl SettingKey {
    /// Resolve a feed key, with or without its group prefix
    pub fn parse(group: &str, key: &str) -> Option<Self> {
        let setting = key
            .strip_prefix(group)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(key);
        match setting {
            "font" => Some(SettingKey::Font),
            "background" => Some(SettingKey::Background),
            "wallpaper" => Some(SettingKey::Wallpaper),
            "color" => Some(SettingKey::Color),
            "background-on" => Some(SettingKey::BackgroundOn),
            "icon" => Some(SettingKey::Icon),
            "system-on" => Some(SettingKey::SystemOn),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::Font => "font",
            SettingKey::Background => "background",
            SettingKey::Wallpaper => "wallpaper",
            SettingKey::Color => "color",
            SettingKey::BackgroundOn => "background-on",
            SettingKey::Icon => "icon",
            SettingKey::SystemOn => "system-on",
        }
    }
}

/// Parse a switch value
pub fn parse_bool(value: &str) -> Result<bool, ConfigError> {
    let value = value.trim();
    for on in ["true", "1", "on", "yes"] {
        if value.eq_ignore_ascii_case(on) {
            return Ok(true);
        }
    }
    for off in ["false", "0", "off", "no"] {
        if value.eq_ignore_ascii_case(off) {
            return Ok(false);
        }
    }
    Err(ConfigError::InvalidBool)
}
