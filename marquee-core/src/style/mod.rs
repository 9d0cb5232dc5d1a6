//! Rendering style
//!
//! Style has two tiers. The global tier comes from the settings feed and
//! persists until changed. The override tier comes from the style elements of
//! a structured message and lasts only while that message plays. Each
//! attribute resolves independently: the override value where present, the
//! global value otherwise.
//!
//! Planning reads a snapshot ([`EffectiveStyle`]), so a settings update that
//! lands mid-message never alters frames already computed.

mod color;

pub use color::Color;

use crate::cache::ResourceSource;
use crate::config::{name, parse_bool, ConfigError, Name, SettingKey, StyleDefaults, MAX_FONTS};
use crate::message::{ElementKind, Message, Origin};

/// One tier of style attributes; `None` means "not set at this tier"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleLayer {
    pub font: Option<Name>,
    pub background: Option<ResourceSource>,
    pub icon: Option<ResourceSource>,
    pub color: Option<Color>,
    pub effect: Option<Name>,
}

impl StyleLayer {
    /// Collect the override tier of a message
    ///
    /// Plain-text messages never override anything. In structured messages
    /// the last element of each kind wins; values that cannot be represented
    /// are skipped.
    pub fn from_message(message: &Message) -> Self {
        let mut layer = Self::default();
        if message.origin == Origin::PlainText {
            return layer;
        }

        for element in &message.elements {
            let payload = element.payload.as_str();
            let applied = match element.kind {
                ElementKind::Font => name(payload).map(|n| layer.font = Some(n)),
                ElementKind::Background => {
                    ResourceSource::named(payload).map(|s| layer.background = Some(s))
                }
                ElementKind::Icon => ResourceSource::icon(payload).map(|s| layer.icon = Some(s)),
                ElementKind::Color => Color::parse(payload)
                    .map(|c| layer.color = Some(c))
                    .ok_or(ConfigError::InvalidColor),
                ElementKind::Effect => name(payload).map(|n| layer.effect = Some(n)),
                ElementKind::Text => Ok(()),
            };
            if let Err(e) = applied {
                warn!("Ignoring {} override in '{}': {}", element.kind, message.category_str(), e);
            }
        }
        layer
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// The persistent tier, driven by the settings feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalStyle {
    pub font: Name,
    /// Background while a message plays
    pub background: ResourceSource,
    /// Background between messages
    pub wallpaper: ResourceSource,
    pub icon: Option<ResourceSource>,
    pub color: Color,
    pub effect: Name,
    /// When false every background resolves to the screen-off image
    pub background_enabled: bool,
    pub screen_off: Name,
}

impl GlobalStyle {
    fn screen_off(&self) -> ResourceSource {
        ResourceSource::Named(self.screen_off.clone())
    }

    fn gate(&self, background: &ResourceSource) -> ResourceSource {
        if self.background_enabled {
            background.clone()
        } else {
            self.screen_off()
        }
    }
}

/// Global resources the renderer falls back to when an override fails to load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fallback {
    pub font: Name,
    pub background: ResourceSource,
    pub icon: Option<ResourceSource>,
    /// Color of text that precedes any color element
    pub color: Color,
}

/// Fully resolved style snapshot for one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveStyle {
    pub font: Name,
    pub background: ResourceSource,
    pub icon: Option<ResourceSource>,
    /// Last color element of the message, or the global color
    pub color: Color,
    pub effect: Name,
    pub fallback: Fallback,
}

/// Two-tier style state
#[derive(Debug, Clone)]
pub struct StyleState {
    global: GlobalStyle,
    fonts: heapless::Vec<Name, MAX_FONTS>,
    active: Option<StyleLayer>,
}

impl StyleState {
    /// Start from configured defaults; `fonts` is the set of loadable fonts
    pub fn new(defaults: &StyleDefaults, fonts: &[Name]) -> Self {
        let screen_off = ResourceSource::Named(defaults.screen_off.clone());
        Self {
            global: GlobalStyle {
                font: defaults.font.clone(),
                background: screen_off.clone(),
                wallpaper: screen_off,
                icon: None,
                color: Color::from_rgb24(defaults.color),
                effect: defaults.effect.clone(),
                background_enabled: true,
                screen_off: defaults.screen_off.clone(),
            },
            fonts: fonts.iter().take(MAX_FONTS).cloned().collect(),
            active: None,
        }
    }

    pub fn global(&self) -> &GlobalStyle {
        &self.global
    }

    /// Resolve the effective style of `message` without touching state
    pub fn merge(&self, message: &Message) -> EffectiveStyle {
        self.resolve(&StyleLayer::from_message(message))
    }

    /// Style currently on screen: the active message's override over global
    pub fn current(&self) -> EffectiveStyle {
        match &self.active {
            Some(layer) => self.resolve(layer),
            None => self.resolve(&StyleLayer::default()),
        }
    }

    /// Record the override tier of the message about to play
    pub fn begin_message(&mut self, message: &Message) {
        let layer = StyleLayer::from_message(message);
        self.active = (!layer.is_empty()).then_some(layer);
    }

    /// Drop the override tier once the message has finished
    pub fn end_message(&mut self) {
        self.active = None;
    }

    pub fn override_active(&self) -> bool {
        self.active.is_some()
    }

    /// Background to show between messages
    pub fn idle_background(&self) -> ResourceSource {
        self.global.gate(&self.global.wallpaper)
    }

    fn resolve(&self, layer: &StyleLayer) -> EffectiveStyle {
        let g = &self.global;
        let fallback = Fallback {
            font: g.font.clone(),
            background: g.gate(&g.background),
            icon: g.icon.clone(),
            color: g.color,
        };
        EffectiveStyle {
            font: layer.font.clone().unwrap_or_else(|| g.font.clone()),
            background: g.gate(layer.background.as_ref().unwrap_or(&g.background)),
            icon: layer.icon.clone().or_else(|| g.icon.clone()),
            color: layer.color.unwrap_or(g.color),
            effect: layer.effect.clone().unwrap_or_else(|| g.effect.clone()),
            fallback,
        }
    }

    /// Apply one settings feed value to the global tier
    ///
    /// On error the previous value is kept. `SystemOn` is not a style
    /// setting and is accepted without effect.
    pub fn apply_global_update(&mut self, key: SettingKey, value: &str) -> Result<(), ConfigError> {
        let g = &mut self.global;
        match key {
            SettingKey::Font => {
                let font = name(value.trim())?;
                if !self.fonts.iter().any(|f| *f == font) {
                    return Err(ConfigError::UnknownFont);
                }
                g.font = font;
            }
            SettingKey::Background => g.background = ResourceSource::named(value)?,
            SettingKey::Wallpaper => g.wallpaper = ResourceSource::named(value)?,
            SettingKey::Color => g.color = Color::parse(value).ok_or(ConfigError::InvalidColor)?,
            SettingKey::BackgroundOn => g.background_enabled = parse_bool(value)?,
            SettingKey::Icon => {
                g.icon = if value.trim().is_empty() {
                    None
                } else {
                    Some(ResourceSource::icon(value)?)
                };
            }
            SettingKey::SystemOn => {}
        }
        Ok(())
    }
}
