//! Configuration type definitions
//!
//! Configuration is written as `marquee.toml`, validated at build time and
//! embedded in the firmware as postcard-serialized binary data.

use heapless::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Maximum resource name length (fonts, images, effects)
pub const MAX_NAME_LEN: usize = 32;

/// Maximum label length (user, group and feed keys)
pub const MAX_LABEL_LEN: usize = 32;

/// Maximum feed service base URL length
pub const MAX_URL_LEN: usize = 96;

/// Maximum API key length
pub const MAX_KEY_LEN: usize = 64;

/// Maximum fonts in the font table
pub const MAX_FONTS: usize = 8;

/// Resource name
pub type Name = String<MAX_NAME_LEN>;

/// Copy `value` into a bounded name
pub fn name(value: &str) -> Result<Name, ConfigError> {
    let mut out = Name::new();
    out.push_str(value).map_err(|_| ConfigError::NameTooLong)?;
    Ok(out)
}

fn label<const N: usize>(value: &str) -> String<N> {
    let mut out = String::new();
    // Defaults are short literals
    let _ = out.push_str(value);
    out
}

/// LED panel geometry
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisplayConfig {
    /// Panel width in pixels
    pub width: u16,
    /// Panel height in pixels
    pub height: u16,
    /// Color depth per channel used by the refresh loop
    pub bit_depth: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 128,
            height: 32,
            bit_depth: 5,
        }
    }
}

/// Main loop timing
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingConfig {
    /// Seconds between feed polls
    pub poll_period_s: u16,
    /// Wait after a cycle that rendered a message
    pub busy_wait_ms: u32,
    /// Wait after a cycle with nothing to render
    pub idle_wait_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_period_s: 30,
            busy_wait_ms: 2_000,
            idle_wait_ms: 10_000,
        }
    }
}

/// Retry and session recovery for feed requests
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NetworkConfig {
    /// Per-request timeout
    pub http_timeout_ms: u16,
    /// Attempts per request before the cycle is skipped
    pub max_attempts: u8,
    /// First backoff delay; doubles per attempt
    pub backoff_base_ms: u32,
    /// Backoff ceiling
    pub backoff_cap_ms: u32,
    /// Consecutive session failures before the session is rebuilt
    pub session_rebuild_after: u8,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_timeout_ms: 10_000,
            max_attempts: 3,
            backoff_base_ms: 1_000,
            backoff_cap_ms: 8_000,
            session_rebuild_after: 2,
        }
    }
}

/// Feed service account and ingestion limits
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FeedConfig {
    pub base_url: String<MAX_URL_LEN>,
    pub username: String<MAX_LABEL_LEN>,
    /// Settings group key; also the prefix of every feed key
    pub group: String<MAX_LABEL_LEN>,
    pub text_feed: String<MAX_LABEL_LEN>,
    pub message_feed: String<MAX_LABEL_LEN>,
    /// New items admitted per queue per poll
    pub fetch_limit: u8,
    /// Items requested per data call
    pub page_size: u8,
    /// Older pages fetched per poll while walking back to the oldest item
    pub backlog_pages: u8,
    /// Capacity of each queue
    pub queue_capacity: u16,
    /// Delete items from the feed once admitted
    pub acknowledge: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: label("https://io.adafruit.com/api/v2"),
            username: String::new(),
            group: label("scroller"),
            text_feed: label("text-queue"),
            message_feed: label("message-queue"),
            fetch_limit: 5,
            page_size: 20,
            backlog_pages: 8,
            queue_capacity: 250,
            acknowledge: true,
        }
    }
}

/// Static credentials, consumed verbatim
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Credentials {
    pub api_key: String<MAX_KEY_LEN>,
}

/// Global style until the settings feed says otherwise
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StyleDefaults {
    pub font: Name,
    /// 0xRRGGBB
    pub color: u32,
    pub effect: Name,
    /// Image shown whenever backgrounds are switched off, and at boot
    pub screen_off: Name,
}

impl Default for StyleDefaults {
    fn default() -> Self {
        Self {
            font: label("lemon"),
            color: 0xFF_FF_FF,
            effect: label("left2right"),
            screen_off: label("ledbg00"),
        }
    }
}

/// Resource cache slot budgets
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CacheConfig {
    pub font_slots: u8,
    pub icon_slots: u8,
    pub background_slots: u8,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            font_slots: 4,
            icon_slots: 4,
            background_slots: 2,
        }
    }
}

/// Effect timing
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnimationConfig {
    /// Horizontal scroll speed
    pub scroll_speed_px_s: u16,
    /// Duration of one vertical scroll
    pub vertical_scroll_ms: u32,
    /// Pause between entry and exit of vertical sequences
    pub vertical_hold_ms: u32,
    /// Visibility cycles for flash and blink
    pub flash_count: u8,
    /// Total duration of flash and blink
    pub flash_ms: u32,
    /// Opacity steps each way for fade
    pub fade_steps: u8,
    /// Total duration of fade in plus fade out
    pub fade_ms: u32,
    /// How long a static or entry-only message stays up
    pub static_hold_ms: u32,
    /// Frame budget per primitive; long scrolls widen their stride instead
    pub max_frames_per_primitive: u16,
    /// Gap after an icon
    pub icon_gap_px: u8,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            scroll_speed_px_s: 64,
            vertical_scroll_ms: 2_000,
            vertical_hold_ms: 2_000,
            flash_count: 3,
            flash_ms: 1_500,
            fade_steps: 16,
            fade_ms: 3_000,
            static_hold_ms: 3_000,
            max_frames_per_primitive: 256,
            icon_gap_px: 2,
        }
    }
}

/// Complete device configuration
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MarqueeConfig {
    pub display: DisplayConfig,
    pub timing: TimingConfig,
    pub network: NetworkConfig,
    pub feeds: FeedConfig,
    pub credentials: Credentials,
    pub style: StyleDefaults,
    pub cache: CacheConfig,
    pub animation: AnimationConfig,
    /// Fonts the device can load by name
    pub fonts: heapless::Vec<Name, MAX_FONTS>,
}

impl Default for MarqueeConfig {
    fn default() -> Self {
        let mut fonts = heapless::Vec::new();
        for font in ["bmilk", "comic8", "coolv", "handv", "lemon", "showcard"] {
            let _ = fonts.push(label(font));
        }
        Self {
            display: DisplayConfig::default(),
            timing: TimingConfig::default(),
            network: NetworkConfig::default(),
            feeds: FeedConfig::default(),
            credentials: Credentials::default(),
            style: StyleDefaults::default(),
            cache: CacheConfig::default(),
            animation: AnimationConfig::default(),
            fonts,
        }
    }
}

impl MarqueeConfig {
    /// Check ranges and cross-references
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.display;
        if d.width == 0 || d.height == 0 || d.width > 512 || d.height > 512 {
            return Err(ConfigError::OutOfRange("display"));
        }
        if !(1..=8).contains(&d.bit_depth) {
            return Err(ConfigError::OutOfRange("display.bit_depth"));
        }
        if self.timing.poll_period_s == 0 {
            return Err(ConfigError::OutOfRange("timing.poll_period_s"));
        }

        let n = &self.network;
        if n.max_attempts == 0 || n.http_timeout_ms == 0 {
            return Err(ConfigError::OutOfRange("network"));
        }
        if n.backoff_base_ms > n.backoff_cap_ms {
            return Err(ConfigError::OutOfRange("network.backoff_base_ms"));
        }

        let f = &self.feeds;
        if f.fetch_limit == 0 || f.page_size < f.fetch_limit {
            return Err(ConfigError::OutOfRange("feeds.fetch_limit"));
        }
        if f.backlog_pages == 0 {
            return Err(ConfigError::OutOfRange("feeds.backlog_pages"));
        }
        if (f.queue_capacity as usize) < f.fetch_limit as usize {
            return Err(ConfigError::OutOfRange("feeds.queue_capacity"));
        }
        if f.base_url.is_empty() || f.group.is_empty() {
            return Err(ConfigError::InvalidValue);
        }

        let c = &self.cache;
        if c.font_slots == 0 || c.icon_slots == 0 || c.background_slots == 0 {
            return Err(ConfigError::OutOfRange("cache"));
        }

        let a = &self.animation;
        if a.scroll_speed_px_s == 0
            || a.max_frames_per_primitive == 0
            || a.flash_count == 0
            || a.fade_steps == 0
        {
            return Err(ConfigError::OutOfRange("animation"));
        }

        if self.style.color > 0xFF_FF_FF {
            return Err(ConfigError::InvalidColor);
        }
        if !self.fonts.iter().any(|f| *f == self.style.font) {
            return Err(ConfigError::UnknownFont);
        }
        Ok(())
    }

    /// Whether `font` is in the font table
    pub fn has_font(&self, font: &str) -> bool {
        self.fonts.iter().any(|f| f.as_str() == font)
    }
}

#[cfg(feature = "serde")]
impl MarqueeConfig {
    /// Decode and validate an embedded configuration blob
    pub fn from_blob(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupt)?;
        config.validate()?;
        Ok(config)
    }

    /// Encode this configuration as a postcard blob
    pub fn to_blob(&self) -> Result<alloc::vec::Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(|_| ConfigError::Corrupt)
    }
}
