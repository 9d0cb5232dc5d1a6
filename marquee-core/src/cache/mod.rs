//! Font and image cache
//!
//! Decoded fonts, icons and backgrounds are expensive to produce and large
//! relative to device RAM. [`ResourceCache`] keeps a bounded number of each,
//! evicting the least recently used entry when a slot is needed. Entries
//! pinned by an animation in flight are never evicted.

mod resource;

pub use resource::{CacheStats, ResourceCache};

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use marquee_protocol::{classify_icon, IconSource};

use crate::config::{name, ConfigError, Name};

/// Resource category; each has its own slot budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResourceKind {
    Font,
    Icon,
    Background,
}

/// Decoder-assigned asset identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AssetId(pub u32);

/// Why a resource could not be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadError {
    /// No asset with that name
    NotFound,
    /// Asset exists but could not be decoded
    Decode,
    /// Decoded asset does not fit in memory
    OutOfMemory,
    /// Every slot of this kind is pinned
    Exhausted,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::NotFound => f.write_str("not found"),
            LoadError::Decode => f.write_str("decode failed"),
            LoadError::OutOfMemory => f.write_str("out of memory"),
            LoadError::Exhausted => f.write_str("all slots pinned"),
        }
    }
}

/// A decoded resource as seen by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResourceHandle {
    pub kind: ResourceKind,
    pub asset: AssetId,
    /// Image width, or glyph advance for fonts
    pub width: u16,
    /// Image height, or line height for fonts
    pub height: u16,
}

/// Inline bitmap bytes shipped inside a message or setting
///
/// Cloning shares the bytes. Identity is the FNV-1a digest plus length.
#[derive(Clone)]
pub struct InlineBitmap {
    digest: u32,
    bytes: Rc<[u8]>,
}

impl InlineBitmap {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            digest: fnv1a(&bytes),
            bytes: Rc::from(bytes),
        }
    }

    pub fn digest(&self) -> u32 {
        self.digest
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl PartialEq for InlineBitmap {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest && self.bytes.len() == other.bytes.len()
    }
}

impl Eq for InlineBitmap {}

impl fmt::Debug for InlineBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InlineBitmap({:08x}, {} bytes)", self.digest, self.bytes.len())
    }
}

/// Where a resource comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSource {
    /// Stored asset, by name
    Named(Name),
    /// Bitmap carried in a payload
    Inline(InlineBitmap),
}

impl ResourceSource {
    pub fn named(value: &str) -> Result<Self, ConfigError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ConfigError::InvalidValue);
        }
        Ok(ResourceSource::Named(name(value)?))
    }

    /// Interpret an icon value: inline base64 BMP or stored image name
    pub fn icon(value: &str) -> Result<Self, ConfigError> {
        match classify_icon(value) {
            IconSource::Bitmap(bytes) => Ok(ResourceSource::Inline(InlineBitmap::new(bytes))),
            IconSource::Named(icon) => Self::named(icon),
        }
    }

    /// Short description for logs
    pub fn label(&self) -> &str {
        match self {
            ResourceSource::Named(name) => name.as_str(),
            ResourceSource::Inline(_) => "<inline>",
        }
    }
}

/// 32-bit FNV-1a
pub fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for &byte in bytes {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}
