//! Asset decoding trait

use crate::cache::{AssetId, LoadError, ResourceKind, ResourceSource};

/// Result of decoding an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Decoded {
    /// Decoder-owned handle to the decoded pixels or glyphs
    pub asset: AssetId,
    /// Image width, or glyph advance for fonts
    pub width: u16,
    /// Image height, or line height for fonts
    pub height: u16,
}

/// Trait for the font and bitmap decoder
///
/// The decoder owns decoded assets; the resource cache decides how long they
/// live and hands them back through `release`.
pub trait ResourceDecoder {
    fn decode(&mut self, kind: ResourceKind, source: &ResourceSource) -> Result<Decoded, LoadError>;

    /// Free an asset the cache has evicted
    fn release(&mut self, asset: AssetId);
}
