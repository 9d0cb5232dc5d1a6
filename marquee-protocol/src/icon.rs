//! Icon payload classification
//!
//! An icon value is either the name of an image stored on the device or an
//! inline base64-encoded BMP. The two are told apart by decodability: the
//! value is inline only if it decodes as base64 to something that starts with
//! a BMP signature.

use alloc::string::String;
use alloc::vec::Vec;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// BMP file signature
pub const BMP_SIGNATURE: &[u8; 2] = b"BM";

/// Smallest plausible BMP: 14-byte file header plus 12-byte core header
pub const MIN_BITMAP_LEN: usize = 26;

/// Where an icon's pixels come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconSource<'a> {
    /// Image stored on the device under this name
    Named(&'a str),
    /// Decoded BMP file bytes
    Bitmap(Vec<u8>),
}

/// Classify an icon value
pub fn classify_icon(data: &str) -> IconSource<'_> {
    let data = data.trim();
    match decode_bitmap(data) {
        Some(bytes) => IconSource::Bitmap(bytes),
        None => IconSource::Named(data),
    }
}

/// Decode an inline BMP blob, tolerating embedded whitespace and missing padding
pub fn decode_bitmap(data: &str) -> Option<Vec<u8>> {
    let mut compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    match compact.len() % 4 {
        0 => {}
        1 => return None,
        n => compact.extend(core::iter::repeat('=').take(4 - n)),
    }

    let bytes = STANDARD.decode(compact.as_bytes()).ok()?;
    if bytes.len() >= MIN_BITMAP_LEN && bytes.starts_with(BMP_SIGNATURE) {
        Some(bytes)
    } else {
        None
    }
}
