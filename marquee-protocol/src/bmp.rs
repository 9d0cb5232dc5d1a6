//! Minimal BMP decoder
//!
//! Stored images and inline icons are uncompressed Windows bitmaps. Indexed
//! (1, 4 and 8 bpp) and true-color (24 and 32 bpp) files are supported, with
//! either the 12-byte core header or a 40-byte-or-larger info header. Rows
//! may be stored bottom-up or top-down.

use alloc::vec::Vec;
use core::fmt;

use crate::icon::BMP_SIGNATURE;

/// Largest image accepted, in pixels
pub const MAX_PIXELS: usize = 256 * 64;

const FILE_HEADER_LEN: usize = 14;
const CORE_HEADER_LEN: usize = 12;
const INFO_HEADER_LEN: usize = 40;

/// BMP decoding failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BmpError {
    /// Missing `BM` signature or header too short
    NotBmp,
    /// Compression or bit depth not handled
    Unsupported,
    /// Pixel data or palette runs past the end of the file
    Truncated,
    /// Zero-sized or larger than `MAX_PIXELS`
    BadSize,
}

impl fmt::Display for BmpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BmpError::NotBmp => f.write_str("not a BMP file"),
            BmpError::Unsupported => f.write_str("unsupported BMP format"),
            BmpError::Truncated => f.write_str("truncated BMP file"),
            BmpError::BadSize => f.write_str("bad image size"),
        }
    }
}

/// Decoded image, rows top to bottom, `[r, g, b]` per pixel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u16,
    pub height: u16,
    pub pixels: Vec<[u8; 3]>,
}

impl Bitmap {
    pub fn pixel(&self, x: u16, y: u16) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

struct Header {
    data_offset: usize,
    width: usize,
    height: usize,
    top_down: bool,
    bpp: u16,
    palette_offset: usize,
    palette_entry: usize,
    palette_len: usize,
}

fn u16_at(bytes: &[u8], at: usize) -> Result<u16, BmpError> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(BmpError::NotBmp)
}

fn u32_at(bytes: &[u8], at: usize) -> Result<u32, BmpError> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(BmpError::NotBmp)
}

fn parse_header(bytes: &[u8]) -> Result<Header, BmpError> {
    if !bytes.starts_with(BMP_SIGNATURE) {
        return Err(BmpError::NotBmp);
    }
    let data_offset = u32_at(bytes, 10)? as usize;
    let dib_len = u32_at(bytes, FILE_HEADER_LEN)? as usize;

    let (width, height, top_down, bpp, palette_entry, colors_used) = match dib_len {
        CORE_HEADER_LEN => {
            let w = u16_at(bytes, 18)? as usize;
            let h = u16_at(bytes, 20)? as usize;
            (w, h, false, u16_at(bytes, 24)?, 3, 0)
        }
        n if n >= INFO_HEADER_LEN => {
            let w = u32_at(bytes, 18)? as i32;
            let h = u32_at(bytes, 22)? as i32;
            if w <= 0 || h == 0 {
                return Err(BmpError::BadSize);
            }
            if u32_at(bytes, 30)? != 0 {
                return Err(BmpError::Unsupported);
            }
            let colors_used = u32_at(bytes, 46)? as usize;
            (w as usize, h.unsigned_abs() as usize, h < 0, u16_at(bytes, 28)?, 4, colors_used)
        }
        _ => return Err(BmpError::Unsupported),
    };

    if width == 0 || height == 0 || width * height > MAX_PIXELS {
        return Err(BmpError::BadSize);
    }

    let palette_len = match bpp {
        1 | 4 | 8 if colors_used == 0 => 1 << bpp,
        1 | 4 | 8 => colors_used.min(1 << bpp),
        24 | 32 => 0,
        _ => return Err(BmpError::Unsupported),
    };

    Ok(Header {
        data_offset,
        width,
        height,
        top_down,
        bpp,
        palette_offset: FILE_HEADER_LEN + dib_len,
        palette_entry,
        palette_len,
    })
}

/// Decode a complete BMP file
pub fn decode_bmp(bytes: &[u8]) -> Result<Bitmap, BmpError> {
    let h = parse_header(bytes)?;

    let palette: Vec<[u8; 3]> = (0..h.palette_len)
        .map(|i| {
            let at = h.palette_offset + i * h.palette_entry;
            bytes
                .get(at..at + 3)
                .map(|bgr| [bgr[2], bgr[1], bgr[0]])
                .ok_or(BmpError::Truncated)
        })
        .collect::<Result<_, _>>()?;

    let bpp = h.bpp as usize;
    let stride = (h.width * bpp).div_ceil(32) * 4;
    let end = h.data_offset + stride * h.height;
    if end > bytes.len() {
        return Err(BmpError::Truncated);
    }

    let mut pixels = Vec::with_capacity(h.width * h.height);
    for y in 0..h.height {
        let stored = if h.top_down { y } else { h.height - 1 - y };
        let row = &bytes[h.data_offset + stored * stride..][..stride];
        for x in 0..h.width {
            let rgb = match bpp {
                24 | 32 => {
                    let p = &row[x * bpp / 8..];
                    [p[2], p[1], p[0]]
                }
                _ => {
                    let bit = x * bpp;
                    let shift = 8 - bpp - bit % 8;
                    let index = (row[bit / 8] >> shift) as usize & ((1 << bpp) - 1);
                    // Out-of-palette indices render black
                    palette.get(index).copied().unwrap_or([0, 0, 0])
                }
            };
            pixels.push(rgb);
        }
    }

    Ok(Bitmap {
        width: h.width as u16,
        height: h.height as u16,
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    /// Build a BMP with a 40-byte info header
    fn bmp(width: i32, height: i32, bpp: u16, palette: &[[u8; 3]], rows: &[&[u8]]) -> Vec<u8> {
        let data_offset = 14 + 40 + palette.len() * 4;
        let mut out = vec![0u8; data_offset];
        out[..2].copy_from_slice(b"BM");
        out[10..14].copy_from_slice(&(data_offset as u32).to_le_bytes());
        out[14..18].copy_from_slice(&40u32.to_le_bytes());
        out[18..22].copy_from_slice(&width.to_le_bytes());
        out[22..26].copy_from_slice(&height.to_le_bytes());
        out[26..28].copy_from_slice(&1u16.to_le_bytes());
        out[28..30].copy_from_slice(&bpp.to_le_bytes());
        out[46..50].copy_from_slice(&(palette.len() as u32).to_le_bytes());
        for (i, [r, g, b]) in palette.iter().enumerate() {
            let at = 54 + i * 4;
            out[at..at + 3].copy_from_slice(&[*b, *g, *r]);
        }
        for row in rows {
            out.extend_from_slice(row);
        }
        let len = out.len() as u32;
        out[2..6].copy_from_slice(&len.to_le_bytes());
        out
    }

    #[test]
    fn test_24bit_bottom_up() {
        // Stored bottom row first; each row padded to 4 bytes
        let file = bmp(
            1,
            2,
            24,
            &[],
            &[&[0x00, 0x00, 0xFF, 0], &[0xFF, 0x00, 0x00, 0]],
        );
        let image = decode_bmp(&file).unwrap();
        assert_eq!((image.width, image.height), (1, 2));
        assert_eq!(image.pixel(0, 0), Some([0x00, 0x00, 0xFF]));
        assert_eq!(image.pixel(0, 1), Some([0xFF, 0x00, 0x00]));
    }

    #[test]
    fn test_top_down_rows() {
        let file = bmp(1, -2, 24, &[], &[&[0x00, 0x00, 0xFF, 0], &[0xFF, 0x00, 0x00, 0]]);
        let image = decode_bmp(&file).unwrap();
        assert_eq!(image.pixel(0, 0), Some([0xFF, 0x00, 0x00]));
    }

    #[test]
    fn test_1bit_palette() {
        let palette = [[0, 0, 0], [0, 255, 0]];
        // 0b1010_0000: pixels 0 and 2 set
        let file = bmp(3, 1, 1, &palette, &[&[0b1010_0000, 0, 0, 0]]);
        let image = decode_bmp(&file).unwrap();
        assert_eq!(image.pixel(0, 0), Some([0, 255, 0]));
        assert_eq!(image.pixel(1, 0), Some([0, 0, 0]));
        assert_eq!(image.pixel(2, 0), Some([0, 255, 0]));
        assert_eq!(image.pixel(3, 0), None);
    }

    #[test]
    fn test_8bit_index_past_palette_is_black() {
        let file = bmp(2, 1, 8, &[[9, 9, 9]], &[&[0, 7, 0, 0]]);
        let image = decode_bmp(&file).unwrap();
        assert_eq!(image.pixel(0, 0), Some([9, 9, 9]));
        assert_eq!(image.pixel(1, 0), Some([0, 0, 0]));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(decode_bmp(b"PNG not bmp"), Err(BmpError::NotBmp));

        let mut file = bmp(4, 4, 24, &[], &[&[0; 12]]);
        assert_eq!(decode_bmp(&file), Err(BmpError::Truncated));

        file[30] = 1; // RLE
        assert_eq!(decode_bmp(&file), Err(BmpError::Unsupported));

        let huge = bmp(1024, 1024, 24, &[], &[]);
        assert_eq!(decode_bmp(&huge), Err(BmpError::BadSize));
    }
}
