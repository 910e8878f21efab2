//! Byte layouts shared with the guest
//!
//! Linear memory is little-endian regardless of the host.
//!
//! | Record          | Size | Fields                                      |
//! |-----------------|------|---------------------------------------------|
//! | `GlyphInfo`     | 8    | glyph_id u32, cluster u32                   |
//! | `GlyphPosition` | 16   | x_advance, y_advance, x_offset, y_offset i32 |
//! | `Feature`       | 16   | tag u32, value u32, start u32, end u32      |
//! | `Variation`     | 8    | tag u32, value f32                          |

use glyphrun_core::{Feature, GlyphInfo, GlyphPosition, GlyphrunError, Result, Variation};

pub const GLYPH_INFO_SIZE: usize = 8;
pub const GLYPH_POSITION_SIZE: usize = 16;
pub const FEATURE_SIZE: usize = 16;
pub const VARIATION_SIZE: usize = 8;

/// Guest status codes; anything negative is an error
pub const STATUS_OK: i32 = 0;
pub const STATUS_NULL_POINTER: i32 = -1;
pub const STATUS_INVALID_ARGUMENT: i32 = -2;

/// Maps a guest status to a result
pub fn check_status(status: i32, call: &str) -> Result<i32> {
    match status {
        s if s >= STATUS_OK => Ok(s),
        STATUS_NULL_POINTER => Err(GlyphrunError::InvalidState(format!(
            "{call}: guest saw a null handle"
        ))),
        STATUS_INVALID_ARGUMENT => Err(GlyphrunError::InvalidArgument(format!(
            "{call}: guest rejected the argument"
        ))),
        other => Err(GlyphrunError::Sandbox(format!(
            "{call}: unexpected guest status {other}"
        ))),
    }
}

fn u32_at(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn i32_at(bytes: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn check_len(bytes: &[u8], record: usize, what: &str) -> Result<()> {
    if bytes.len() % record == 0 {
        Ok(())
    } else {
        Err(GlyphrunError::Sandbox(format!(
            "{} bytes is not a whole number of {what} records",
            bytes.len()
        )))
    }
}

pub fn encode_utf16(units: &[u16]) -> Vec<u8> {
    units.iter().flat_map(|u| u.to_le_bytes()).collect()
}

pub fn encode_features(features: &[Feature]) -> Vec<u8> {
    let mut out = Vec::with_capacity(features.len() * FEATURE_SIZE);
    for feature in features {
        out.extend_from_slice(&feature.tag.to_u32().to_le_bytes());
        out.extend_from_slice(&feature.value.to_le_bytes());
        out.extend_from_slice(&feature.start.to_le_bytes());
        out.extend_from_slice(&feature.end.to_le_bytes());
    }
    out
}

pub fn encode_variations(variations: &[Variation]) -> Vec<u8> {
    let mut out = Vec::with_capacity(variations.len() * VARIATION_SIZE);
    for variation in variations {
        out.extend_from_slice(&variation.tag.to_u32().to_le_bytes());
        out.extend_from_slice(&variation.value.to_le_bytes());
    }
    out
}

pub fn decode_infos(bytes: &[u8]) -> Result<Vec<GlyphInfo>> {
    check_len(bytes, GLYPH_INFO_SIZE, "glyph info")?;
    Ok(bytes
        .chunks_exact(GLYPH_INFO_SIZE)
        .map(|rec| GlyphInfo {
            glyph_id: u32_at(rec, 0),
            cluster: u32_at(rec, 4),
        })
        .collect())
}

pub fn decode_positions(bytes: &[u8]) -> Result<Vec<GlyphPosition>> {
    check_len(bytes, GLYPH_POSITION_SIZE, "glyph position")?;
    Ok(bytes
        .chunks_exact(GLYPH_POSITION_SIZE)
        .map(|rec| GlyphPosition {
            x_advance: i32_at(rec, 0),
            y_advance: i32_at(rec, 4),
            x_offset: i32_at(rec, 8),
            y_offset: i32_at(rec, 12),
        })
        .collect())
}
