//! Shaped output from the native engine

use harfrust::GlyphBuffer;

use glyphrun_core::{GlyphInfo, GlyphPosition};

use crate::buffer::NativeBuffer;

/// harfrust's `GlyphBuffer` with its glyphs copied into boundary layouts
///
/// The copies give callers stable `#[repr(C)]` arrays to point at; the inner
/// buffer is kept so its storage can be recycled.
pub struct NativeGlyphs {
    inner: GlyphBuffer,
    infos: Vec<GlyphInfo>,
    positions: Vec<GlyphPosition>,
}

impl NativeGlyphs {
    pub(crate) fn new(inner: GlyphBuffer) -> Self {
        let infos = inner
            .glyph_infos()
            .iter()
            .map(|info| GlyphInfo {
                glyph_id: info.glyph_id,
                cluster: info.cluster,
            })
            .collect();

        let positions = inner
            .glyph_positions()
            .iter()
            .map(|pos| GlyphPosition {
                x_advance: pos.x_advance,
                y_advance: pos.y_advance,
                x_offset: pos.x_offset,
                y_offset: pos.y_offset,
            })
            .collect();

        Self {
            inner,
            infos,
            positions,
        }
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn infos(&self) -> &[GlyphInfo] {
        &self.infos
    }

    pub fn positions(&self) -> &[GlyphPosition] {
        &self.positions
    }

    /// Clears the glyphs and hands back an empty buffer over the same storage
    pub fn into_buffer(self) -> NativeBuffer {
        NativeBuffer::from_unicode(self.inner.clear())
    }
}
