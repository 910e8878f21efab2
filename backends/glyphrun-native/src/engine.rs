//! Handle tables over the native resource types

use std::collections::HashMap;

use glyphrun_core::{
    BackendKind, Direction, Feature, GlyphInfo, GlyphPosition, GlyphrunError, Handle, Result,
    ShapingEngine, Tag, Variation,
};

use crate::{buffer::NativeBuffer, font::NativeFont, glyphs::NativeGlyphs};

/// In-process [`ShapingEngine`] backed by harfrust
///
/// Handles are never reused, so a stale handle is always reported instead of
/// silently naming some newer resource.
pub struct NativeEngine {
    next_handle: u64,
    buffers: HashMap<u64, NativeBuffer>,
    fonts: HashMap<u64, NativeFont>,
    glyphs: HashMap<u64, NativeGlyphs>,
}

impl NativeEngine {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            buffers: HashMap::new(),
            fonts: HashMap::new(),
            glyphs: HashMap::new(),
        }
    }

    fn issue(&mut self) -> Handle {
        let handle = Handle::new(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn buffer(&mut self, handle: Handle) -> Result<&mut NativeBuffer> {
        self.buffers
            .get_mut(&handle.raw())
            .ok_or_else(|| stale("buffer", handle))
    }

    fn font(&self, handle: Handle) -> Result<&NativeFont> {
        self.fonts
            .get(&handle.raw())
            .ok_or_else(|| stale("font", handle))
    }

    fn glyph_set(&self, handle: Handle) -> Result<&NativeGlyphs> {
        self.glyphs
            .get(&handle.raw())
            .ok_or_else(|| stale("glyph result", handle))
    }
}

impl Default for NativeEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn stale(what: &str, handle: Handle) -> GlyphrunError {
    GlyphrunError::InvalidState(format!("no live {what} for handle {}", handle.raw()))
}

impl ShapingEngine for NativeEngine {
    fn name(&self) -> &'static str {
        "harfrust"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn buffer_new(&mut self) -> Result<Handle> {
        let handle = self.issue();
        self.buffers.insert(handle.raw(), NativeBuffer::new());
        Ok(handle)
    }

    fn buffer_add_utf16(&mut self, buffer: Handle, text: &[u16]) -> Result<()> {
        self.buffer(buffer)?.add_utf16(text);
        Ok(())
    }

    fn buffer_clear(&mut self, buffer: Handle) -> Result<()> {
        self.buffer(buffer)?.clear();
        Ok(())
    }

    fn buffer_len(&mut self, buffer: Handle) -> Result<usize> {
        Ok(self.buffer(buffer)?.len())
    }

    fn buffer_direction(&mut self, buffer: Handle) -> Result<Direction> {
        Ok(self.buffer(buffer)?.direction())
    }

    fn buffer_set_direction(&mut self, buffer: Handle, direction: Direction) -> Result<()> {
        self.buffer(buffer)?.set_direction(direction);
        Ok(())
    }

    fn buffer_script(&mut self, buffer: Handle) -> Result<Tag> {
        Ok(self.buffer(buffer)?.script())
    }

    fn buffer_set_script(&mut self, buffer: Handle, script: Tag) -> Result<()> {
        self.buffer(buffer)?.set_script(script)
    }

    fn buffer_set_language(&mut self, buffer: Handle, language: &str) -> Result<()> {
        self.buffer(buffer)?.set_language(language)
    }

    fn buffer_guess_segment_properties(&mut self, buffer: Handle) -> Result<()> {
        self.buffer(buffer)?.guess_segment_properties();
        Ok(())
    }

    fn buffer_free(&mut self, buffer: Handle) {
        self.buffers.remove(&buffer.raw());
    }

    fn font_new(&mut self, data: &[u8], index: u32) -> Result<Handle> {
        let font = NativeFont::from_data_index(data, index)?;
        let handle = self.issue();
        self.fonts.insert(handle.raw(), font);
        Ok(handle)
    }

    fn font_units_per_em(&mut self, font: Handle) -> Result<u16> {
        Ok(self.font(font)?.units_per_em())
    }

    fn font_free(&mut self, font: Handle) {
        self.fonts.remove(&font.raw());
    }

    fn shape(
        &mut self,
        font: Handle,
        buffer: Handle,
        features: &[Feature],
        variations: &[Variation],
    ) -> Result<Handle> {
        let buffer = self
            .buffers
            .remove(&buffer.raw())
            .ok_or_else(|| stale("buffer", buffer))?;
        let glyphs = self.font(font)?.shape(buffer, features, variations)?;
        let handle = self.issue();
        self.glyphs.insert(handle.raw(), glyphs);
        Ok(handle)
    }

    fn glyphs_len(&mut self, glyphs: Handle) -> Result<usize> {
        Ok(self.glyph_set(glyphs)?.len())
    }

    fn glyphs_infos(&mut self, glyphs: Handle) -> Result<Vec<GlyphInfo>> {
        Ok(self.glyph_set(glyphs)?.infos().to_vec())
    }

    fn glyphs_positions(&mut self, glyphs: Handle) -> Result<Vec<GlyphPosition>> {
        Ok(self.glyph_set(glyphs)?.positions().to_vec())
    }

    fn glyphs_into_buffer(&mut self, glyphs: Handle) -> Result<Handle> {
        let glyphs = self
            .glyphs
            .remove(&glyphs.raw())
            .ok_or_else(|| stale("glyph result", glyphs))?;
        let handle = self.issue();
        self.buffers.insert(handle.raw(), glyphs.into_buffer());
        Ok(handle)
    }

    fn glyphs_free(&mut self, glyphs: Handle) {
        self.glyphs.remove(&glyphs.raw());
    }
}
