//! Fonts: immutable, shared by any number of shape calls

use crate::{
    backend::Backend,
    buffer::Buffer,
    error::{GlyphrunError, Result},
    glyphs::GlyphResult,
    tag::{Feature, Variation},
    traits::Handle,
};

/// Parsed font data owned by a backend
///
/// Created once from raw bytes, used for as many shape calls as needed, and
/// disposed exactly once (explicitly or on drop).
#[derive(Debug)]
pub struct Font {
    backend: Backend,
    handle: Option<Handle>,
    face_index: u32,
}

impl Font {
    pub(crate) fn from_handle(backend: Backend, handle: Handle, face_index: u32) -> Self {
        log::debug!("font {:?} (face {face_index}) created on {backend}", handle);
        Self {
            backend,
            handle: Some(handle),
            face_index,
        }
    }

    /// The backend that created this font
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Face index inside a collection (0 for single fonts)
    pub fn face_index(&self) -> u32 {
        self.face_index
    }

    pub fn is_disposed(&self) -> bool {
        self.handle.is_none()
    }

    fn handle(&self) -> Result<Handle> {
        self.handle.ok_or_else(|| GlyphrunError::disposed("font"))
    }

    /// Design units per em
    pub fn units_per_em(&self) -> Result<u16> {
        let handle = self.handle()?;
        self.backend.with_engine(|e| e.font_units_per_em(handle))
    }

    /// Shapes `buffer` with default features
    pub fn shape(&self, buffer: &mut Buffer) -> Result<GlyphResult> {
        self.shape_with(buffer, &[], &[])
    }

    /// Shapes `buffer` with explicit features and variation coordinates
    ///
    /// The buffer is consumed the moment this is called, whether shaping
    /// succeeds or not. Only an already consumed or disposed buffer is left
    /// untouched (and reported as [`GlyphrunError::InvalidState`]).
    pub fn shape_with(
        &self,
        buffer: &mut Buffer,
        features: &[Feature],
        variations: &[Variation],
    ) -> Result<GlyphResult> {
        let buffer_handle = buffer.take_for_shaping()?;

        let font_handle = self
            .backend
            .ensure_same(buffer.backend())
            .and_then(|()| self.handle());
        let font_handle = match font_handle {
            Ok(handle) => handle,
            Err(err) => {
                // The buffer is gone either way; release what it held.
                buffer.backend().with_engine(|e| e.buffer_free(buffer_handle));
                return Err(err);
            }
        };

        let glyphs = self
            .backend
            .with_engine(|e| e.shape(font_handle, buffer_handle, features, variations))?;
        GlyphResult::from_handle(self.backend.clone(), glyphs)
    }

    /// Releases the font; later calls are no-ops
    pub fn dispose(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.backend.with_engine(|e| e.font_free(handle));
            log::debug!("font {:?} disposed", handle);
        }
    }
}

impl Drop for Font {
    fn drop(&mut self) {
        self.dispose();
    }
}
