//! Shaping output

use crate::{
    backend::Backend,
    buffer::Buffer,
    error::{GlyphrunError, Result},
    traits::Handle,
    types::{GlyphInfo, GlyphPosition},
};

/// Read-only view over shaped glyphs
///
/// Glyph data is copied out of the engine once, when the result is created.
/// The engine-side storage stays alive so that [`GlyphResult::into_buffer`]
/// can hand it back as a fresh buffer without reallocating.
#[derive(Debug)]
pub struct GlyphResult {
    backend: Backend,
    handle: Option<Handle>,
    infos: Vec<GlyphInfo>,
    positions: Vec<GlyphPosition>,
}

impl GlyphResult {
    pub(crate) fn from_handle(backend: Backend, handle: Handle) -> Result<Self> {
        let read = backend.with_engine(|e| {
            let infos = e.glyphs_infos(handle)?;
            let positions = e.glyphs_positions(handle)?;
            Ok::<_, GlyphrunError>((infos, positions))
        });

        let (infos, positions) = match read {
            Ok(pair) => pair,
            Err(err) => {
                backend.with_engine(|e| e.glyphs_free(handle));
                return Err(err);
            }
        };

        if infos.len() != positions.len() {
            backend.with_engine(|e| e.glyphs_free(handle));
            return Err(GlyphrunError::ShapingFailure(format!(
                "engine returned {} glyph infos but {} positions",
                infos.len(),
                positions.len()
            )));
        }

        Ok(Self {
            backend,
            handle: Some(handle),
            infos,
            positions,
        })
    }

    /// The backend that produced this result
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn is_disposed(&self) -> bool {
        self.handle.is_none()
    }

    fn ensure_live(&self) -> Result<()> {
        match self.handle {
            Some(_) => Ok(()),
            None => Err(GlyphrunError::disposed("glyph result")),
        }
    }

    /// Number of glyphs, which need not match the number of input characters
    pub fn len(&self) -> Result<usize> {
        self.ensure_live()?;
        Ok(self.infos.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    pub fn infos(&self) -> Result<&[GlyphInfo]> {
        self.ensure_live()?;
        Ok(&self.infos)
    }

    pub fn positions(&self) -> Result<&[GlyphPosition]> {
        self.ensure_live()?;
        Ok(&self.positions)
    }

    /// Glyph infos paired with their positions, in output order
    pub fn glyphs(&self) -> Result<impl Iterator<Item = (GlyphInfo, GlyphPosition)> + '_> {
        self.ensure_live()?;
        Ok(self
            .infos
            .iter()
            .copied()
            .zip(self.positions.iter().copied()))
    }

    /// Sum of x and y advances, in design units
    pub fn total_advance(&self) -> Result<(i64, i64)> {
        let positions = self.positions()?;
        Ok(positions.iter().fold((0i64, 0i64), |(x, y), p| {
            (x + i64::from(p.x_advance), y + i64::from(p.y_advance))
        }))
    }

    /// Disposes this result and returns an empty open buffer reusing its storage
    pub fn into_buffer(mut self) -> Result<Buffer> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| GlyphrunError::disposed("glyph result"))?;
        let buffer = self.backend.with_engine(|e| e.glyphs_into_buffer(handle))?;
        Ok(Buffer::from_handle(self.backend.clone(), buffer))
    }

    /// Releases the result; later calls are no-ops
    pub fn dispose(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.backend.with_engine(|e| e.glyphs_free(handle));
        }
    }
}

impl Drop for GlyphResult {
    fn drop(&mut self) {
        self.dispose();
    }
}
