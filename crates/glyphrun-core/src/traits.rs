//! The contract every shaping engine signs
//!
//! An engine is the narrow, function-style surface of a shaping provider:
//! buffer lifecycle, font lifecycle, shaping, and glyph-result access. Storage
//! lives on the engine's side and is named by opaque [`Handle`]s, so the same
//! contract fits an in-process engine (handles index a table of Rust values)
//! and a sandboxed one (handles are offsets into the guest's linear memory).
//!
//! Engines never see [`Buffer`](crate::Buffer) or [`Font`](crate::Font)
//! lifecycle state. That bookkeeping lives one level up, in the resource
//! types, which are the only callers of this trait.

use crate::{
    error::Result,
    tag::{Feature, Tag, Variation},
    types::{Direction, GlyphInfo, GlyphPosition},
};

/// Engine-defined name for a buffer, font or glyph result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    pub const fn new(raw: u64) -> Self {
        Handle(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Where an engine keeps its storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Engine runs in-process; storage is ordinary heap memory
    Native,
    /// Engine runs inside a sandboxed runtime; storage is linear memory
    Sandboxed,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Native => "native",
            BackendKind::Sandboxed => "sandboxed",
        }
    }
}

/// Capability interface of a shaping provider
///
/// Calls are synchronous. A single engine is driven by one caller at a time;
/// [`Backend`](crate::Backend) serializes access.
pub trait ShapingEngine: Send {
    /// Identify yourself in logs and error messages
    fn name(&self) -> &'static str;

    fn kind(&self) -> BackendKind;

    // Buffers

    fn buffer_new(&mut self) -> Result<Handle>;

    /// Appends UTF-16 code units; clusters are code-unit offsets that continue
    /// from the previous append
    fn buffer_add_utf16(&mut self, buffer: Handle, text: &[u16]) -> Result<()>;

    fn buffer_clear(&mut self, buffer: Handle) -> Result<()>;

    /// Length in UTF-16 code units
    fn buffer_len(&mut self, buffer: Handle) -> Result<usize>;

    fn buffer_direction(&mut self, buffer: Handle) -> Result<Direction>;

    fn buffer_set_direction(&mut self, buffer: Handle, direction: Direction) -> Result<()>;

    /// ISO 15924 script tag currently set on the buffer
    fn buffer_script(&mut self, buffer: Handle) -> Result<Tag>;

    fn buffer_set_script(&mut self, buffer: Handle, script: Tag) -> Result<()>;

    /// BCP 47 language tag
    fn buffer_set_language(&mut self, buffer: Handle, language: &str) -> Result<()>;

    fn buffer_guess_segment_properties(&mut self, buffer: Handle) -> Result<()>;

    /// Releases buffer storage; unknown handles are ignored
    fn buffer_free(&mut self, buffer: Handle);

    // Fonts

    /// Copies `data` and parses face `index` from it
    fn font_new(&mut self, data: &[u8], index: u32) -> Result<Handle>;

    fn font_units_per_em(&mut self, font: Handle) -> Result<u16>;

    fn font_free(&mut self, font: Handle);

    // Shaping

    /// Shapes `buffer` with `font`
    ///
    /// Takes ownership of the buffer's storage whatever the outcome: on
    /// return, `buffer` no longer names anything.
    fn shape(
        &mut self,
        font: Handle,
        buffer: Handle,
        features: &[Feature],
        variations: &[Variation],
    ) -> Result<Handle>;

    // Glyph results

    fn glyphs_len(&mut self, glyphs: Handle) -> Result<usize>;

    fn glyphs_infos(&mut self, glyphs: Handle) -> Result<Vec<GlyphInfo>>;

    fn glyphs_positions(&mut self, glyphs: Handle) -> Result<Vec<GlyphPosition>>;

    /// Turns a glyph result back into an empty buffer over the same storage
    ///
    /// `glyphs` no longer names anything afterwards, even on failure.
    fn glyphs_into_buffer(&mut self, glyphs: Handle) -> Result<Handle>;

    fn glyphs_free(&mut self, glyphs: Handle);
}
