//! The mutable text buffer and its lifecycle
//!
//! ```text
//!            shape
//!   Open ───────────▶ Consumed
//!     │
//!     │ dispose / drop
//!     ▼
//!  Disposed
//! ```
//!
//! Both end states are terminal. Every operation other than `dispose` fails
//! with [`GlyphrunError::InvalidState`] once the buffer has left `Open`.

use crate::{
    backend::Backend,
    error::{GlyphrunError, Result},
    tag::Tag,
    traits::Handle,
    types::Direction,
};

/// Where a [`Buffer`] is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    Open,
    /// Handed to a shape call; storage now belongs to the result
    Consumed,
    Disposed,
}

#[derive(Debug)]
enum Slot {
    Open(Handle),
    Consumed,
    Disposed,
}

/// Code points plus segment properties, waiting to be shaped
#[derive(Debug)]
pub struct Buffer {
    backend: Backend,
    slot: Slot,
}

impl Buffer {
    pub(crate) fn from_handle(backend: Backend, handle: Handle) -> Self {
        log::trace!("buffer {:?} opened on {backend}", handle);
        Self {
            backend,
            slot: Slot::Open(handle),
        }
    }

    /// The backend that created this buffer
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn state(&self) -> BufferState {
        match self.slot {
            Slot::Open(_) => BufferState::Open,
            Slot::Consumed => BufferState::Consumed,
            Slot::Disposed => BufferState::Disposed,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.slot, Slot::Open(_))
    }

    fn handle(&self) -> Result<Handle> {
        match self.slot {
            Slot::Open(handle) => Ok(handle),
            Slot::Consumed => Err(GlyphrunError::consumed("buffer")),
            Slot::Disposed => Err(GlyphrunError::disposed("buffer")),
        }
    }

    /// Appends text; clusters are UTF-16 offsets
    pub fn add_str(&mut self, text: &str) -> Result<()> {
        let units: Vec<u16> = text.encode_utf16().collect();
        self.add_utf16(&units)
    }

    /// Appends UTF-16 code units
    ///
    /// Unpaired surrogates are shaped as U+FFFD but still occupy their code
    /// unit, so later clusters keep their offsets. Empty input is a no-op.
    pub fn add_utf16(&mut self, units: &[u16]) -> Result<()> {
        let handle = self.handle()?;
        if units.is_empty() {
            return Ok(());
        }
        self.backend
            .with_engine(|e| e.buffer_add_utf16(handle, units))
    }

    /// Removes all text and resets segment properties
    pub fn clear(&mut self) -> Result<()> {
        let handle = self.handle()?;
        self.backend.with_engine(|e| e.buffer_clear(handle))
    }

    /// Length in UTF-16 code units
    pub fn len(&self) -> Result<usize> {
        let handle = self.handle()?;
        self.backend.with_engine(|e| e.buffer_len(handle))
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    pub fn direction(&self) -> Result<Direction> {
        let handle = self.handle()?;
        self.backend.with_engine(|e| e.buffer_direction(handle))
    }

    pub fn set_direction(&mut self, direction: Direction) -> Result<()> {
        let handle = self.handle()?;
        self.backend
            .with_engine(|e| e.buffer_set_direction(handle, direction))
    }

    /// ISO 15924 script tag, e.g. `Latn`
    pub fn script(&self) -> Result<Tag> {
        let handle = self.handle()?;
        self.backend.with_engine(|e| e.buffer_script(handle))
    }

    pub fn set_script(&mut self, script: Tag) -> Result<()> {
        let handle = self.handle()?;
        self.backend
            .with_engine(|e| e.buffer_set_script(handle, script))
    }

    /// BCP 47 language tag, e.g. `en-US`
    pub fn set_language(&mut self, language: &str) -> Result<()> {
        let handle = self.handle()?;
        if language.is_empty() {
            return Err(GlyphrunError::InvalidArgument(
                "language tag is empty".to_string(),
            ));
        }
        self.backend
            .with_engine(|e| e.buffer_set_language(handle, language))
    }

    /// Lets the engine fill in unset direction, script and language
    pub fn guess_segment_properties(&mut self) -> Result<()> {
        let handle = self.handle()?;
        self.backend
            .with_engine(|e| e.buffer_guess_segment_properties(handle))
    }

    /// Releases storage; later calls are no-ops, as is disposing a consumed buffer
    pub fn dispose(&mut self) {
        if let Slot::Open(handle) = self.slot {
            self.slot = Slot::Disposed;
            self.backend.with_engine(|e| e.buffer_free(handle));
            log::trace!("buffer {:?} disposed", handle);
        }
    }

    /// Moves storage out for a shape call, leaving the buffer consumed
    pub(crate) fn take_for_shaping(&mut self) -> Result<Handle> {
        let handle = self.handle()?;
        self.slot = Slot::Consumed;
        Ok(handle)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.dispose();
    }
}
