//! glyphrun: text to positioned glyphs, natively or in a sandbox
//!
//! This crate ties the pieces together:
//!
//! 1. [`glyphrun_core`] - buffers, fonts, glyph results and their lifecycle
//! 2. [`native`] - the in-process harfrust engine (the default)
//! 3. `wasm` - the same engine inside a WebAssembly sandbox (feature `wasm`)
//! 4. [`context`] - which backend "just works" in the current scope
//! 5. [`fallback`] - re-shaping missing glyphs with secondary fonts
//! 6. [`unicode`] - grapheme-cluster element offsets
//!
//! # Example
//!
//! ```ignore
//! use glyphrun::prelude::*;
//!
//! let latin = context::current().load_font("NotoSans-Regular.ttf", 0)?;
//! let emoji = context::current().load_font("NotoColorEmoji.ttf", 0)?;
//!
//! let glyphs = FontFallback::new(&latin).fallback(&emoji).shape("Hi 😀")?;
//! for glyph in &glyphs {
//!     println!("{} @ {} from font {}", glyph.info.glyph_id, glyph.info.cluster, glyph.font_index);
//! }
//! ```
//!
//! # Feature Flags
//!
//! - `wasm`: sandboxed backend on wasmtime, re-exported as `glyphrun::wasm`

pub use glyphrun_core::{
    error, tag, traits, types, Backend, BackendKind, Buffer, BufferState, Direction, Feature,
    Font, GlyphInfo, GlyphPosition, GlyphResult, GlyphrunError, Result, ShapingEngine, Tag,
    Variation,
};

pub use glyphrun_native as native;
pub use glyphrun_unicode as unicode;

#[cfg(feature = "wasm")]
pub use glyphrun_wasm as wasm;

pub mod context;
pub mod fallback;

pub use fallback::{shape_with_fallback, FallbackOptions, FontFallback, RunBoundary, ShapedGlyph};

/// Common imports for typical usage
pub mod prelude {
    pub use crate::context;
    pub use crate::fallback::{
        shape_with_fallback, FallbackOptions, FontFallback, RunBoundary, ShapedGlyph,
    };
    pub use glyphrun_core::{
        Backend, Buffer, Direction, Feature, Font, GlyphInfo, GlyphPosition, GlyphResult,
        GlyphrunError, Result, Tag, Variation,
    };
}
