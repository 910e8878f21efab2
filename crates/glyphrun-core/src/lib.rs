//! glyphrun core: shaping sessions over interchangeable engines
//!
//! A shaping session has three kinds of resources, each issued by a
//! [`Backend`]:
//!
//! 1. **[`Buffer`]** - text plus segment properties, mutable while open
//! 2. **[`Font`]** - parsed font data, immutable, shapes any number of buffers
//! 3. **[`GlyphResult`]** - what a shape call produces; can be recycled into a buffer
//!
//! The backend wraps a [`ShapingEngine`], the narrow function-style surface of
//! the actual shaper. An engine can run in-process or inside a sandboxed
//! runtime; the resource types behave identically over both.
//!
//! ## Shape some text
//!
//! ```rust,ignore
//! let backend = glyphrun_native::shared_backend();
//! let font = backend.load_font("DejaVuSans.ttf", 0)?;
//!
//! let mut buffer = backend.create_buffer()?;
//! buffer.add_str("Hello")?;
//! buffer.guess_segment_properties()?;
//!
//! let glyphs = font.shape(&mut buffer)?; // buffer is now consumed
//! for (info, pos) in glyphs.glyphs()? {
//!     println!("{} @ {} -> {}", info.glyph_id, info.cluster, pos.x_advance);
//! }
//!
//! let mut again = glyphs.into_buffer()?; // same storage, empty and open
//! again.add_str("World")?;
//! ```
//!
//! ## Lifecycle rules
//!
//! - A buffer handed to [`Font::shape`] is consumed, even if shaping fails
//! - Consumed or disposed resources reject every operation except `dispose`
//! - `dispose` is idempotent; dropping a resource disposes it
//! - Mixing resources from two backend instances is a
//!   [`GlyphrunError::BackendMismatch`]

pub mod backend;
pub mod buffer;
pub mod error;
pub mod font;
pub mod glyphs;
pub mod tag;
pub mod traits;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backend::Backend;
pub use buffer::{Buffer, BufferState};
pub use error::{GlyphrunError, Result};
pub use font::Font;
pub use glyphs::GlyphResult;
pub use tag::{Feature, Tag, Variation};
pub use traits::{BackendKind, Handle, ShapingEngine};
pub use types::{Direction, GlyphInfo, GlyphPosition};

/// Plain data that crosses the engine boundary
pub mod types {
    /// Which way the text flows, with the engine's numeric codes
    #[repr(i32)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub enum Direction {
        /// Not set yet; shaping will guess
        #[default]
        Invalid = 0,
        LeftToRight = 4,
        RightToLeft = 5,
        TopToBottom = 6,
        BottomToTop = 7,
    }

    impl Direction {
        /// Unknown codes map to `Invalid`
        pub fn from_raw(raw: i32) -> Self {
            match raw {
                4 => Direction::LeftToRight,
                5 => Direction::RightToLeft,
                6 => Direction::TopToBottom,
                7 => Direction::BottomToTop,
                _ => Direction::Invalid,
            }
        }

        pub fn to_raw(self) -> i32 {
            self as i32
        }

        pub fn is_horizontal(self) -> bool {
            matches!(self, Direction::LeftToRight | Direction::RightToLeft)
        }

        pub fn is_vertical(self) -> bool {
            matches!(self, Direction::TopToBottom | Direction::BottomToTop)
        }

        /// Right-to-left or bottom-to-top
        pub fn is_backward(self) -> bool {
            matches!(self, Direction::RightToLeft | Direction::BottomToTop)
        }
    }

    /// Which glyph, and where in the source text it came from
    ///
    /// 8 bytes: `glyph_id`, `cluster`.
    #[repr(C)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GlyphInfo {
        pub glyph_id: u32,
        /// UTF-16 offset of the first code unit this glyph was shaped from
        pub cluster: u32,
    }

    impl GlyphInfo {
        /// Glyph 0 is `.notdef`: the font had nothing for this input
        pub fn is_notdef(&self) -> bool {
            self.glyph_id == 0
        }
    }

    /// How far to move and how to offset a glyph, in design units
    ///
    /// 16 bytes: `x_advance`, `y_advance`, `x_offset`, `y_offset`.
    #[repr(C)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GlyphPosition {
        pub x_advance: i32,
        pub y_advance: i32,
        pub x_offset: i32,
        pub y_offset: i32,
    }
}
