//! In-process shaping with harfrust
//!
//! Harfrust is a pure Rust port of HarfBuzz, so this backend needs no C
//! toolchain and runs wherever Rust does. Storage is ordinary heap memory;
//! [`NativeEngine`] names it through handle tables so that it fits the same
//! [`ShapingEngine`](glyphrun_core::ShapingEngine) contract as the sandboxed
//! backend.
//!
//! The resource types ([`NativeBuffer`], [`NativeFont`], [`NativeGlyphs`]) are
//! public so that the C bindings can expose them directly.

use std::sync::OnceLock;

use glyphrun_core::Backend;

pub mod buffer;
pub mod engine;
pub mod font;
pub mod glyphs;

pub use buffer::NativeBuffer;
pub use engine::NativeEngine;
pub use font::NativeFont;
pub use glyphs::NativeGlyphs;

/// A new, independent native backend instance
pub fn backend() -> Backend {
    Backend::new(NativeEngine::new())
}

/// The process-wide native backend
///
/// Created on first use. This is the default when no other backend has been
/// selected.
pub fn shared_backend() -> Backend {
    static SHARED: OnceLock<Backend> = OnceLock::new();
    SHARED
        .get_or_init(|| {
            log::debug!("initializing shared native backend");
            backend()
        })
        .clone()
}
