//! Sandboxed shaping inside a WebAssembly guest
//!
//! The guest is `glyphrun-ffi` compiled for `wasm32-unknown-unknown`. It runs
//! in its own linear memory with no imports, so a malformed font can at worst
//! trap the guest; the host sees that as [`GlyphrunError::Sandbox`].
//!
//! ```rust,ignore
//! let backend = glyphrun_wasm::WasmBackend::from_file("glyphrun_ffi.wasm")?;
//! let font = backend.load_font("DejaVuSans.ttf", 0)?;
//! ```
//!
//! # Environment Variable
//!
//! [`WasmBackend::from_env`] reads the module path from `GLYPHRUN_WASM_MODULE`.

use std::path::Path;

use glyphrun_core::{Backend, GlyphrunError, Result};

pub mod engine;
pub mod host;
pub mod layout;
pub mod wasmtime_host;

pub use engine::SandboxEngine;
pub use host::SandboxHost;
pub use wasmtime_host::WasmtimeHost;

/// Names the guest module used by [`WasmBackend::from_env`]
pub const MODULE_ENV: &str = "GLYPHRUN_WASM_MODULE";

/// Constructors for sandboxed [`Backend`]s
pub struct WasmBackend;

impl WasmBackend {
    pub fn from_bytes(module: &[u8]) -> Result<Backend> {
        let host = WasmtimeHost::from_bytes(module)?;
        Ok(Self::from_host(host))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Backend> {
        let host = WasmtimeHost::from_file(path)?;
        Ok(Self::from_host(host))
    }

    /// Loads the module named by `GLYPHRUN_WASM_MODULE`
    pub fn from_env() -> Result<Backend> {
        let path = std::env::var_os(MODULE_ENV).ok_or_else(|| {
            GlyphrunError::ResourceNotFound(format!("{MODULE_ENV} is not set"))
        })?;
        Self::from_file(path)
    }

    /// Wraps any host, e.g. one with a custom wasmtime configuration
    pub fn from_host(host: impl SandboxHost + 'static) -> Backend {
        Backend::new(SandboxEngine::new(host))
    }
}
