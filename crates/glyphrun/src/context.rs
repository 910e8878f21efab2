//! The ambient backend
//!
//! Code that does not care where shaping runs asks for [`current`]. By default
//! that is the process-wide native backend; a caller can swap in another
//! backend for a stretch of code with [`enter`] or [`with_backend`]:
//!
//! ```ignore
//! let sandboxed = glyphrun::wasm::WasmBackend::from_env()?;
//! let _scope = context::enter(sandboxed);
//! let buffer = context::create_buffer()?; // lives in the sandbox
//! // previous backend is back once `_scope` drops
//! ```
//!
//! The selection is per thread. Scopes nest like a stack: each one puts back
//! exactly the value it replaced, also when the thread unwinds through it.
//! Guards are meant to end in reverse order of creation. Ending an outer
//! scope early also ends every scope nested in it; their guards then leave
//! the selection alone.
//! A backend becomes current only through a scope; constructing one never
//! changes the ambient selection by itself.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::path::Path;

use glyphrun_core::{Backend, Buffer, Font, Result};

thread_local! {
    // Innermost scope last
    static SCOPES: RefCell<Vec<Backend>> = const { RefCell::new(Vec::new()) };
}

/// The backend selected for this thread, or the shared native backend
pub fn current() -> Backend {
    SCOPES
        .with(|scopes| scopes.borrow().last().cloned())
        .unwrap_or_else(glyphrun_native::shared_backend)
}

/// Whether a scope on this thread has replaced the default
pub fn is_overridden() -> bool {
    SCOPES.with(|scopes| !scopes.borrow().is_empty())
}

/// Makes `backend` current until the returned guard drops
pub fn enter(backend: Backend) -> BackendScope {
    log::debug!("entering scope for {backend}");
    let depth = SCOPES.with(|scopes| {
        let mut scopes = scopes.borrow_mut();
        scopes.push(backend);
        scopes.len() - 1
    });
    BackendScope {
        depth,
        restored: false,
        _thread_bound: PhantomData,
    }
}

/// Runs `f` with `backend` current
pub fn with_backend<R>(backend: Backend, f: impl FnOnce() -> R) -> R {
    let _scope = enter(backend);
    f()
}

/// A new buffer on the current backend
pub fn create_buffer() -> Result<Buffer> {
    current().create_buffer()
}

/// Face `index` of `data` on the current backend
pub fn create_font(data: &[u8], index: u32) -> Result<Font> {
    current().create_font_index(data, index)
}

pub fn load_font(path: impl AsRef<Path>, index: u32) -> Result<Font> {
    current().load_font(path, index)
}

/// Restores the previously current backend when dropped
#[must_use = "the scope ends as soon as the guard is dropped"]
pub struct BackendScope {
    /// Position of this scope's entry in the thread's scope stack
    depth: usize,
    restored: bool,
    // Restoring must happen on the thread that entered
    _thread_bound: PhantomData<*const ()>,
}

impl BackendScope {
    /// Ends the scope now
    pub fn exit(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;
        let depth = self.depth;
        // During thread teardown the stack may already be gone; nothing to restore then.
        let _ = SCOPES.try_with(|scopes| {
            let mut scopes = scopes.borrow_mut();
            let open = scopes.len();
            if open <= depth {
                log::warn!("scope at depth {depth} already ended by an enclosing scope");
                return;
            }
            if open > depth + 1 {
                let nested = open - depth - 1;
                log::warn!("ending scope at depth {depth} also ends {nested} nested scope(s)");
            }
            scopes.truncate(depth);
            log::debug!("left backend scope at depth {depth}");
        });
    }
}

impl Drop for BackendScope {
    fn drop(&mut self) {
        self.restore();
    }
}

impl std::fmt::Debug for BackendScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendScope")
            .field("depth", &self.depth)
            .field("restored", &self.restored)
            .finish()
    }
}
