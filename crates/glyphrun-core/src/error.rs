//! Error types for glyphrun

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GlyphrunError>;

/// Main error type for glyphrun
///
/// Every failure surfaces synchronously as one of these kinds. Nothing is
/// retried internally.
#[derive(Debug, Error)]
pub enum GlyphrunError {
    /// Null/empty input, malformed tag, out-of-range feature index
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Use of a consumed or disposed buffer, font or glyph result
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Resources from two different backend instances met in one call
    #[error("Backend mismatch: expected {expected}, found {found}")]
    BackendMismatch { expected: String, found: String },

    /// The engine reported a failure (null result)
    #[error("Shaping failed: {0}")]
    ShapingFailure(String),

    /// Missing font file, missing face in a collection, missing guest module or export
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Trap or memory fault inside the sandboxed runtime
    #[error("Sandbox error: {0}")]
    Sandbox(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GlyphrunError {
    pub(crate) fn consumed(what: &str) -> Self {
        GlyphrunError::InvalidState(format!("{what} was consumed by a shape call"))
    }

    pub(crate) fn disposed(what: &str) -> Self {
        GlyphrunError::InvalidState(format!("{what} was disposed"))
    }

    /// True for [`GlyphrunError::InvalidState`]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, GlyphrunError::InvalidState(_))
    }

    /// True for [`GlyphrunError::InvalidArgument`]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, GlyphrunError::InvalidArgument(_))
    }
}
