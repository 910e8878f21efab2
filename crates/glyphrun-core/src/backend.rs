//! Backends: one engine, shared by every resource it issues

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    buffer::Buffer,
    error::{GlyphrunError, Result},
    font::Font,
    traits::{BackendKind, ShapingEngine},
};

static NEXT_BACKEND_ID: AtomicU64 = AtomicU64::new(1);

struct BackendInner {
    id: u64,
    name: &'static str,
    kind: BackendKind,
    engine: Mutex<Box<dyn ShapingEngine>>,
}

/// A shaping provider and the resources it creates
///
/// Cloning is cheap and yields the same backend instance. Buffers, fonts and
/// glyph results remember the backend that issued them and can only be
/// combined with resources from that same instance.
#[derive(Clone)]
pub struct Backend {
    inner: Arc<BackendInner>,
}

impl Backend {
    /// Wraps an engine into a new backend instance
    pub fn new(engine: impl ShapingEngine + 'static) -> Self {
        let id = NEXT_BACKEND_ID.fetch_add(1, Ordering::Relaxed);
        let name = engine.name();
        let kind = engine.kind();
        log::debug!("backend #{id} created ({name}, {})", kind.as_str());
        Self {
            inner: Arc::new(BackendInner {
                id,
                name,
                kind,
                engine: Mutex::new(Box::new(engine)),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn kind(&self) -> BackendKind {
        self.inner.kind
    }

    /// Whether both values refer to the same backend instance
    pub fn same_as(&self, other: &Backend) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Runs `f` with exclusive access to the engine
    pub(crate) fn with_engine<R>(&self, f: impl FnOnce(&mut dyn ShapingEngine) -> R) -> R {
        let mut engine = self.inner.engine.lock();
        f(engine.as_mut())
    }

    pub(crate) fn ensure_same(&self, other: &Backend) -> Result<()> {
        if self.same_as(other) {
            Ok(())
        } else {
            Err(GlyphrunError::BackendMismatch {
                expected: self.to_string(),
                found: other.to_string(),
            })
        }
    }

    /// A fresh, empty, open buffer
    pub fn create_buffer(&self) -> Result<Buffer> {
        let handle = self.with_engine(|e| e.buffer_new())?;
        Ok(Buffer::from_handle(self.clone(), handle))
    }

    /// Parses the first face of `data`
    pub fn create_font(&self, data: &[u8]) -> Result<Font> {
        self.create_font_index(data, 0)
    }

    /// Parses face `index` of `data` (collections hold more than one)
    ///
    /// The engine keeps its own copy of the bytes.
    pub fn create_font_index(&self, data: &[u8], index: u32) -> Result<Font> {
        if data.is_empty() {
            return Err(GlyphrunError::InvalidArgument(
                "font data is empty".to_string(),
            ));
        }
        let handle = self.with_engine(|e| e.font_new(data, index))?;
        Ok(Font::from_handle(self.clone(), handle, index))
    }

    /// Reads a font file and parses face `index`
    pub fn load_font(&self, path: impl AsRef<Path>, index: u32) -> Result<Font> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => {
                GlyphrunError::ResourceNotFound(format!("font file {}", path.display()))
            }
            _ => GlyphrunError::Io(err),
        })?;
        self.create_font_index(&data, index)
    }
}

impl PartialEq for Backend {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Backend {}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} backend #{}", self.inner.name, self.inner.id)
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("kind", &self.inner.kind)
            .finish()
    }
}
