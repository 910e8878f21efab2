//! A deterministic engine for tests
//!
//! Mock fonts are coverage sets: every covered character maps to one glyph
//! whose id is the character's scalar value, everything else maps to glyph 0.
//! One character always yields one glyph, clustered at its UTF-16 offset, and
//! right-to-left buffers come out reversed the way a real shaper emits them.
//!
//! ```rust,ignore
//! let engine = MockEngine::new();
//! let tracker = engine.tracker();
//! let backend = Backend::new(engine);
//! let latin = backend.create_font(&font_bytes("ABC"))?;
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    error::{GlyphrunError, Result},
    tag::{Feature, Tag, Variation},
    traits::{BackendKind, Handle, ShapingEngine},
    types::{Direction, GlyphInfo, GlyphPosition},
};

const FONT_MAGIC: &[u8] = b"MOCKFONT";
const COLLECTION_MAGIC: &[u8] = b"MOCKCOLL";
const FAILING_MAGIC: &[u8] = b"MOCKFAIL";

/// Advance of a covered glyph
pub const COVERED_ADVANCE: i32 = 500;
/// Advance of a `.notdef` glyph
pub const NOTDEF_ADVANCE: i32 = 250;
pub const UNITS_PER_EM: u16 = 1000;

/// Font bytes covering exactly the characters of `covered`
pub fn font_bytes(covered: &str) -> Vec<u8> {
    let mut data = FONT_MAGIC.to_vec();
    data.extend_from_slice(covered.as_bytes());
    data
}

/// A collection whose faces cover the given character sets
pub fn collection_bytes(faces: &[&str]) -> Vec<u8> {
    let mut data = COLLECTION_MAGIC.to_vec();
    data.extend_from_slice(faces.join("\0").as_bytes());
    data
}

/// A font that parses but whose every shape call fails
pub fn failing_font_bytes() -> Vec<u8> {
    FAILING_MAGIC.to_vec()
}

#[derive(Default)]
struct Counters {
    live_buffers: AtomicUsize,
    live_fonts: AtomicUsize,
    live_glyphs: AtomicUsize,
    shape_calls: AtomicUsize,
    last_features: Mutex<Vec<Feature>>,
    last_variations: Mutex<Vec<Variation>>,
}

/// Observes a [`MockEngine`] after it has been moved into a backend
#[derive(Clone, Default)]
pub struct MockTracker(Arc<Counters>);

impl MockTracker {
    pub fn live_buffers(&self) -> usize {
        self.0.live_buffers.load(Ordering::SeqCst)
    }

    pub fn live_fonts(&self) -> usize {
        self.0.live_fonts.load(Ordering::SeqCst)
    }

    pub fn live_glyphs(&self) -> usize {
        self.0.live_glyphs.load(Ordering::SeqCst)
    }

    pub fn shape_calls(&self) -> usize {
        self.0.shape_calls.load(Ordering::SeqCst)
    }

    pub fn last_features(&self) -> Vec<Feature> {
        self.0.last_features.lock().clone()
    }

    pub fn last_variations(&self) -> Vec<Variation> {
        self.0.last_variations.lock().clone()
    }
}

#[derive(Default)]
struct MockBuffer {
    units: Vec<u16>,
    direction: Direction,
    script: Tag,
    language: Option<String>,
}

impl MockBuffer {
    fn reset(&mut self) {
        self.units.clear();
        self.direction = Direction::Invalid;
        self.script = Tag::default();
        self.language = None;
    }

    fn guess(&mut self) {
        let strong = char::decode_utf16(self.units.iter().copied())
            .filter_map(|c| c.ok())
            .find_map(script_of);
        if self.script == Tag::default() {
            self.script = strong.unwrap_or(Tag::new(b"Zyyy"));
        }
        if self.direction == Direction::Invalid {
            let rtl = [Tag::new(b"Hebr"), Tag::new(b"Arab")];
            self.direction = if rtl.contains(&self.script) {
                Direction::RightToLeft
            } else {
                Direction::LeftToRight
            };
        }
        if self.language.is_none() {
            self.language = Some("en".to_string());
        }
    }
}

fn script_of(c: char) -> Option<Tag> {
    match c as u32 {
        0x0590..=0x05FF => Some(Tag::new(b"Hebr")),
        0x0600..=0x06FF => Some(Tag::new(b"Arab")),
        _ if c.is_ascii_alphabetic() => Some(Tag::new(b"Latn")),
        _ => None,
    }
}

enum MockFont {
    Covers(HashSet<char>),
    Failing,
}

struct MockGlyphs {
    infos: Vec<GlyphInfo>,
    positions: Vec<GlyphPosition>,
    storage: MockBuffer,
}

/// In-memory [`ShapingEngine`] with predictable output
pub struct MockEngine {
    kind: BackendKind,
    next_handle: u64,
    buffers: HashMap<u64, MockBuffer>,
    fonts: HashMap<u64, MockFont>,
    glyphs: HashMap<u64, MockGlyphs>,
    tracker: MockTracker,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::with_kind(BackendKind::Native)
    }

    /// Pretend to be a particular kind of backend
    pub fn with_kind(kind: BackendKind) -> Self {
        Self {
            kind,
            next_handle: 1,
            buffers: HashMap::new(),
            fonts: HashMap::new(),
            glyphs: HashMap::new(),
            tracker: MockTracker::default(),
        }
    }

    pub fn tracker(&self) -> MockTracker {
        self.tracker.clone()
    }

    fn issue(&mut self) -> u64 {
        let raw = self.next_handle;
        self.next_handle += 1;
        raw
    }

    fn buffer(&mut self, handle: Handle) -> Result<&mut MockBuffer> {
        self.buffers
            .get_mut(&handle.raw())
            .ok_or_else(|| GlyphrunError::InvalidState(format!("unknown buffer {handle:?}")))
    }

    fn glyph_set(&mut self, handle: Handle) -> Result<&mut MockGlyphs> {
        self.glyphs
            .get_mut(&handle.raw())
            .ok_or_else(|| GlyphrunError::InvalidState(format!("unknown glyph result {handle:?}")))
    }

    fn parse_font(data: &[u8], index: u32) -> Result<MockFont> {
        let text = |bytes: &[u8]| {
            std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|_| GlyphrunError::InvalidArgument("mock font is not UTF-8".into()))
        };
        let faces: Vec<MockFont> = if let Some(rest) = data.strip_prefix(FONT_MAGIC) {
            vec![MockFont::Covers(text(rest)?.chars().collect())]
        } else if let Some(rest) = data.strip_prefix(COLLECTION_MAGIC) {
            text(rest)?
                .split('\0')
                .map(|face| MockFont::Covers(face.chars().collect()))
                .collect()
        } else if data == FAILING_MAGIC {
            vec![MockFont::Failing]
        } else {
            return Err(GlyphrunError::InvalidArgument(
                "data is not a font".to_string(),
            ));
        };
        let count = faces.len();
        faces.into_iter().nth(index as usize).ok_or_else(|| {
            GlyphrunError::ResourceNotFound(format!("face {index} (collection has {count})"))
        })
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapingEngine for MockEngine {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn buffer_new(&mut self) -> Result<Handle> {
        let raw = self.issue();
        self.buffers.insert(raw, MockBuffer::default());
        self.tracker.0.live_buffers.fetch_add(1, Ordering::SeqCst);
        Ok(Handle::new(raw))
    }

    fn buffer_add_utf16(&mut self, buffer: Handle, text: &[u16]) -> Result<()> {
        self.buffer(buffer)?.units.extend_from_slice(text);
        Ok(())
    }

    fn buffer_clear(&mut self, buffer: Handle) -> Result<()> {
        self.buffer(buffer)?.reset();
        Ok(())
    }

    fn buffer_len(&mut self, buffer: Handle) -> Result<usize> {
        Ok(self.buffer(buffer)?.units.len())
    }

    fn buffer_direction(&mut self, buffer: Handle) -> Result<Direction> {
        Ok(self.buffer(buffer)?.direction)
    }

    fn buffer_set_direction(&mut self, buffer: Handle, direction: Direction) -> Result<()> {
        self.buffer(buffer)?.direction = direction;
        Ok(())
    }

    fn buffer_script(&mut self, buffer: Handle) -> Result<Tag> {
        Ok(self.buffer(buffer)?.script)
    }

    fn buffer_set_script(&mut self, buffer: Handle, script: Tag) -> Result<()> {
        self.buffer(buffer)?.script = script;
        Ok(())
    }

    fn buffer_set_language(&mut self, buffer: Handle, language: &str) -> Result<()> {
        let well_formed = language.split('-').all(|part| {
            !part.is_empty() && part.len() <= 8 && part.chars().all(|c| c.is_ascii_alphanumeric())
        });
        if !well_formed {
            return Err(GlyphrunError::InvalidArgument(format!(
                "`{language}` is not a BCP 47 tag"
            )));
        }
        self.buffer(buffer)?.language = Some(language.to_string());
        Ok(())
    }

    fn buffer_guess_segment_properties(&mut self, buffer: Handle) -> Result<()> {
        self.buffer(buffer)?.guess();
        Ok(())
    }

    fn buffer_free(&mut self, buffer: Handle) {
        if self.buffers.remove(&buffer.raw()).is_some() {
            self.tracker.0.live_buffers.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn font_new(&mut self, data: &[u8], index: u32) -> Result<Handle> {
        let font = Self::parse_font(data, index)?;
        let raw = self.issue();
        self.fonts.insert(raw, font);
        self.tracker.0.live_fonts.fetch_add(1, Ordering::SeqCst);
        Ok(Handle::new(raw))
    }

    fn font_units_per_em(&mut self, font: Handle) -> Result<u16> {
        if self.fonts.contains_key(&font.raw()) {
            Ok(UNITS_PER_EM)
        } else {
            Err(GlyphrunError::InvalidState(format!("unknown font {font:?}")))
        }
    }

    fn font_free(&mut self, font: Handle) {
        if self.fonts.remove(&font.raw()).is_some() {
            self.tracker.0.live_fonts.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn shape(
        &mut self,
        font: Handle,
        buffer: Handle,
        features: &[Feature],
        variations: &[Variation],
    ) -> Result<Handle> {
        // The buffer leaves the table before anything can fail.
        let mut storage = self
            .buffers
            .remove(&buffer.raw())
            .ok_or_else(|| GlyphrunError::InvalidState(format!("unknown buffer {buffer:?}")))?;
        self.tracker.0.live_buffers.fetch_sub(1, Ordering::SeqCst);
        self.tracker.0.shape_calls.fetch_add(1, Ordering::SeqCst);
        *self.tracker.0.last_features.lock() = features.to_vec();
        *self.tracker.0.last_variations.lock() = variations.to_vec();

        let covered = match self.fonts.get(&font.raw()) {
            Some(MockFont::Covers(covered)) => covered,
            Some(MockFont::Failing) => {
                return Err(GlyphrunError::ShapingFailure(
                    "mock font refuses to shape".to_string(),
                ))
            }
            None => return Err(GlyphrunError::InvalidState(format!("unknown font {font:?}"))),
        };

        if storage.direction == Direction::Invalid {
            storage.guess();
        }

        let mut infos = Vec::new();
        let mut positions = Vec::new();
        let mut offset = 0u32;
        for decoded in char::decode_utf16(storage.units.iter().copied()) {
            let (c, width) = match decoded {
                Ok(c) => (c, c.len_utf16() as u32),
                Err(_) => (char::REPLACEMENT_CHARACTER, 1),
            };
            let glyph_id = if covered.contains(&c) { c as u32 } else { 0 };
            infos.push(GlyphInfo {
                glyph_id,
                cluster: offset,
            });
            positions.push(GlyphPosition {
                x_advance: if glyph_id == 0 {
                    NOTDEF_ADVANCE
                } else {
                    COVERED_ADVANCE
                },
                ..GlyphPosition::default()
            });
            offset += width;
        }
        if storage.direction.is_backward() {
            infos.reverse();
            positions.reverse();
        }

        let raw = self.issue();
        self.glyphs.insert(
            raw,
            MockGlyphs {
                infos,
                positions,
                storage,
            },
        );
        self.tracker.0.live_glyphs.fetch_add(1, Ordering::SeqCst);
        Ok(Handle::new(raw))
    }

    fn glyphs_len(&mut self, glyphs: Handle) -> Result<usize> {
        Ok(self.glyph_set(glyphs)?.infos.len())
    }

    fn glyphs_infos(&mut self, glyphs: Handle) -> Result<Vec<GlyphInfo>> {
        Ok(self.glyph_set(glyphs)?.infos.clone())
    }

    fn glyphs_positions(&mut self, glyphs: Handle) -> Result<Vec<GlyphPosition>> {
        Ok(self.glyph_set(glyphs)?.positions.clone())
    }

    fn glyphs_into_buffer(&mut self, glyphs: Handle) -> Result<Handle> {
        let MockGlyphs { mut storage, .. } = self
            .glyphs
            .remove(&glyphs.raw())
            .ok_or_else(|| {
                GlyphrunError::InvalidState(format!("unknown glyph result {glyphs:?}"))
            })?;
        self.tracker.0.live_glyphs.fetch_sub(1, Ordering::SeqCst);

        storage.reset();
        let raw = self.issue();
        self.buffers.insert(raw, storage);
        self.tracker.0.live_buffers.fetch_add(1, Ordering::SeqCst);
        Ok(Handle::new(raw))
    }

    fn glyphs_free(&mut self, glyphs: Handle) {
        if self.glyphs.remove(&glyphs.raw()).is_some() {
            self.tracker.0.live_glyphs.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
