//! SandboxEngine against an in-process fake guest
//!
//! The fake keeps a real byte-addressed linear memory and answers the guest
//! exports by forwarding to the core mock engine, so every argument and result
//! really crosses the memory boundary.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glyphrun_core::testing::{
    collection_bytes, failing_font_bytes, font_bytes, MockEngine, MockTracker, COVERED_ADVANCE,
};
use glyphrun_core::{
    BackendKind, BufferState, Direction, Feature, GlyphrunError, Handle, Result, ShapingEngine,
    Tag, Variation,
};
use glyphrun_wasm::{SandboxHost, WasmBackend};

const MEMORY_SIZE: usize = 1 << 16;
const NULL: i32 = 0;
const STATUS_NULL: i32 = -1;
const STATUS_INVALID: i32 = -2;

struct FakeGuest {
    memory: Vec<u8>,
    next_free: usize,
    live_blocks: Arc<AtomicUsize>,
    blocks: HashMap<u32, usize>,
    engine: MockEngine,
    objects: HashMap<i32, Handle>,
    next_object: i32,
    trap_on: Option<&'static str>,
}

impl FakeGuest {
    fn new() -> (Self, MockTracker, Arc<AtomicUsize>) {
        let engine = MockEngine::new();
        let tracker = engine.tracker();
        let live_blocks = Arc::new(AtomicUsize::new(0));
        let guest = Self {
            memory: vec![0; MEMORY_SIZE],
            next_free: 8,
            live_blocks: live_blocks.clone(),
            blocks: HashMap::new(),
            engine,
            objects: HashMap::new(),
            next_object: 0x10_0000,
            trap_on: None,
        };
        (guest, tracker, live_blocks)
    }

    fn bump(&mut self, size: usize) -> i32 {
        let ptr = self.next_free;
        if ptr + size > self.memory.len() {
            return NULL;
        }
        self.next_free = (ptr + size + 7) & !7;
        ptr as i32
    }

    fn bytes(&self, ptr: i32, len: i32) -> Vec<u8> {
        let start = ptr as usize;
        self.memory[start..start + len as usize].to_vec()
    }

    fn word(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    fn object(&self, ptr: i32) -> Option<Handle> {
        self.objects.get(&ptr).copied()
    }

    fn register(&mut self, handle: Handle) -> i32 {
        let ptr = self.next_object;
        self.next_object += 16;
        self.objects.insert(ptr, handle);
        ptr
    }

    fn status(result: Result<()>) -> i32 {
        match result {
            Ok(()) => 0,
            Err(GlyphrunError::InvalidArgument(_)) => STATUS_INVALID,
            Err(_) => STATUS_NULL,
        }
    }

    fn with_object(&mut self, ptr: i32, f: impl FnOnce(&mut MockEngine, Handle) -> i32) -> i32 {
        match self.object(ptr) {
            Some(handle) => f(&mut self.engine, handle),
            None => STATUS_NULL,
        }
    }

    fn write_out(&mut self, bytes: &[u8]) -> i32 {
        let ptr = self.bump(bytes.len());
        if ptr != NULL {
            let start = ptr as usize;
            self.memory[start..start + bytes.len()].copy_from_slice(bytes);
        }
        ptr
    }

    fn face_count(&mut self, data: &[u8]) -> i32 {
        let mut count = 0;
        loop {
            match self.engine.font_new(data, count) {
                Ok(handle) => {
                    self.engine.font_free(handle);
                    count += 1;
                }
                Err(GlyphrunError::ResourceNotFound(_)) => return count as i32,
                Err(_) => return STATUS_INVALID,
            }
        }
    }

    fn features(&self, ptr: i32, count: i32) -> Vec<Feature> {
        let bytes = self.bytes(ptr, count * 16);
        bytes
            .chunks_exact(16)
            .map(|r| {
                Feature::new(Tag::from_u32(Self::word(r, 0)), Self::word(r, 4))
                    .with_range(Self::word(r, 8), Self::word(r, 12))
            })
            .collect()
    }

    fn variations(&self, ptr: i32, count: i32) -> Vec<Variation> {
        let bytes = self.bytes(ptr, count * 8);
        bytes
            .chunks_exact(8)
            .map(|r| {
                Variation::new(
                    Tag::from_u32(Self::word(r, 0)),
                    f32::from_bits(Self::word(r, 4)),
                )
            })
            .collect()
    }
}

impl SandboxHost for FakeGuest {
    fn call(&mut self, name: &str, args: &[i32]) -> Result<i32> {
        if self.trap_on == Some(name) {
            return Err(GlyphrunError::Sandbox(format!("{name}: unreachable")));
        }
        let arg = |i: usize| args.get(i).copied().unwrap_or(0);
        let ret = match name {
            "glyphrun_alloc" => {
                let ptr = self.bump(arg(0) as usize);
                if ptr != NULL {
                    self.blocks.insert(ptr as u32, arg(0) as usize);
                    self.live_blocks.fetch_add(1, Ordering::SeqCst);
                }
                ptr
            }
            "glyphrun_free" => {
                let size = self.blocks.remove(&(arg(0) as u32));
                assert_eq!(size, Some(arg(1) as usize), "freed with the wrong size");
                self.live_blocks.fetch_sub(1, Ordering::SeqCst);
                0
            }
            "glyphrun_buffer_new" => match self.engine.buffer_new() {
                Ok(handle) => self.register(handle),
                Err(_) => NULL,
            },
            "glyphrun_buffer_add_utf16" => {
                let bytes = self.bytes(arg(1), arg(2) * 2);
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|p| u16::from_le_bytes([p[0], p[1]]))
                    .collect();
                self.with_object(arg(0), |e, h| Self::status(e.buffer_add_utf16(h, &units)))
            }
            "glyphrun_buffer_clear" => {
                self.with_object(arg(0), |e, h| Self::status(e.buffer_clear(h)))
            }
            "glyphrun_buffer_len" => self.with_object(arg(0), |e, h| {
                e.buffer_len(h).map(|l| l as i32).unwrap_or(STATUS_NULL)
            }),
            "glyphrun_buffer_get_direction" => self.with_object(arg(0), |e, h| {
                e.buffer_direction(h).map(Direction::to_raw).unwrap_or(STATUS_NULL)
            }),
            "glyphrun_buffer_set_direction" => self.with_object(arg(0), |e, h| {
                Self::status(e.buffer_set_direction(h, Direction::from_raw(arg(1))))
            }),
            "glyphrun_buffer_get_script" => self.with_object(arg(0), |e, h| {
                e.buffer_script(h).map(|t| t.to_u32() as i32).unwrap_or(0)
            }),
            "glyphrun_buffer_set_script" => self.with_object(arg(0), |e, h| {
                Self::status(e.buffer_set_script(h, Tag::from_u32(arg(1) as u32)))
            }),
            "glyphrun_buffer_set_language" => {
                let bytes = self.bytes(arg(1), arg(2));
                match String::from_utf8(bytes) {
                    Ok(lang) => self.with_object(arg(0), |e, h| {
                        Self::status(e.buffer_set_language(h, &lang))
                    }),
                    Err(_) => STATUS_INVALID,
                }
            }
            "glyphrun_buffer_guess_segment_properties" => self.with_object(arg(0), |e, h| {
                Self::status(e.buffer_guess_segment_properties(h))
            }),
            "glyphrun_buffer_free" => {
                if let Some(h) = self.objects.remove(&arg(0)) {
                    self.engine.buffer_free(h);
                }
                0
            }
            "glyphrun_font_face_count" => {
                let data = self.bytes(arg(0), arg(1));
                self.face_count(&data)
            }
            "glyphrun_font_from_data_index" => {
                let data = self.bytes(arg(0), arg(1));
                match self.engine.font_new(&data, arg(2) as u32) {
                    Ok(handle) => self.register(handle),
                    Err(_) => NULL,
                }
            }
            "glyphrun_font_units_per_em" => self.with_object(arg(0), |e, h| {
                e.font_units_per_em(h).map(i32::from).unwrap_or(STATUS_NULL)
            }),
            "glyphrun_font_free" => {
                if let Some(h) = self.objects.remove(&arg(0)) {
                    self.engine.font_free(h);
                }
                0
            }
            "glyphrun_shape_full" => {
                let features = self.features(arg(2), arg(3));
                let variations = self.variations(arg(4), arg(5));
                let buffer = self.objects.remove(&arg(1));
                match (self.object(arg(0)), buffer) {
                    (Some(font), Some(buffer)) => {
                        match self.engine.shape(font, buffer, &features, &variations) {
                            Ok(glyphs) => self.register(glyphs),
                            Err(_) => NULL,
                        }
                    }
                    (None, Some(buffer)) => {
                        self.engine.buffer_free(buffer);
                        NULL
                    }
                    _ => NULL,
                }
            }
            "glyphrun_glyph_buffer_len" => self.with_object(arg(0), |e, h| {
                e.glyphs_len(h).map(|l| l as i32).unwrap_or(STATUS_NULL)
            }),
            "glyphrun_glyph_buffer_get_infos" => {
                let infos = self.object(arg(0)).and_then(|h| self.engine.glyphs_infos(h).ok());
                match infos {
                    Some(infos) => {
                        let bytes: Vec<u8> = infos
                            .iter()
                            .flat_map(|i| [i.glyph_id, i.cluster])
                            .flat_map(u32::to_le_bytes)
                            .collect();
                        self.write_out(&bytes)
                    }
                    None => NULL,
                }
            }
            "glyphrun_glyph_buffer_get_positions" => {
                let positions = self
                    .object(arg(0))
                    .and_then(|h| self.engine.glyphs_positions(h).ok());
                match positions {
                    Some(positions) => {
                        let bytes: Vec<u8> = positions
                            .iter()
                            .flat_map(|p| [p.x_advance, p.y_advance, p.x_offset, p.y_offset])
                            .flat_map(i32::to_le_bytes)
                            .collect();
                        self.write_out(&bytes)
                    }
                    None => NULL,
                }
            }
            "glyphrun_glyph_buffer_into_buffer" => match self.objects.remove(&arg(0)) {
                Some(h) => match self.engine.glyphs_into_buffer(h) {
                    Ok(buffer) => self.register(buffer),
                    Err(_) => NULL,
                },
                None => NULL,
            },
            "glyphrun_glyph_buffer_free" => {
                if let Some(h) = self.objects.remove(&arg(0)) {
                    self.engine.glyphs_free(h);
                }
                0
            }
            other => {
                return Err(GlyphrunError::ResourceNotFound(format!(
                    "guest export `{other}`"
                )))
            }
        };
        Ok(ret)
    }

    fn read(&mut self, ptr: u32, len: usize) -> Result<Vec<u8>> {
        let start = ptr as usize;
        self.memory
            .get(start..start + len)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| GlyphrunError::Sandbox("read out of bounds".to_string()))
    }

    fn write(&mut self, ptr: u32, bytes: &[u8]) -> Result<()> {
        let start = ptr as usize;
        let target = self
            .memory
            .get_mut(start..start + bytes.len())
            .ok_or_else(|| GlyphrunError::Sandbox("write out of bounds".to_string()))?;
        target.copy_from_slice(bytes);
        Ok(())
    }
}

fn sandboxed() -> (glyphrun_core::Backend, MockTracker, Arc<AtomicUsize>) {
    let (guest, tracker, blocks) = FakeGuest::new();
    (WasmBackend::from_host(guest), tracker, blocks)
}

#[test]
fn test_shape_hello_through_guest_memory() {
    let (backend, tracker, blocks) = sandboxed();
    assert_eq!(backend.kind(), BackendKind::Sandboxed);
    assert_eq!(backend.name(), "wasm");

    let font = backend.create_font(&font_bytes("Helo")).unwrap();
    assert_eq!(font.units_per_em().unwrap(), 1000);

    let mut buffer = backend.create_buffer().unwrap();
    buffer.add_str("Hello").unwrap();
    assert_eq!(buffer.len().unwrap(), 5);

    let glyphs = font.shape(&mut buffer).unwrap();
    assert_eq!(buffer.state(), BufferState::Consumed);

    let clusters: Vec<u32> = glyphs.infos().unwrap().iter().map(|i| i.cluster).collect();
    assert_eq!(clusters, vec![0, 1, 2, 3, 4]);
    assert_eq!(glyphs.infos().unwrap()[0].glyph_id, 'H' as u32);
    assert!(glyphs
        .positions()
        .unwrap()
        .iter()
        .all(|p| p.x_advance == COVERED_ADVANCE));

    drop(glyphs);
    drop(font);
    assert_eq!(tracker.live_glyphs(), 0);
    assert_eq!(tracker.live_fonts(), 0);
    assert_eq!(tracker.live_buffers(), 0);
    assert_eq!(blocks.load(Ordering::SeqCst), 0);
}

#[test]
fn test_clusters_continue_across_appends() {
    let (backend, _, _) = sandboxed();
    let font = backend.create_font(&font_bytes("AB")).unwrap();
    let mut buffer = backend.create_buffer().unwrap();
    buffer.add_str("A").unwrap();
    buffer.add_str("😀").unwrap();
    buffer.add_str("B").unwrap();

    let glyphs = font.shape(&mut buffer).unwrap();
    let clusters: Vec<u32> = glyphs.infos().unwrap().iter().map(|i| i.cluster).collect();
    assert_eq!(clusters, vec![0, 1, 3]);
    assert!(glyphs.infos().unwrap()[1].is_notdef());
}

#[test]
fn test_features_and_variations_cross_intact() {
    let (backend, tracker, blocks) = sandboxed();
    let font = backend.create_font(&font_bytes("x")).unwrap();
    let mut buffer = backend.create_buffer().unwrap();
    buffer.add_str("x").unwrap();

    let features = [
        Feature::disable(Tag::new(b"liga")),
        Feature::new(Tag::new(b"aalt"), 2).with_range(3, 5),
    ];
    let variations = [Variation::new(Tag::new(b"wght"), 650.5)];
    font.shape_with(&mut buffer, &features, &variations).unwrap();

    assert_eq!(tracker.last_features(), features.to_vec());
    assert_eq!(tracker.last_variations(), variations.to_vec());
    assert_eq!(blocks.load(Ordering::SeqCst), 0);
}

#[test]
fn test_segment_properties_round_trip() {
    let (backend, _, _) = sandboxed();
    let mut buffer = backend.create_buffer().unwrap();
    buffer.set_direction(Direction::RightToLeft).unwrap();
    buffer.set_script(Tag::new(b"Arab")).unwrap();
    buffer.set_language("ar").unwrap();
    assert_eq!(buffer.direction().unwrap(), Direction::RightToLeft);
    assert_eq!(buffer.script().unwrap(), Tag::new(b"Arab"));

    let err = buffer.set_language("not a tag!").unwrap_err();
    assert!(err.is_invalid_argument());

    let mut guessed = backend.create_buffer().unwrap();
    guessed.add_str("שלום").unwrap();
    guessed.guess_segment_properties().unwrap();
    assert_eq!(guessed.direction().unwrap(), Direction::RightToLeft);
}

#[test]
fn test_face_selection_in_collections() {
    let (backend, tracker, blocks) = sandboxed();
    let data = collection_bytes(&["a", "b"]);
    assert!(backend.create_font_index(&data, 1).is_ok());

    let err = backend.create_font_index(&data, 2).unwrap_err();
    assert!(matches!(err, GlyphrunError::ResourceNotFound(_)));
    assert_eq!(tracker.live_fonts(), 0);
    assert_eq!(blocks.load(Ordering::SeqCst), 0);
}

#[test]
fn test_garbage_font_data() {
    let (backend, _, blocks) = sandboxed();
    let err = backend.create_font(b"nope").unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(blocks.load(Ordering::SeqCst), 0);
}

#[test]
fn test_failed_shape_consumes_buffer() {
    let (backend, tracker, blocks) = sandboxed();
    let font = backend.create_font(&failing_font_bytes()).unwrap();
    let mut buffer = backend.create_buffer().unwrap();
    buffer.add_str("abc").unwrap();

    let err = font.shape(&mut buffer).unwrap_err();
    assert!(matches!(err, GlyphrunError::ShapingFailure(_)));
    assert_eq!(buffer.state(), BufferState::Consumed);
    assert_eq!(tracker.live_buffers(), 0);
    assert_eq!(blocks.load(Ordering::SeqCst), 0);
}

#[test]
fn test_trap_during_shape() {
    let (mut guest, _, blocks) = FakeGuest::new();
    guest.trap_on = Some("glyphrun_shape_full");
    let backend = WasmBackend::from_host(guest);

    let font = backend.create_font(&font_bytes("a")).unwrap();
    let mut buffer = backend.create_buffer().unwrap();
    buffer.add_str("a").unwrap();

    let err = font
        .shape_with(&mut buffer, &[Feature::enable(Tag::new(b"kern"))], &[])
        .unwrap_err();
    assert!(matches!(err, GlyphrunError::Sandbox(_)));
    assert!(!buffer.is_open());
    assert_eq!(blocks.load(Ordering::SeqCst), 0);
}

#[test]
fn test_into_buffer_through_guest() {
    let (backend, tracker, _) = sandboxed();
    let font = backend.create_font(&font_bytes("ab")).unwrap();
    let mut buffer = backend.create_buffer().unwrap();
    buffer.add_str("ab").unwrap();
    let glyphs = font.shape(&mut buffer).unwrap();

    let mut recycled = glyphs.into_buffer().unwrap();
    assert!(recycled.is_empty().unwrap());
    recycled.add_str("b").unwrap();
    let again = font.shape(&mut recycled).unwrap();
    assert_eq!(again.len().unwrap(), 1);
    assert_eq!(tracker.live_buffers(), 0);
}

#[test]
fn test_empty_buffer_shapes_to_nothing() {
    let (backend, _, _) = sandboxed();
    let font = backend.create_font(&font_bytes("a")).unwrap();
    let mut buffer = backend.create_buffer().unwrap();
    let glyphs = font.shape(&mut buffer).unwrap();
    assert!(glyphs.is_empty().unwrap());
    assert!(glyphs.infos().unwrap().is_empty());
}

#[test]
fn test_from_env_without_variable() {
    std::env::remove_var(glyphrun_wasm::MODULE_ENV);
    let err = WasmBackend::from_env().unwrap_err();
    assert!(matches!(err, GlyphrunError::ResourceNotFound(_)));
}
