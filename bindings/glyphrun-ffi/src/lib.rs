//! C ABI over the native engine
//!
//! Buffers, fonts and glyph buffers cross the boundary as opaque pointers.
//! The same exports serve two callers:
//!
//! - C, C#, or anything else with a C FFI, linking the `cdylib`
//! - `glyphrun-wasm`, which loads this crate compiled for
//!   `wasm32-unknown-unknown` and calls the exports with 32-bit arguments
//!
//! Conventions: a null pointer result means failure, `i32` results are
//! statuses (negative is an error, see [`GLYPHRUN_STATUS_OK`] and friends) or
//! non-negative values. Every `*_free` accepts null. Shaping always takes
//! ownership of the buffer, even when it fails.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::ffi::{c_char, CStr};
use std::slice;

use glyphrun_core::{Direction, Feature, GlyphInfo, GlyphPosition, Tag, Variation};
use glyphrun_native::{NativeBuffer, NativeFont, NativeGlyphs};

pub const GLYPHRUN_STATUS_OK: i32 = 0;
/// A required handle was null
pub const GLYPHRUN_STATUS_NULL_POINTER: i32 = -1;
/// An argument was rejected (bad tag, bad language, bad UTF-8, ...)
pub const GLYPHRUN_STATUS_INVALID_ARGUMENT: i32 = -2;

const ALLOC_ALIGN: usize = 8;

/// OpenType feature as laid out across the boundary (16 bytes)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct GlyphrunFeature {
    pub tag: u32,
    pub value: u32,
    pub start: u32,
    pub end: u32,
}

/// Variation axis setting as laid out across the boundary (8 bytes)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct GlyphrunVariation {
    pub tag: u32,
    pub value: f32,
}

impl From<GlyphrunFeature> for Feature {
    fn from(f: GlyphrunFeature) -> Self {
        Feature::new(Tag::from_u32(f.tag), f.value).with_range(f.start, f.end)
    }
}

impl From<GlyphrunVariation> for Variation {
    fn from(v: GlyphrunVariation) -> Self {
        Variation::new(Tag::from_u32(v.tag), v.value)
    }
}

fn status(result: glyphrun_core::Result<()>) -> i32 {
    match result {
        Ok(()) => GLYPHRUN_STATUS_OK,
        Err(err) => {
            log::debug!("rejected: {err}");
            GLYPHRUN_STATUS_INVALID_ARGUMENT
        }
    }
}

fn count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Borrows `len` items at `ptr`; null is fine when `len` is 0
unsafe fn items<'a, T>(ptr: *const T, len: usize) -> Option<&'a [T]> {
    if len == 0 {
        Some(&[])
    } else if ptr.is_null() {
        None
    } else {
        Some(slice::from_raw_parts(ptr, len))
    }
}

// =============================================================================
// Memory
// =============================================================================

/// Allocates `size` bytes for the caller to fill; 0 bytes yields null
#[no_mangle]
pub extern "C" fn glyphrun_alloc(size: usize) -> *mut u8 {
    match Layout::from_size_align(size, ALLOC_ALIGN) {
        Ok(layout) if size > 0 => unsafe { alloc::alloc(layout) },
        _ => std::ptr::null_mut(),
    }
}

/// # Safety
/// `ptr` must come from [`glyphrun_alloc`] with the same `size`, or be null.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_free(ptr: *mut u8, size: usize) {
    if ptr.is_null() {
        return;
    }
    if let Ok(layout) = Layout::from_size_align(size, ALLOC_ALIGN) {
        alloc::dealloc(ptr, layout);
    }
}

// =============================================================================
// Buffers
// =============================================================================

#[no_mangle]
pub extern "C" fn glyphrun_buffer_new() -> *mut NativeBuffer {
    Box::into_raw(Box::new(NativeBuffer::new()))
}

/// # Safety
/// `buffer` must be a live buffer; `text` must point to `len` code units.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_buffer_add_utf16(
    buffer: *mut NativeBuffer,
    text: *const u16,
    len: usize,
) -> i32 {
    let Some(buffer) = buffer.as_mut() else {
        return GLYPHRUN_STATUS_NULL_POINTER;
    };
    match items(text, len) {
        Some(units) => {
            buffer.add_utf16(units);
            GLYPHRUN_STATUS_OK
        }
        None => GLYPHRUN_STATUS_INVALID_ARGUMENT,
    }
}

/// Appends NUL-terminated UTF-8; clusters are still UTF-16 offsets
///
/// # Safety
/// `buffer` must be a live buffer; `text` must be a NUL-terminated string or null.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_buffer_add_str(
    buffer: *mut NativeBuffer,
    text: *const c_char,
) -> i32 {
    let Some(buffer) = buffer.as_mut() else {
        return GLYPHRUN_STATUS_NULL_POINTER;
    };
    if text.is_null() {
        return GLYPHRUN_STATUS_INVALID_ARGUMENT;
    }
    match CStr::from_ptr(text).to_str() {
        Ok(text) => {
            buffer.add_str(text);
            GLYPHRUN_STATUS_OK
        }
        Err(err) => {
            log::debug!("rejected text: {err}");
            GLYPHRUN_STATUS_INVALID_ARGUMENT
        }
    }
}

/// # Safety
/// `buffer` must be a live buffer or null.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_buffer_clear(buffer: *mut NativeBuffer) -> i32 {
    match buffer.as_mut() {
        Some(buffer) => {
            buffer.clear();
            GLYPHRUN_STATUS_OK
        }
        None => GLYPHRUN_STATUS_NULL_POINTER,
    }
}

/// Length in UTF-16 code units
///
/// # Safety
/// `buffer` must be a live buffer or null.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_buffer_len(buffer: *const NativeBuffer) -> i32 {
    buffer
        .as_ref()
        .map_or(GLYPHRUN_STATUS_NULL_POINTER, |b| count(b.len()))
}

/// # Safety
/// `buffer` must be a live buffer or null.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_buffer_get_direction(buffer: *const NativeBuffer) -> i32 {
    buffer
        .as_ref()
        .map_or(GLYPHRUN_STATUS_NULL_POINTER, |b| b.direction().to_raw())
}

/// # Safety
/// `buffer` must be a live buffer or null.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_buffer_set_direction(
    buffer: *mut NativeBuffer,
    direction: i32,
) -> i32 {
    match buffer.as_mut() {
        Some(buffer) => {
            buffer.set_direction(Direction::from_raw(direction));
            GLYPHRUN_STATUS_OK
        }
        None => GLYPHRUN_STATUS_NULL_POINTER,
    }
}

/// Script tag packed big-endian; 0 for a null buffer
///
/// # Safety
/// `buffer` must be a live buffer or null.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_buffer_get_script(buffer: *const NativeBuffer) -> u32 {
    buffer.as_ref().map_or(0, |b| b.script().to_u32())
}

/// # Safety
/// `buffer` must be a live buffer or null.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_buffer_set_script(buffer: *mut NativeBuffer, script: u32) -> i32 {
    match buffer.as_mut() {
        Some(buffer) => status(buffer.set_script(Tag::from_u32(script))),
        None => GLYPHRUN_STATUS_NULL_POINTER,
    }
}

/// Sets a BCP 47 language from `len` UTF-8 bytes
///
/// # Safety
/// `buffer` must be a live buffer; `language` must point to `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_buffer_set_language(
    buffer: *mut NativeBuffer,
    language: *const u8,
    len: usize,
) -> i32 {
    let Some(buffer) = buffer.as_mut() else {
        return GLYPHRUN_STATUS_NULL_POINTER;
    };
    let Some(bytes) = items(language, len) else {
        return GLYPHRUN_STATUS_INVALID_ARGUMENT;
    };
    match std::str::from_utf8(bytes) {
        Ok(language) if !language.is_empty() => status(buffer.set_language(language)),
        _ => GLYPHRUN_STATUS_INVALID_ARGUMENT,
    }
}

/// # Safety
/// `buffer` must be a live buffer or null.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_buffer_guess_segment_properties(
    buffer: *mut NativeBuffer,
) -> i32 {
    match buffer.as_mut() {
        Some(buffer) => {
            buffer.guess_segment_properties();
            GLYPHRUN_STATUS_OK
        }
        None => GLYPHRUN_STATUS_NULL_POINTER,
    }
}

/// # Safety
/// `buffer` must be a live buffer or null; it is invalid afterwards.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_buffer_free(buffer: *mut NativeBuffer) {
    if !buffer.is_null() {
        drop(Box::from_raw(buffer));
    }
}

// =============================================================================
// Fonts
// =============================================================================

/// Number of faces in `data`, or a negative status
///
/// # Safety
/// `data` must point to `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_font_face_count(data: *const u8, len: usize) -> i32 {
    match items(data, len) {
        Some(bytes) if !bytes.is_empty() => match NativeFont::face_count(bytes) {
            Ok(faces) => i32::try_from(faces).unwrap_or(i32::MAX),
            Err(_) => GLYPHRUN_STATUS_INVALID_ARGUMENT,
        },
        _ => GLYPHRUN_STATUS_INVALID_ARGUMENT,
    }
}

/// Copies `data` and parses face `index`; null on failure
///
/// # Safety
/// `data` must point to `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_font_from_data_index(
    data: *const u8,
    len: usize,
    index: u32,
) -> *mut NativeFont {
    let Some(bytes) = items(data, len) else {
        return std::ptr::null_mut();
    };
    match NativeFont::from_data_index(bytes, index) {
        Ok(font) => Box::into_raw(Box::new(font)),
        Err(err) => {
            log::debug!("font rejected: {err}");
            std::ptr::null_mut()
        }
    }
}

/// # Safety
/// `data` must point to `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_font_from_data(data: *const u8, len: usize) -> *mut NativeFont {
    glyphrun_font_from_data_index(data, len, 0)
}

/// # Safety
/// `font` must be a live font or null.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_font_units_per_em(font: *const NativeFont) -> i32 {
    font.as_ref()
        .map_or(GLYPHRUN_STATUS_NULL_POINTER, |f| i32::from(f.units_per_em()))
}

/// # Safety
/// `font` must be a live font or null; it is invalid afterwards.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_font_free(font: *mut NativeFont) {
    if !font.is_null() {
        drop(Box::from_raw(font));
    }
}

// =============================================================================
// Shaping
// =============================================================================

/// Shapes `buffer` with `font`, consuming `buffer` in every case
///
/// Returns null if either handle is null or shaping fails.
///
/// # Safety
/// `font` and `buffer` must be live or null; `features` and `variations`
/// must point to the given number of records.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_shape_full(
    font: *const NativeFont,
    buffer: *mut NativeBuffer,
    features: *const GlyphrunFeature,
    num_features: usize,
    variations: *const GlyphrunVariation,
    num_variations: usize,
) -> *mut NativeGlyphs {
    if buffer.is_null() {
        return std::ptr::null_mut();
    }
    let buffer = *Box::from_raw(buffer);
    let Some(font) = font.as_ref() else {
        return std::ptr::null_mut();
    };

    let (Some(features), Some(variations)) =
        (items(features, num_features), items(variations, num_variations))
    else {
        return std::ptr::null_mut();
    };
    let features: Vec<Feature> = features.iter().copied().map(Feature::from).collect();
    let variations: Vec<Variation> = variations.iter().copied().map(Variation::from).collect();

    match font.shape(buffer, &features, &variations) {
        Ok(glyphs) => Box::into_raw(Box::new(glyphs)),
        Err(err) => {
            log::debug!("shaping failed: {err}");
            std::ptr::null_mut()
        }
    }
}

/// # Safety
/// See [`glyphrun_shape_full`].
#[no_mangle]
pub unsafe extern "C" fn glyphrun_shape_with_features(
    font: *const NativeFont,
    buffer: *mut NativeBuffer,
    features: *const GlyphrunFeature,
    num_features: usize,
) -> *mut NativeGlyphs {
    glyphrun_shape_full(font, buffer, features, num_features, std::ptr::null(), 0)
}

/// # Safety
/// See [`glyphrun_shape_full`].
#[no_mangle]
pub unsafe extern "C" fn glyphrun_shape(
    font: *const NativeFont,
    buffer: *mut NativeBuffer,
) -> *mut NativeGlyphs {
    glyphrun_shape_full(font, buffer, std::ptr::null(), 0, std::ptr::null(), 0)
}

// =============================================================================
// Glyph buffers
// =============================================================================

/// # Safety
/// `glyphs` must be live or null.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_glyph_buffer_len(glyphs: *const NativeGlyphs) -> i32 {
    glyphs
        .as_ref()
        .map_or(GLYPHRUN_STATUS_NULL_POINTER, |g| count(g.len()))
}

/// Borrowed array of `len` infos, valid until the glyph buffer is freed
///
/// # Safety
/// `glyphs` must be live or null.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_glyph_buffer_get_infos(
    glyphs: *const NativeGlyphs,
) -> *const GlyphInfo {
    glyphs
        .as_ref()
        .map_or(std::ptr::null(), |g| g.infos().as_ptr())
}

/// Borrowed array of `len` positions, valid until the glyph buffer is freed
///
/// # Safety
/// `glyphs` must be live or null.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_glyph_buffer_get_positions(
    glyphs: *const NativeGlyphs,
) -> *const GlyphPosition {
    glyphs
        .as_ref()
        .map_or(std::ptr::null(), |g| g.positions().as_ptr())
}

/// Recycles the storage as an empty buffer; `glyphs` is invalid afterwards
///
/// # Safety
/// `glyphs` must be live or null.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_glyph_buffer_into_buffer(
    glyphs: *mut NativeGlyphs,
) -> *mut NativeBuffer {
    if glyphs.is_null() {
        return std::ptr::null_mut();
    }
    let glyphs = *Box::from_raw(glyphs);
    Box::into_raw(Box::new(glyphs.into_buffer()))
}

/// # Safety
/// `glyphs` must be live or null; it is invalid afterwards.
#[no_mangle]
pub unsafe extern "C" fn glyphrun_glyph_buffer_free(glyphs: *mut NativeGlyphs) {
    if !glyphs.is_null() {
        drop(Box::from_raw(glyphs));
    }
}
