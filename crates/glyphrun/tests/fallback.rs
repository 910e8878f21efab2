//! Font fallback over mock fonts
//!
//! Mock fonts cover an explicit set of characters and emit one glyph per
//! character, so expected clusters and fonts can be read straight off the text.

use glyphrun::{
    shape_with_fallback, Backend, FallbackOptions, Feature, Font, FontFallback, GlyphrunError,
    RunBoundary, ShapedGlyph, Tag,
};
use glyphrun_core::testing::{failing_font_bytes, font_bytes, MockEngine, MockTracker};
use glyphrun_core::{
    BackendKind, Direction, GlyphInfo, GlyphPosition, Handle, Result, ShapingEngine, Variation,
};

const LATIN: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

fn mock() -> (Backend, MockTracker) {
    let engine = MockEngine::new();
    let tracker = engine.tracker();
    (Backend::new(engine), tracker)
}

fn clusters(glyphs: &[ShapedGlyph<'_>]) -> Vec<u32> {
    glyphs.iter().map(|g| g.info.cluster).collect()
}

fn font_indices(glyphs: &[ShapedGlyph<'_>]) -> Vec<usize> {
    glyphs.iter().map(|g| g.font_index).collect()
}

#[test]
fn test_emoji_falls_back() {
    let (backend, _) = mock();
    let primary = backend.create_font(&font_bytes(LATIN)).unwrap();
    let emoji = backend.create_font(&font_bytes("😀")).unwrap();

    let glyphs = shape_with_fallback("A😀", &primary, &[&emoji], &[], &[]).unwrap();
    assert!(glyphs.len() >= 2);

    let first = glyphs.iter().find(|g| g.info.cluster == 0).unwrap();
    assert!(std::ptr::eq(first.font, &primary));
    let second = glyphs.iter().find(|g| g.info.cluster == 1).unwrap();
    assert!(std::ptr::eq(second.font, &emoji));
    assert!(!second.is_missing());
}

#[test]
fn test_clusters_stay_in_original_text() {
    let (backend, _) = mock();
    let primary = backend.create_font(&font_bytes(LATIN)).unwrap();
    let emoji = backend.create_font(&font_bytes("😀")).unwrap();

    let glyphs = shape_with_fallback("A😀😀B😀C😀", &primary, &[&emoji], &[], &[]).unwrap();
    assert_eq!(clusters(&glyphs), vec![0, 1, 3, 5, 6, 8, 9]);
    assert_eq!(font_indices(&glyphs), vec![0, 1, 1, 0, 1, 0, 1]);

    let fonts: Vec<&Font> = glyphs.iter().map(|g| g.font).collect();
    assert!(std::ptr::eq(fonts[1], &emoji));
    assert!(std::ptr::eq(fonts[3], &primary));
    assert!(glyphs.iter().all(|g| !g.is_missing()));
}

#[test]
fn test_empty_text_shapes_nothing() {
    let (backend, tracker) = mock();
    let primary = backend.create_font(&font_bytes(LATIN)).unwrap();
    let glyphs = shape_with_fallback("", &primary, &[], &[], &[]).unwrap();
    assert!(glyphs.is_empty());
    assert_eq!(tracker.shape_calls(), 0);
}

#[test]
fn test_sole_font_keeps_missing_glyphs() {
    let (backend, tracker) = mock();
    let primary = backend.create_font(&font_bytes(LATIN)).unwrap();

    let glyphs = FontFallback::new(&primary).shape("A😀").unwrap();
    assert_eq!(clusters(&glyphs), vec![0, 1]);
    assert!(glyphs[1].is_missing());
    assert_eq!(glyphs[1].font_index, 0);
    assert_eq!(tracker.shape_calls(), 1);
}

#[test]
fn test_unresolved_glyphs_report_last_font_tried() {
    let (backend, _) = mock();
    let primary = backend.create_font(&font_bytes(LATIN)).unwrap();
    let emoji = backend.create_font(&font_bytes("😀")).unwrap();

    let glyphs = FontFallback::new(&primary)
        .fallback(&emoji)
        .shape("A☃")
        .unwrap();
    assert_eq!(clusters(&glyphs), vec![0, 1]);
    assert!(glyphs[1].is_missing());
    assert!(std::ptr::eq(glyphs[1].font, &emoji));
}

#[test]
fn test_three_font_chain() {
    let (backend, tracker) = mock();
    let primary = backend.create_font(&font_bytes(LATIN)).unwrap();
    let emoji = backend.create_font(&font_bytes("😀")).unwrap();
    let symbols = backend.create_font(&font_bytes("☃")).unwrap();

    let glyphs = FontFallback::new(&primary)
        .fallbacks([&emoji, &symbols])
        .shape("A😀☃b")
        .unwrap();
    assert_eq!(clusters(&glyphs), vec![0, 1, 3, 4]);
    assert_eq!(font_indices(&glyphs), vec![0, 1, 2, 0]);
    // primary pass, one emoji pass over "😀☃", one symbol pass over "☃"
    assert_eq!(tracker.shape_calls(), 3);
}

#[test]
fn test_adjacent_missing_glyphs_form_one_run() {
    let (backend, tracker) = mock();
    let primary = backend.create_font(&font_bytes(LATIN)).unwrap();
    let emoji = backend.create_font(&font_bytes("😀")).unwrap();

    shape_with_fallback("😀😀😀", &primary, &[&emoji], &[], &[]).unwrap();
    assert_eq!(tracker.shape_calls(), 2);
}

#[test]
fn test_right_to_left_order_is_kept() {
    let (backend, _) = mock();
    let hebrew = backend.create_font(&font_bytes("אב")).unwrap();
    let emoji = backend.create_font(&font_bytes("😀")).unwrap();

    // The mock emits RTL runs reversed, like a real shaper
    let glyphs = shape_with_fallback("אב😀", &hebrew, &[&emoji], &[], &[]).unwrap();
    assert_eq!(clusters(&glyphs), vec![2, 1, 0]);
    assert_eq!(font_indices(&glyphs), vec![1, 0, 0]);
}

#[test]
fn test_fonts_from_different_backends() {
    let (native_like, _) = mock();
    let (sandbox_like, sandbox_tracker) = mock();
    let primary = native_like.create_font(&font_bytes(LATIN)).unwrap();
    let emoji = sandbox_like.create_font(&font_bytes("😀")).unwrap();

    let glyphs = shape_with_fallback("x😀", &primary, &[&emoji], &[], &[]).unwrap();
    assert_eq!(font_indices(&glyphs), vec![0, 1]);
    assert_eq!(sandbox_tracker.shape_calls(), 1);
    assert_eq!(sandbox_tracker.live_buffers(), 0);
}

#[test]
fn test_code_point_boundary_splits_combining_marks() {
    let (backend, _) = mock();
    let primary = backend.create_font(&font_bytes("ex")).unwrap();
    let accents = backend.create_font(&font_bytes("e\u{301}")).unwrap();

    let glyphs = shape_with_fallback("e\u{301}x", &primary, &[&accents], &[], &[]).unwrap();
    assert_eq!(clusters(&glyphs), vec![0, 1, 2]);
    assert_eq!(font_indices(&glyphs), vec![0, 1, 0]);
}

#[test]
fn test_grapheme_boundary_keeps_clusters_together() {
    let (backend, _) = mock();
    let primary = backend.create_font(&font_bytes("ex")).unwrap();
    let accents = backend.create_font(&font_bytes("e\u{301}")).unwrap();

    let glyphs = FontFallback::new(&primary)
        .fallback(&accents)
        .boundary(RunBoundary::Grapheme)
        .shape("e\u{301}x")
        .unwrap();
    assert_eq!(clusters(&glyphs), vec![0, 1, 2]);
    assert_eq!(font_indices(&glyphs), vec![1, 1, 0]);
}

#[test]
fn test_ranged_features_follow_the_sub_range() {
    let (backend, tracker) = mock();
    let primary = backend.create_font(&font_bytes(LATIN)).unwrap();
    let emoji = backend.create_font(&font_bytes("😀")).unwrap();
    let kern = Feature::enable(Tag::new(b"kern")).with_range(2, 4);
    let liga = Feature::disable(Tag::new(b"liga"));

    let options = FallbackOptions {
        features: vec![kern, liga],
        ..FallbackOptions::default()
    };
    FontFallback::new(&primary)
        .fallback(&emoji)
        .options(options)
        .shape("AB😀")
        .unwrap();

    // The last pass shaped "😀", which starts at offset 2
    assert_eq!(
        tracker.last_features(),
        vec![kern.with_range(0, 2), liga]
    );
}

#[test]
fn test_engine_failure_propagates_without_leaks() {
    let (backend, tracker) = mock();
    let primary = backend.create_font(&font_bytes(LATIN)).unwrap();
    let broken = backend.create_font(&failing_font_bytes()).unwrap();

    let err = shape_with_fallback("A😀", &primary, &[&broken], &[], &[]).unwrap_err();
    assert!(matches!(err, GlyphrunError::ShapingFailure(_)));
    assert_eq!(tracker.live_buffers(), 0);
    assert_eq!(tracker.live_glyphs(), 0);
}

#[test]
fn test_intermediate_results_are_released() {
    let (backend, tracker) = mock();
    let primary = backend.create_font(&font_bytes(LATIN)).unwrap();
    let emoji = backend.create_font(&font_bytes("😀")).unwrap();

    let glyphs = shape_with_fallback("A😀B😀", &primary, &[&emoji], &[], &[]).unwrap();
    assert_eq!(glyphs.len(), 4);
    assert_eq!(tracker.live_buffers(), 0);
    assert_eq!(tracker.live_glyphs(), 0);
}

#[test]
fn test_disposed_primary_is_rejected() {
    let (backend, _) = mock();
    let mut primary = backend.create_font(&font_bytes(LATIN)).unwrap();
    primary.dispose();
    let err = FontFallback::new(&primary).shape("A").unwrap_err();
    assert!(err.is_invalid_state());
}

/// Adds a fixed amount to every cluster the mock engine reports
struct SkewedClusters {
    inner: MockEngine,
    skew: u32,
}

impl ShapingEngine for SkewedClusters {
    fn name(&self) -> &'static str {
        "skewed"
    }
    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }
    fn buffer_new(&mut self) -> Result<Handle> {
        self.inner.buffer_new()
    }
    fn buffer_add_utf16(&mut self, buffer: Handle, text: &[u16]) -> Result<()> {
        self.inner.buffer_add_utf16(buffer, text)
    }
    fn buffer_clear(&mut self, buffer: Handle) -> Result<()> {
        self.inner.buffer_clear(buffer)
    }
    fn buffer_len(&mut self, buffer: Handle) -> Result<usize> {
        self.inner.buffer_len(buffer)
    }
    fn buffer_direction(&mut self, buffer: Handle) -> Result<Direction> {
        self.inner.buffer_direction(buffer)
    }
    fn buffer_set_direction(&mut self, buffer: Handle, direction: Direction) -> Result<()> {
        self.inner.buffer_set_direction(buffer, direction)
    }
    fn buffer_script(&mut self, buffer: Handle) -> Result<Tag> {
        self.inner.buffer_script(buffer)
    }
    fn buffer_set_script(&mut self, buffer: Handle, script: Tag) -> Result<()> {
        self.inner.buffer_set_script(buffer, script)
    }
    fn buffer_set_language(&mut self, buffer: Handle, language: &str) -> Result<()> {
        self.inner.buffer_set_language(buffer, language)
    }
    fn buffer_guess_segment_properties(&mut self, buffer: Handle) -> Result<()> {
        self.inner.buffer_guess_segment_properties(buffer)
    }
    fn buffer_free(&mut self, buffer: Handle) {
        self.inner.buffer_free(buffer);
    }
    fn font_new(&mut self, data: &[u8], index: u32) -> Result<Handle> {
        self.inner.font_new(data, index)
    }
    fn font_units_per_em(&mut self, font: Handle) -> Result<u16> {
        self.inner.font_units_per_em(font)
    }
    fn font_free(&mut self, font: Handle) {
        self.inner.font_free(font);
    }
    fn shape(
        &mut self,
        font: Handle,
        buffer: Handle,
        features: &[Feature],
        variations: &[Variation],
    ) -> Result<Handle> {
        self.inner.shape(font, buffer, features, variations)
    }
    fn glyphs_len(&mut self, glyphs: Handle) -> Result<usize> {
        self.inner.glyphs_len(glyphs)
    }
    fn glyphs_infos(&mut self, glyphs: Handle) -> Result<Vec<GlyphInfo>> {
        let mut infos = self.inner.glyphs_infos(glyphs)?;
        for info in &mut infos {
            info.cluster = info.cluster.wrapping_add(self.skew);
        }
        Ok(infos)
    }
    fn glyphs_positions(&mut self, glyphs: Handle) -> Result<Vec<GlyphPosition>> {
        self.inner.glyphs_positions(glyphs)
    }
    fn glyphs_into_buffer(&mut self, glyphs: Handle) -> Result<Handle> {
        self.inner.glyphs_into_buffer(glyphs)
    }
    fn glyphs_free(&mut self, glyphs: Handle) {
        self.inner.glyphs_free(glyphs);
    }
}

fn skewed(skew: u32) -> (Backend, MockTracker) {
    let inner = MockEngine::new();
    let tracker = inner.tracker();
    (Backend::new(SkewedClusters { inner, skew }), tracker)
}

#[test]
fn test_out_of_range_clusters_are_a_shaping_failure() {
    for skew in [10, 2, u32::MAX] {
        let (backend, tracker) = skewed(skew);
        let primary = backend.create_font(&font_bytes("A")).unwrap();
        let fallback = backend.create_font(&font_bytes("B")).unwrap();

        let err = shape_with_fallback("AB", &primary, &[&fallback], &[], &[]).unwrap_err();
        assert!(matches!(err, GlyphrunError::ShapingFailure(_)), "skew {skew}: {err:?}");
        assert_eq!(tracker.live_buffers(), 0);
        assert_eq!(tracker.live_glyphs(), 0);
    }
}
