//! Font fallback: re-shape what the primary font could not
//!
//! The text is shaped with the first font. Every maximal run of `.notdef`
//! glyphs is mapped back to the source range it came from, re-shaped with
//! the next font, and spliced in where the run was. Recursion stops at the
//! last font; whatever is still missing there is returned as glyph 0.
//!
//! Clusters in the output are always offsets into the original text, however
//! deep the recursion went.
//!
//! ## Run boundaries
//!
//! With [`RunBoundary::CodePoint`] (the default) a run is widened only so
//! that it never splits a surrogate pair. A base letter and a combining mark
//! can therefore end up shaped by different fonts. [`RunBoundary::Grapheme`]
//! widens runs to whole grapheme clusters instead; glyphs of a cluster that
//! contains any missing glyph are re-shaped together.

use glyphrun_core::{
    Feature, Font, GlyphInfo, GlyphPosition, GlyphrunError, Result, Variation,
};
use glyphrun_unicode::TextElements;

/// How far a missing-glyph run is widened before it is re-shaped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunBoundary {
    /// Never split a surrogate pair
    #[default]
    CodePoint,
    /// Never split a grapheme cluster
    Grapheme,
}

/// Settings shared by every pass of a fallback shape
#[derive(Debug, Clone, Default)]
pub struct FallbackOptions {
    pub boundary: RunBoundary,
    /// Ranges are offsets into the full text
    pub features: Vec<Feature>,
    pub variations: Vec<Variation>,
}

/// One output glyph and the font that produced it
#[derive(Debug, Clone, Copy)]
pub struct ShapedGlyph<'a> {
    /// Cluster is an offset into the original text
    pub info: GlyphInfo,
    pub position: GlyphPosition,
    pub font: &'a Font,
    /// Position of `font` in the chain; 0 is the primary font
    pub font_index: usize,
}

impl ShapedGlyph<'_> {
    /// No font in the chain had a glyph for this input
    pub fn is_missing(&self) -> bool {
        self.info.is_notdef()
    }

    pub fn cluster(&self) -> u32 {
        self.info.cluster
    }
}

/// A primary font plus an ordered list of fallbacks
#[derive(Debug, Clone)]
pub struct FontFallback<'a> {
    fonts: Vec<&'a Font>,
    options: FallbackOptions,
}

impl<'a> FontFallback<'a> {
    pub fn new(primary: &'a Font) -> Self {
        Self {
            fonts: vec![primary],
            options: FallbackOptions::default(),
        }
    }

    /// Appends a font to try after the ones already added
    pub fn fallback(mut self, font: &'a Font) -> Self {
        self.fonts.push(font);
        self
    }

    pub fn fallbacks(mut self, fonts: impl IntoIterator<Item = &'a Font>) -> Self {
        self.fonts.extend(fonts);
        self
    }

    pub fn options(mut self, options: FallbackOptions) -> Self {
        self.options = options;
        self
    }

    pub fn boundary(mut self, boundary: RunBoundary) -> Self {
        self.options.boundary = boundary;
        self
    }

    pub fn fonts(&self) -> &[&'a Font] {
        &self.fonts
    }

    /// Shapes `text` through the chain
    pub fn shape(&self, text: &str) -> Result<Vec<ShapedGlyph<'a>>> {
        let units: Vec<u16> = text.encode_utf16().collect();
        self.shape_utf16(&units)
    }

    pub fn shape_utf16(&self, units: &[u16]) -> Result<Vec<ShapedGlyph<'a>>> {
        if units.is_empty() {
            return Ok(Vec::new());
        }
        let elements = match self.options.boundary {
            RunBoundary::CodePoint => None,
            RunBoundary::Grapheme => Some(TextElements::from_utf16(units)),
        };
        let pass = Pass {
            units,
            fonts: &self.fonts,
            options: &self.options,
            elements,
        };
        pass.shape_range(0, 0, units.len())
    }
}

/// Shapes `text` with `primary`, falling back through `fallbacks` in order
pub fn shape_with_fallback<'a>(
    text: &str,
    primary: &'a Font,
    fallbacks: &[&'a Font],
    features: &[Feature],
    variations: &[Variation],
) -> Result<Vec<ShapedGlyph<'a>>> {
    FontFallback::new(primary)
        .fallbacks(fallbacks.iter().copied())
        .options(FallbackOptions {
            boundary: RunBoundary::CodePoint,
            features: features.to_vec(),
            variations: variations.to_vec(),
        })
        .shape(text)
}

struct Pass<'a, 'p> {
    units: &'p [u16],
    fonts: &'p [&'a Font],
    options: &'p FallbackOptions,
    elements: Option<TextElements>,
}

impl<'a> Pass<'a, '_> {
    /// Shapes `units[start..end]` with font `index` and everything after it
    fn shape_range(&self, index: usize, start: usize, end: usize) -> Result<Vec<ShapedGlyph<'a>>> {
        let font = self.fonts[index];
        let glyphs = self.shape_once(font, index, start, end)?;
        if index + 1 == self.fonts.len() {
            return Ok(glyphs);
        }

        let tainted = self.tainted_elements(&glyphs);
        let mut out = Vec::with_capacity(glyphs.len());
        let mut i = 0;
        while i < glyphs.len() {
            if !self.needs_fallback(&glyphs[i], &tainted) {
                out.push(glyphs[i]);
                i += 1;
                continue;
            }
            let run_start = i;
            while i < glyphs.len() && self.needs_fallback(&glyphs[i], &tainted) {
                i += 1;
            }
            let run = &glyphs[run_start..i];
            let (sub_start, sub_end) = self.run_range(run);
            let next = index + 1;
            log::debug!(
                "font {index}: {} missing, re-shaping [{sub_start}, {sub_end}) with font {next}",
                run.len()
            );
            out.extend(self.shape_range(next, sub_start, sub_end)?);
        }
        Ok(out)
    }

    fn shape_once(
        &self,
        font: &'a Font,
        index: usize,
        start: usize,
        end: usize,
    ) -> Result<Vec<ShapedGlyph<'a>>> {
        let mut buffer = font.backend().create_buffer()?;
        buffer.add_utf16(&self.units[start..end])?;
        buffer.guess_segment_properties()?;

        let features = rebase_features(&self.options.features, start);
        let result = font.shape_with(&mut buffer, &features, &self.options.variations)?;
        let len = end - start;
        let glyphs: Result<Vec<ShapedGlyph<'a>>> = result
            .glyphs()?
            .map(|(mut info, position)| {
                // Clusters must point into the text this pass shaped
                let local = info.cluster as usize;
                if local >= len {
                    return Err(GlyphrunError::ShapingFailure(format!(
                        "font {index} reported cluster {local} outside [0, {len})"
                    )));
                }
                info.cluster = u32::try_from(start + local).map_err(|_| {
                    GlyphrunError::ShapingFailure(format!("cluster {local} + {start} overflows"))
                })?;
                Ok(ShapedGlyph {
                    info,
                    position,
                    font,
                    font_index: index,
                })
            })
            .collect();
        glyphs
    }

    /// Elements (grapheme mode only) that contain at least one missing glyph
    fn tainted_elements(&self, glyphs: &[ShapedGlyph<'_>]) -> Vec<usize> {
        let Some(elements) = &self.elements else {
            return Vec::new();
        };
        let mut tainted: Vec<usize> = glyphs
            .iter()
            .filter(|g| g.is_missing())
            .filter_map(|g| elements.element_index_from_char_index(g.cluster() as usize).ok())
            .collect();
        tainted.sort_unstable();
        tainted.dedup();
        tainted
    }

    fn needs_fallback(&self, glyph: &ShapedGlyph<'_>, tainted: &[usize]) -> bool {
        if glyph.is_missing() {
            return true;
        }
        match &self.elements {
            None => false,
            Some(elements) => elements
                .element_index_from_char_index(glyph.cluster() as usize)
                .map(|element| tainted.binary_search(&element).is_ok())
                .unwrap_or(false),
        }
    }

    /// Source range of a run of glyphs, widened per the boundary rule
    fn run_range(&self, run: &[ShapedGlyph<'_>]) -> (usize, usize) {
        // Runs are never empty
        let min = run.iter().map(|g| g.cluster() as usize).min().unwrap_or(0);
        let max = run.iter().map(|g| g.cluster() as usize).max().unwrap_or(min);
        let end = self.char_end(max);
        match &self.elements {
            None => (min, end),
            Some(elements) => (elements.floor_boundary(min), elements.ceil_boundary(end)),
        }
    }

    /// End of the code point starting at `offset`, clamped to the text
    fn char_end(&self, offset: usize) -> usize {
        let len = self.units.len();
        let is_high = |u: u16| (0xD800..=0xDBFF).contains(&u);
        let is_low = |u: u16| (0xDC00..=0xDFFF).contains(&u);
        let width = match (self.units.get(offset), self.units.get(offset + 1)) {
            (Some(&hi), Some(&lo)) if is_high(hi) && is_low(lo) => 2,
            _ => 1,
        };
        (offset + width).min(len)
    }
}

/// Shifts ranged features into the coordinates of a sub-range at `offset`
fn rebase_features(features: &[Feature], offset: usize) -> Vec<Feature> {
    let offset = offset as u32;
    features
        .iter()
        .map(|feature| {
            if offset == 0 || feature.is_global() {
                return *feature;
            }
            let end = if feature.end == Feature::GLOBAL_END {
                Feature::GLOBAL_END
            } else {
                feature.end.saturating_sub(offset)
            };
            feature.with_range(feature.start.saturating_sub(offset), end)
        })
        .collect()
}
