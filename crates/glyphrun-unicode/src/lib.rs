// this_file: crates/glyphrun-unicode/src/lib.rs

//! Text elements: user-perceived characters, addressed by UTF-16 offset.
//!
//! An element is an extended grapheme cluster as defined by UAX #29, so a
//! base letter with its combining marks is one element, and so is a surrogate
//! pair or an emoji ZWJ sequence. Offsets ("char indices") are UTF-16 code
//! units, the same unit shaping clusters use.
//!
//! ```
//! use glyphrun_unicode::TextElements;
//!
//! let elements = TextElements::new("A😀B");
//! assert_eq!(elements.start_offsets(), &[0, 1, 3]);
//! assert_eq!(elements.element_index_from_char_index(2).unwrap(), 1);
//! assert_eq!(elements.char_index_from_element_index(3).unwrap(), 4);
//! ```

use std::ops::Range;

use glyphrun_core::{GlyphrunError, Result};
use icu_segmenter::GraphemeClusterSegmenter;

/// Element boundaries of one piece of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextElements {
    starts: Vec<usize>,
    len: usize,
}

impl TextElements {
    pub fn new(text: &str) -> Self {
        let units: Vec<u16> = text.encode_utf16().collect();
        Self::from_utf16(&units)
    }

    /// Segments UTF-16 text; unpaired surrogates form elements of their own
    pub fn from_utf16(units: &[u16]) -> Self {
        let len = units.len();
        if len == 0 {
            return Self {
                starts: Vec::new(),
                len,
            };
        }
        let mut starts: Vec<usize> = GraphemeClusterSegmenter::new()
            .segment_utf16(units)
            .filter(|&boundary| boundary < len)
            .collect();
        starts.dedup();
        Self { starts, len }
    }

    /// Number of elements
    pub fn count(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Length of the text in UTF-16 code units
    pub fn len_utf16(&self) -> usize {
        self.len
    }

    /// Offset at which each element begins, ascending
    pub fn start_offsets(&self) -> &[usize] {
        &self.starts
    }

    /// The element containing code unit `char_index`
    ///
    /// The text length itself maps to [`count`](Self::count), the one-past-the
    /// end element.
    pub fn element_index_from_char_index(&self, char_index: usize) -> Result<usize> {
        if char_index > self.len {
            return Err(GlyphrunError::InvalidArgument(format!(
                "offset {char_index} is past the end of {} code units",
                self.len
            )));
        }
        if char_index == self.len {
            return Ok(self.count());
        }
        Ok(self.starts.partition_point(|&start| start <= char_index) - 1)
    }

    /// Where element `element_index` begins; `count()` maps to the text length
    pub fn char_index_from_element_index(&self, element_index: usize) -> Result<usize> {
        match element_index.cmp(&self.count()) {
            std::cmp::Ordering::Less => Ok(self.starts[element_index]),
            std::cmp::Ordering::Equal => Ok(self.len),
            std::cmp::Ordering::Greater => Err(GlyphrunError::InvalidArgument(format!(
                "element {element_index} is past the end of {} elements",
                self.count()
            ))),
        }
    }

    /// Code units covered by element `element_index`
    pub fn element_range(&self, element_index: usize) -> Option<Range<usize>> {
        let start = *self.starts.get(element_index)?;
        let end = self
            .starts
            .get(element_index + 1)
            .copied()
            .unwrap_or(self.len);
        Some(start..end)
    }

    /// Nearest element boundary at or before `offset`
    pub fn floor_boundary(&self, offset: usize) -> usize {
        if offset >= self.len {
            return self.len;
        }
        let idx = self.starts.partition_point(|&start| start <= offset);
        idx.checked_sub(1).map_or(0, |i| self.starts[i])
    }

    /// Nearest element boundary at or after `offset`, clamped to the length
    pub fn ceil_boundary(&self, offset: usize) -> usize {
        let idx = self.starts.partition_point(|&start| start < offset);
        self.starts.get(idx).copied().unwrap_or(self.len)
    }
}

/// Number of elements in `text`
pub fn count_elements(text: &str) -> usize {
    TextElements::new(text).count()
}

pub fn element_start_offsets(text: &str) -> Vec<usize> {
    TextElements::new(text).starts
}

pub fn element_index_from_char_index(text: &str, char_index: usize) -> Result<usize> {
    TextElements::new(text).element_index_from_char_index(char_index)
}

pub fn char_index_from_element_index(text: &str, element_index: usize) -> Result<usize> {
    TextElements::new(text).char_index_from_element_index(element_index)
}


#[cfg(test)]
mod proptests;
