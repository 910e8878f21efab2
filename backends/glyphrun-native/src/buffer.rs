//! Text waiting to be shaped, held in harfrust's own buffer type

use std::str::FromStr;

use harfrust::{Direction as HrDirection, Language, Script, Tag as HrTag, UnicodeBuffer};

use glyphrun_core::{Direction, GlyphrunError, Result, Tag};

/// harfrust's `UnicodeBuffer` plus a running UTF-16 length
///
/// harfrust counts characters; sessions count code units, and clusters must
/// keep counting across appends, so the offset is tracked here.
pub struct NativeBuffer {
    inner: UnicodeBuffer,
    code_units: u32,
}

impl NativeBuffer {
    pub fn new() -> Self {
        Self::from_unicode(UnicodeBuffer::new())
    }

    pub(crate) fn from_unicode(inner: UnicodeBuffer) -> Self {
        Self {
            inner,
            code_units: 0,
        }
    }

    pub(crate) fn into_unicode(self) -> UnicodeBuffer {
        self.inner
    }

    /// Appends UTF-16; each character is clustered at its code-unit offset
    pub fn add_utf16(&mut self, units: &[u16]) {
        for decoded in char::decode_utf16(units.iter().copied()) {
            let (ch, width) = match decoded {
                Ok(ch) => (ch, ch.len_utf16() as u32),
                Err(_) => (char::REPLACEMENT_CHARACTER, 1),
            };
            self.inner.add(ch, self.code_units);
            self.code_units += width;
        }
    }

    pub fn add_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.inner.add(ch, self.code_units);
            self.code_units += ch.len_utf16() as u32;
        }
    }

    /// Length in UTF-16 code units
    pub fn len(&self) -> usize {
        self.code_units as usize
    }

    pub fn is_empty(&self) -> bool {
        self.code_units == 0
    }

    pub fn clear(&mut self) {
        self.inner.clear();
        self.code_units = 0;
    }

    pub fn direction(&self) -> Direction {
        from_hr_direction(self.inner.direction())
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.inner.set_direction(to_hr_direction(direction));
    }

    pub fn script(&self) -> Tag {
        Tag::new(&self.inner.script().tag().into_bytes())
    }

    /// Accepts any ISO 15924 tag harfrust knows
    pub fn set_script(&mut self, script: Tag) -> Result<()> {
        let tag = HrTag::new(&script.to_bytes());
        let script = Script::from_iso15924_tag(tag).ok_or_else(|| {
            GlyphrunError::InvalidArgument(format!("`{script}` is not a known ISO 15924 script"))
        })?;
        self.inner.set_script(script);
        Ok(())
    }

    pub fn set_language(&mut self, language: &str) -> Result<()> {
        let parsed = Language::from_str(language).map_err(|_| {
            GlyphrunError::InvalidArgument(format!("`{language}` is not a BCP 47 tag"))
        })?;
        self.inner.set_language(parsed);
        Ok(())
    }

    pub fn guess_segment_properties(&mut self) {
        self.inner.guess_segment_properties();
    }

    /// Shaping needs a direction; guess one if the caller never set it
    pub(crate) fn prepare(&mut self) {
        if self.inner.direction() == HrDirection::Invalid {
            self.inner.guess_segment_properties();
        }
    }
}

impl Default for NativeBuffer {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn to_hr_direction(dir: Direction) -> HrDirection {
    match dir {
        Direction::Invalid => HrDirection::Invalid,
        Direction::LeftToRight => HrDirection::LeftToRight,
        Direction::RightToLeft => HrDirection::RightToLeft,
        Direction::TopToBottom => HrDirection::TopToBottom,
        Direction::BottomToTop => HrDirection::BottomToTop,
    }
}

pub(crate) fn from_hr_direction(dir: HrDirection) -> Direction {
    match dir {
        HrDirection::Invalid => Direction::Invalid,
        HrDirection::LeftToRight => Direction::LeftToRight,
        HrDirection::RightToLeft => Direction::RightToLeft,
        HrDirection::TopToBottom => Direction::TopToBottom,
        HrDirection::BottomToTop => Direction::BottomToTop,
    }
}
