//! OpenType tags, features and variations
//!
//! Tags are four ASCII bytes packed big-endian into a `u32`, the same
//! representation the engine expects on both sides of the boundary.

use std::fmt;
use std::str::FromStr;

use crate::error::{GlyphrunError, Result};

/// A 4-byte OpenType / ISO 15924 identifier such as `liga`, `wght` or `Latn`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Tag(u32);

impl Tag {
    /// Packs four bytes big-endian
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Tag(u32::from_be_bytes(*bytes))
    }

    pub const fn from_u32(raw: u32) -> Self {
        Tag(raw)
    }

    pub const fn to_u32(self) -> u32 {
        self.0
    }

    pub const fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Parses a tag, accepting exactly four printable ASCII characters
    pub fn parse(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 {
            return Err(GlyphrunError::InvalidArgument(format!(
                "tag `{s}` must be exactly 4 characters"
            )));
        }
        if !bytes.iter().all(|b| (0x20..=0x7e).contains(b)) {
            return Err(GlyphrunError::InvalidArgument(format!(
                "tag `{s}` contains non-printable or non-ASCII characters"
            )));
        }
        Ok(Tag::new(&[bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

impl FromStr for Tag {
    type Err = GlyphrunError;

    fn from_str(s: &str) -> Result<Self> {
        Tag::parse(s)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.to_bytes() {
            if (0x20..=0x7e).contains(&b) {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

impl From<[u8; 4]> for Tag {
    fn from(bytes: [u8; 4]) -> Self {
        Tag::new(&bytes)
    }
}

/// An OpenType feature setting, optionally limited to a code-unit range
///
/// `start..end` is half-open; the default range covers the whole buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Feature {
    pub tag: Tag,
    pub value: u32,
    pub start: u32,
    pub end: u32,
}

impl Feature {
    pub const GLOBAL_START: u32 = 0;
    pub const GLOBAL_END: u32 = u32::MAX;

    pub const fn new(tag: Tag, value: u32) -> Self {
        Self {
            tag,
            value,
            start: Self::GLOBAL_START,
            end: Self::GLOBAL_END,
        }
    }

    pub const fn enable(tag: Tag) -> Self {
        Self::new(tag, 1)
    }

    pub const fn disable(tag: Tag) -> Self {
        Self::new(tag, 0)
    }

    /// Limits the feature to `[start, end)` in code units
    pub const fn with_range(mut self, start: u32, end: u32) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn is_global(&self) -> bool {
        self.start == Self::GLOBAL_START && self.end == Self::GLOBAL_END
    }

    /// `ss01` through `ss20`
    pub fn stylistic_set(index: u8, enabled: bool) -> Result<Self> {
        if !(1..=20).contains(&index) {
            return Err(GlyphrunError::InvalidArgument(format!(
                "stylistic set index {index} is outside 1..=20"
            )));
        }
        let tag = Tag::new(&[b's', b's', b'0' + index / 10, b'0' + index % 10]);
        Ok(Self::new(tag, u32::from(enabled)))
    }

    /// `cv01` through `cv99`
    pub fn character_variant(index: u8, value: u32) -> Result<Self> {
        if !(1..=99).contains(&index) {
            return Err(GlyphrunError::InvalidArgument(format!(
                "character variant index {index} is outside 1..=99"
            )));
        }
        let tag = Tag::new(&[b'c', b'v', b'0' + index / 10, b'0' + index % 10]);
        Ok(Self::new(tag, value))
    }
}

impl FromStr for Feature {
    type Err = GlyphrunError;

    /// Parses the HarfBuzz feature syntax: `kern`, `+kern`, `-kern`,
    /// `kern=0`, `aalt=2`, `kern[3:5]`, `kern[3:]`, `kern[:5]`, `kern[3]`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || GlyphrunError::InvalidArgument(format!("malformed feature `{s}`"));
        let s = s.trim();

        let (mut value, rest) = match s.as_bytes().first() {
            Some(b'+') => (Some(1), &s[1..]),
            Some(b'-') => (Some(0), &s[1..]),
            Some(_) => (None, s),
            None => return Err(invalid()),
        };

        let (rest, explicit) = match rest.split_once('=') {
            Some((head, v)) => {
                let v: u32 = v.trim().parse().map_err(|_| invalid())?;
                (head.trim(), Some(v))
            }
            None => (rest, None),
        };
        if let Some(v) = explicit {
            if value.is_some() {
                return Err(invalid());
            }
            value = Some(v);
        }

        let (tag_str, range) = match rest.find('[') {
            Some(open) => {
                let close = rest.strip_suffix(']').ok_or_else(invalid)?;
                (&rest[..open], Some(&close[open + 1..]))
            }
            None => (rest, None),
        };

        let tag = Tag::parse(tag_str)?;
        let mut feature = Feature::new(tag, value.unwrap_or(1));

        if let Some(range) = range {
            let parse_bound = |b: &str| -> Result<Option<u32>> {
                let b = b.trim();
                if b.is_empty() {
                    Ok(None)
                } else {
                    b.parse().map(Some).map_err(|_| invalid())
                }
            };
            match range.split_once(':') {
                Some((a, b)) => {
                    feature.start = parse_bound(a)?.unwrap_or(Feature::GLOBAL_START);
                    feature.end = parse_bound(b)?.unwrap_or(Feature::GLOBAL_END);
                }
                None => {
                    let at = parse_bound(range)?.ok_or_else(invalid)?;
                    feature.start = at;
                    feature.end = at.saturating_add(1);
                }
            }
            if feature.start > feature.end {
                return Err(invalid());
            }
        }

        Ok(feature)
    }
}

/// A variable-font axis setting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Variation {
    pub tag: Tag,
    pub value: f32,
}

impl Variation {
    pub const fn new(tag: Tag, value: f32) -> Self {
        Self { tag, value }
    }
}

impl FromStr for Variation {
    type Err = GlyphrunError;

    /// Parses `wght=700`
    fn from_str(s: &str) -> Result<Self> {
        let (tag, value) = s
            .trim()
            .split_once('=')
            .ok_or_else(|| GlyphrunError::InvalidArgument(format!("malformed variation `{s}`")))?;
        let value: f32 = value.trim().parse().map_err(|_| {
            GlyphrunError::InvalidArgument(format!("variation value in `{s}` is not a number"))
        })?;
        if !value.is_finite() {
            return Err(GlyphrunError::InvalidArgument(format!(
                "variation value in `{s}` is not finite"
            )));
        }
        Ok(Variation::new(Tag::parse(tag.trim())?, value))
    }
}
