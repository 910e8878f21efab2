//! Font data owned by the native engine, and the shape call itself

use harfrust::{
    Feature as HrFeature, FontRef as HrFontRef, ShaperData, ShaperInstance, Tag as HrTag,
    Variation as HrVariation,
};
use read_fonts::{FileRef, FontRef as ReadFontRef, TableProvider};

use glyphrun_core::{Feature, GlyphrunError, Result, Variation};

use crate::{buffer::NativeBuffer, glyphs::NativeGlyphs};

/// A private copy of font bytes plus the face to use
///
/// harfrust borrows from the bytes, so the parsed views are rebuilt for each
/// shape call instead of being stored next to the data.
#[derive(Debug)]
pub struct NativeFont {
    data: Vec<u8>,
    face_index: u32,
    units_per_em: u16,
}

impl NativeFont {
    /// How many faces `data` holds (1 for a plain font file)
    pub fn face_count(data: &[u8]) -> Result<u32> {
        match FileRef::new(data) {
            Ok(FileRef::Font(_)) => Ok(1),
            Ok(FileRef::Collection(collection)) => Ok(collection.len()),
            Err(err) => Err(GlyphrunError::InvalidArgument(format!(
                "font data could not be parsed: {err}"
            ))),
        }
    }

    /// Copies `data` and validates face `face_index`
    pub fn from_data_index(data: &[u8], face_index: u32) -> Result<Self> {
        if data.is_empty() {
            return Err(GlyphrunError::InvalidArgument("font data is empty".into()));
        }
        let faces = Self::face_count(data)?;
        if face_index >= faces {
            return Err(GlyphrunError::ResourceNotFound(format!(
                "face {face_index} (collection has {faces})"
            )));
        }

        let face = ReadFontRef::from_index(data, face_index).map_err(|err| {
            GlyphrunError::InvalidArgument(format!("face {face_index} is malformed: {err}"))
        })?;
        // Verify harfrust accepts the face too before keeping it
        HrFontRef::from_index(data, face_index).map_err(|_| {
            GlyphrunError::InvalidArgument(format!("face {face_index} is not shapeable"))
        })?;

        let units_per_em = face
            .head()
            .map(|head| head.units_per_em())
            .map_err(|_| GlyphrunError::InvalidArgument("font has no head table".into()))?;

        Ok(Self {
            data: data.to_vec(),
            face_index,
            units_per_em,
        })
    }

    pub fn face_index(&self) -> u32 {
        self.face_index
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Shapes `buffer`, taking it over whatever happens
    pub fn shape(
        &self,
        mut buffer: NativeBuffer,
        features: &[Feature],
        variations: &[Variation],
    ) -> Result<NativeGlyphs> {
        let font_ref = HrFontRef::from_index(&self.data, self.face_index)
            .map_err(|err| GlyphrunError::ShapingFailure(format!("font reparse failed: {err}")))?;

        // ShaperData caches font tables; it only lives as long as this call
        let shaper_data = ShaperData::new(&font_ref);

        let instance = if variations.is_empty() {
            None
        } else {
            let variations: Vec<HrVariation> = variations
                .iter()
                .map(|v| HrVariation {
                    tag: HrTag::new(&v.tag.to_bytes()),
                    value: v.value,
                })
                .collect();
            Some(ShaperInstance::from_variations(&font_ref, variations))
        };

        let mut builder = shaper_data.shaper(&font_ref);
        if let Some(ref inst) = instance {
            builder = builder.instance(Some(inst));
        }
        let shaper = builder.build();

        buffer.prepare();

        let features: Vec<HrFeature> = features
            .iter()
            .map(|f| HrFeature {
                tag: HrTag::new(&f.tag.to_bytes()),
                value: f.value,
                start: f.start,
                end: f.end,
            })
            .collect();

        let output = shaper.shape(buffer.into_unicode(), &features);
        Ok(NativeGlyphs::new(output))
    }
}
