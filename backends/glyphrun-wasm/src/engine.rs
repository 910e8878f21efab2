//! [`ShapingEngine`] over a guest module's exports
//!
//! Every resource lives in guest memory; a [`Handle`] is the guest pointer.
//! Arguments that do not fit in an `i32` (text, font bytes, feature lists)
//! are copied into a temporary guest block that is released before the call
//! returns, whether or not the call succeeded.

use glyphrun_core::{
    BackendKind, Direction, Feature, GlyphInfo, GlyphPosition, GlyphrunError, Handle, Result,
    ShapingEngine, Tag, Variation,
};

use crate::{
    host::{guest_len, SandboxHost},
    layout,
};

/// Shaping engine running inside a sandboxed guest
pub struct SandboxEngine<H> {
    host: H,
}

impl<H: SandboxHost> SandboxEngine<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    fn status(&mut self, name: &str, args: &[i32]) -> Result<i32> {
        let status = self.host.call(name, args)?;
        layout::check_status(status, name)
    }

    fn release(&mut self, name: &str, handle: Handle) {
        if let Err(err) = self.host.call(name, &[ptr(handle)]) {
            log::warn!("{name} failed for {:#x}: {err}", handle.raw());
        }
    }

    fn read_records(&mut self, ptr: i32, count: usize, size: usize) -> Result<Vec<u8>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        if ptr == 0 {
            return Err(GlyphrunError::Sandbox(
                "guest returned a null glyph array".to_string(),
            ));
        }
        self.host.read(ptr as u32, count * size)
    }
}

fn ptr(handle: Handle) -> i32 {
    handle.raw() as u32 as i32
}

fn handle_or(raw: i32, err: impl FnOnce() -> GlyphrunError) -> Result<Handle> {
    if raw == 0 {
        Err(err())
    } else {
        Ok(Handle::new(u64::from(raw as u32)))
    }
}

/// Copies `bytes` into a temporary guest block for the duration of `f`
///
/// Empty input is passed as a null pointer without allocating.
fn with_block<H: SandboxHost, R>(
    host: &mut H,
    bytes: &[u8],
    f: impl FnOnce(&mut H, i32) -> Result<R>,
) -> Result<R> {
    if bytes.is_empty() {
        return f(host, 0);
    }
    let block = host.alloc(bytes.len())?;
    let result = host.write(block, bytes).and_then(|()| f(host, block as i32));
    if let Err(err) = host.free(block, bytes.len()) {
        log::warn!("leaked {} guest bytes at {block:#x}: {err}", bytes.len());
    }
    result
}

impl<H: SandboxHost> ShapingEngine for SandboxEngine<H> {
    fn name(&self) -> &'static str {
        "wasm"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Sandboxed
    }

    fn buffer_new(&mut self) -> Result<Handle> {
        let raw = self.host.call("glyphrun_buffer_new", &[])?;
        handle_or(raw, || {
            GlyphrunError::Sandbox("guest could not create a buffer".to_string())
        })
    }

    fn buffer_add_utf16(&mut self, buffer: Handle, text: &[u16]) -> Result<()> {
        let units = guest_len(text.len())?;
        let name = "glyphrun_buffer_add_utf16";
        let status = with_block(&mut self.host, &layout::encode_utf16(text), |host, block| {
            host.call(name, &[ptr(buffer), block, units])
        })?;
        layout::check_status(status, name).map(drop)
    }

    fn buffer_clear(&mut self, buffer: Handle) -> Result<()> {
        self.status("glyphrun_buffer_clear", &[ptr(buffer)])
            .map(drop)
    }

    fn buffer_len(&mut self, buffer: Handle) -> Result<usize> {
        let len = self.status("glyphrun_buffer_len", &[ptr(buffer)])?;
        Ok(len as usize)
    }

    fn buffer_direction(&mut self, buffer: Handle) -> Result<Direction> {
        let raw = self.status("glyphrun_buffer_get_direction", &[ptr(buffer)])?;
        Ok(Direction::from_raw(raw))
    }

    fn buffer_set_direction(&mut self, buffer: Handle, direction: Direction) -> Result<()> {
        self.status(
            "glyphrun_buffer_set_direction",
            &[ptr(buffer), direction.to_raw()],
        )
        .map(drop)
    }

    fn buffer_script(&mut self, buffer: Handle) -> Result<Tag> {
        // Tags use the full u32 range, so this export has no status channel
        let raw = self
            .host
            .call("glyphrun_buffer_get_script", &[ptr(buffer)])?;
        Ok(Tag::from_u32(raw as u32))
    }

    fn buffer_set_script(&mut self, buffer: Handle, script: Tag) -> Result<()> {
        self.status(
            "glyphrun_buffer_set_script",
            &[ptr(buffer), script.to_u32() as i32],
        )
        .map(drop)
    }

    fn buffer_set_language(&mut self, buffer: Handle, language: &str) -> Result<()> {
        let len = guest_len(language.len())?;
        let name = "glyphrun_buffer_set_language";
        let status = with_block(&mut self.host, language.as_bytes(), |host, block| {
            host.call(name, &[ptr(buffer), block, len])
        })?;
        layout::check_status(status, name).map(drop)
    }

    fn buffer_guess_segment_properties(&mut self, buffer: Handle) -> Result<()> {
        self.status("glyphrun_buffer_guess_segment_properties", &[ptr(buffer)])
            .map(drop)
    }

    fn buffer_free(&mut self, buffer: Handle) {
        self.release("glyphrun_buffer_free", buffer);
    }

    fn font_new(&mut self, data: &[u8], index: u32) -> Result<Handle> {
        let len = guest_len(data.len())?;
        with_block(&mut self.host, data, |host, block| {
            let faces = layout::check_status(
                host.call("glyphrun_font_face_count", &[block, len])?,
                "glyphrun_font_face_count",
            )?;
            if index >= faces as u32 {
                return Err(GlyphrunError::ResourceNotFound(format!(
                    "face {index} (collection has {faces})"
                )));
            }
            let raw = host.call("glyphrun_font_from_data_index", &[block, len, index as i32])?;
            handle_or(raw, || {
                GlyphrunError::InvalidArgument(format!("guest could not parse face {index}"))
            })
        })
    }

    fn font_units_per_em(&mut self, font: Handle) -> Result<u16> {
        let upem = self.status("glyphrun_font_units_per_em", &[ptr(font)])?;
        u16::try_from(upem)
            .map_err(|_| GlyphrunError::Sandbox(format!("guest reported {upem} units per em")))
    }

    fn font_free(&mut self, font: Handle) {
        self.release("glyphrun_font_free", font);
    }

    fn shape(
        &mut self,
        font: Handle,
        buffer: Handle,
        features: &[Feature],
        variations: &[Variation],
    ) -> Result<Handle> {
        // The guest takes the buffer on entry; if we bail out before the call
        // it has to be released here instead.
        let counts = guest_len(features.len()).and_then(|f| Ok((f, guest_len(variations.len())?)));
        let (feature_count, variation_count) = match counts {
            Ok(counts) => counts,
            Err(err) => {
                self.buffer_free(buffer);
                return Err(err);
            }
        };

        let feature_bytes = layout::encode_features(features);
        let variation_bytes = layout::encode_variations(variations);
        let mut called = false;
        let result = with_block(&mut self.host, &feature_bytes, |host, fptr| {
            with_block(host, &variation_bytes, |host, vptr| {
                called = true;
                host.call(
                    "glyphrun_shape_full",
                    &[
                        ptr(font),
                        ptr(buffer),
                        fptr,
                        feature_count,
                        vptr,
                        variation_count,
                    ],
                )
            })
        });
        if !called {
            self.buffer_free(buffer);
        }
        handle_or(result?, || {
            GlyphrunError::ShapingFailure("guest shaping returned no glyphs".to_string())
        })
    }

    fn glyphs_len(&mut self, glyphs: Handle) -> Result<usize> {
        let len = self.status("glyphrun_glyph_buffer_len", &[ptr(glyphs)])?;
        Ok(len as usize)
    }

    fn glyphs_infos(&mut self, glyphs: Handle) -> Result<Vec<GlyphInfo>> {
        let count = self.glyphs_len(glyphs)?;
        let array = self
            .host
            .call("glyphrun_glyph_buffer_get_infos", &[ptr(glyphs)])?;
        let bytes = self.read_records(array, count, layout::GLYPH_INFO_SIZE)?;
        layout::decode_infos(&bytes)
    }

    fn glyphs_positions(&mut self, glyphs: Handle) -> Result<Vec<GlyphPosition>> {
        let count = self.glyphs_len(glyphs)?;
        let array = self
            .host
            .call("glyphrun_glyph_buffer_get_positions", &[ptr(glyphs)])?;
        let bytes = self.read_records(array, count, layout::GLYPH_POSITION_SIZE)?;
        layout::decode_positions(&bytes)
    }

    fn glyphs_into_buffer(&mut self, glyphs: Handle) -> Result<Handle> {
        let raw = self
            .host
            .call("glyphrun_glyph_buffer_into_buffer", &[ptr(glyphs)])?;
        handle_or(raw, || {
            GlyphrunError::Sandbox("guest could not recycle the glyph buffer".to_string())
        })
    }

    fn glyphs_free(&mut self, glyphs: Handle) {
        self.release("glyphrun_glyph_buffer_free", glyphs);
    }
}
