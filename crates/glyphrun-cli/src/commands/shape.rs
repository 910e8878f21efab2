//! Shape command implementation

use std::path::Path;

use anyhow::{bail, Context, Result};
use glyphrun::prelude::*;
use glyphrun::wasm::WasmBackend;
use serde::Serialize;

use crate::cli::{BackendArg, DirectionArg, ShapeArgs};

#[derive(Serialize)]
struct GlyphRecord {
    glyph_id: u32,
    cluster: u32,
    x_advance: i32,
    y_advance: i32,
    x_offset: i32,
    y_offset: i32,
    /// Index into [primary, fallbacks...]
    font: usize,
}

#[derive(Serialize)]
struct ShapeReport<'a> {
    text: &'a str,
    backend: String,
    units_per_em: u16,
    glyphs: Vec<GlyphRecord>,
}

pub fn run(args: &ShapeArgs) -> Result<()> {
    let backend = open_backend(args.backend, args.wasm_module.as_deref())?;
    log::info!("shaping on {backend}");
    let _scope = context::enter(backend.clone());

    let features = parse_list::<Feature>(args.features.as_deref()).context("parsing --features")?;
    let variations =
        parse_list::<Variation>(args.variations.as_deref()).context("parsing --variations")?;

    let primary = context::load_font(&args.font_file, args.face_index)
        .with_context(|| format!("loading {}", args.font_file.display()))?;
    let units_per_em = primary.units_per_em()?;

    let glyphs = if args.fallback.is_empty() {
        shape_single(args, &primary, &features, &variations)?
    } else {
        if args.direction != DirectionArg::Auto || args.script.is_some() || args.language.is_some()
        {
            log::warn!("--direction, --script and --language are guessed per run with --fallback");
        }
        let fallbacks = args
            .fallback
            .iter()
            .map(|path| {
                context::load_font(path, 0).with_context(|| format!("loading {}", path.display()))
            })
            .collect::<Result<Vec<Font>>>()?;
        shape_fallback(args, &primary, &fallbacks, features, variations)?
    };

    if args.json {
        let report = ShapeReport {
            text: &args.text,
            backend: backend.to_string(),
            units_per_em,
            glyphs,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_table(&glyphs, units_per_em);
    }
    Ok(())
}

fn open_backend(choice: BackendArg, module: Option<&Path>) -> Result<Backend> {
    match choice {
        BackendArg::Native => Ok(glyphrun::native::shared_backend()),
        BackendArg::Wasm => {
            let backend = match module {
                Some(path) => WasmBackend::from_file(path),
                None => WasmBackend::from_env(),
            };
            backend.context("starting the sandboxed backend")
        }
    }
}

fn parse_list<T>(list: Option<&str>) -> Result<Vec<T>>
where
    T: std::str::FromStr<Err = GlyphrunError>,
{
    let Some(list) = list else {
        return Ok(Vec::new());
    };
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| item.parse::<T>().map_err(anyhow::Error::from))
        .collect()
}

fn shape_single(
    args: &ShapeArgs,
    font: &Font,
    features: &[Feature],
    variations: &[Variation],
) -> Result<Vec<GlyphRecord>> {
    let mut buffer = context::create_buffer()?;
    buffer.add_str(&args.text)?;

    let direction = match args.direction {
        DirectionArg::Auto => None,
        DirectionArg::Ltr => Some(Direction::LeftToRight),
        DirectionArg::Rtl => Some(Direction::RightToLeft),
        DirectionArg::Ttb => Some(Direction::TopToBottom),
        DirectionArg::Btt => Some(Direction::BottomToTop),
    };
    if let Some(direction) = direction {
        buffer.set_direction(direction)?;
    }
    if let Some(script) = &args.script {
        buffer.set_script(script.parse::<Tag>().context("parsing --script")?)?;
    }
    if let Some(language) = &args.language {
        buffer.set_language(language)?;
    }
    buffer.guess_segment_properties()?;

    let result = font.shape_with(&mut buffer, features, variations)?;
    let records = result
        .glyphs()?
        .map(|(info, pos)| GlyphRecord {
            glyph_id: info.glyph_id,
            cluster: info.cluster,
            x_advance: pos.x_advance,
            y_advance: pos.y_advance,
            x_offset: pos.x_offset,
            y_offset: pos.y_offset,
            font: 0,
        })
        .collect();
    Ok(records)
}

fn shape_fallback(
    args: &ShapeArgs,
    primary: &Font,
    fallbacks: &[Font],
    features: Vec<Feature>,
    variations: Vec<Variation>,
) -> Result<Vec<GlyphRecord>> {
    let boundary = if args.grapheme_runs {
        RunBoundary::Grapheme
    } else {
        RunBoundary::CodePoint
    };
    let glyphs = FontFallback::new(primary)
        .fallbacks(fallbacks)
        .options(FallbackOptions {
            boundary,
            features,
            variations,
        })
        .shape(&args.text)?;

    let missing = glyphs.iter().filter(|g| g.is_missing()).count();
    if missing > 0 {
        log::warn!("{missing} glyph(s) missing from every font");
    }
    Ok(glyphs
        .iter()
        .map(|g| GlyphRecord {
            glyph_id: g.info.glyph_id,
            cluster: g.info.cluster,
            x_advance: g.position.x_advance,
            y_advance: g.position.y_advance,
            x_offset: g.position.x_offset,
            y_offset: g.position.y_offset,
            font: g.font_index,
        })
        .collect())
}

fn print_table(glyphs: &[GlyphRecord], units_per_em: u16) {
    println!(
        "{:>6} {:>7} {:>6} {:>6} {:>6} {:>6} {:>4}",
        "glyph", "cluster", "x_adv", "y_adv", "x_off", "y_off", "font"
    );
    for g in glyphs {
        println!(
            "{:>6} {:>7} {:>6} {:>6} {:>6} {:>6} {:>4}",
            g.glyph_id, g.cluster, g.x_advance, g.y_advance, g.x_offset, g.y_offset, g.font
        );
    }
    let width: i64 = glyphs.iter().map(|g| i64::from(g.x_advance)).sum();
    println!("{} glyph(s), advance {width} / {units_per_em} upem", glyphs.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_feature_list() {
        let features = parse_list::<Feature>(Some("-liga, kern ,ss01,")).unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features[0].value, 0);
        assert_eq!(features[1].tag.to_string(), "kern");
    }

    #[test]
    fn test_parse_variation_list() {
        let variations = parse_list::<Variation>(Some("wght=700,wdth=80")).unwrap();
        assert_eq!(variations.len(), 2);
        assert_eq!(variations[1].value, 80.0);
        assert!(parse_list::<Variation>(Some("wght")).is_err());
        assert!(parse_list::<Variation>(None).unwrap().is_empty());
    }
}
