//! CLI argument definitions using Clap v4

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// glyphrun - shape text from the command line
#[derive(Parser, Debug)]
#[command(name = "glyphrun")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version and available backends
    #[command(alias = "i")]
    Info,

    /// Shape text and print the glyphs
    #[command(alias = "s")]
    Shape(Box<ShapeArgs>),

    /// Print grapheme-cluster element offsets of some text
    #[command(alias = "e")]
    Elements(ElementsArgs),
}

#[derive(Parser, Debug)]
pub struct ShapeArgs {
    /// Text to shape
    pub text: String,

    /// Font file path (.ttf, .otf, .ttc, .otc)
    #[arg(short = 'f', long = "font-file")]
    pub font_file: PathBuf,

    /// Face index for TTC/OTC collections
    #[arg(short = 'y', long = "face-index", default_value = "0")]
    pub face_index: u32,

    /// Fallback font, tried in the order given (repeatable)
    #[arg(long = "fallback")]
    pub fallback: Vec<PathBuf>,

    /// Split fallback runs at grapheme clusters instead of code points
    #[arg(long = "grapheme-runs")]
    pub grapheme_runs: bool,

    /// Font features, comma separated, e.g. "-liga,kern,ss01"
    #[arg(short = 'F', long = "features")]
    pub features: Option<String>,

    /// Variation coordinates, comma separated, e.g. "wght=700,wdth=80"
    #[arg(short = 'V', long = "variations")]
    pub variations: Option<String>,

    /// Text direction
    #[arg(short = 'd', long = "direction", value_enum, default_value = "auto")]
    pub direction: DirectionArg,

    /// Script tag (ISO 15924), e.g. Latn, Arab
    #[arg(short = 'S', long = "script")]
    pub script: Option<String>,

    /// Language tag (BCP 47), e.g. en, ar, zh-Hans
    #[arg(short = 'l', long = "language")]
    pub language: Option<String>,

    /// Where shaping runs
    #[arg(long = "backend", value_enum, default_value = "native")]
    pub backend: BackendArg,

    /// Guest module for the wasm backend (default: $GLYPHRUN_WASM_MODULE)
    #[arg(long = "wasm-module")]
    pub wasm_module: Option<PathBuf>,

    /// Print JSON instead of a table
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct ElementsArgs {
    /// Text to segment
    pub text: String,

    /// Print JSON instead of plain offsets
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirectionArg {
    Auto,
    Ltr,
    Rtl,
    Ttb,
    Btt,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendArg {
    Native,
    Wasm,
}
