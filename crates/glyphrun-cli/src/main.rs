//! glyphrun CLI - shape text with native or sandboxed backends

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Info => commands::info::run(),
        Commands::Shape(args) => commands::shape::run(&args),
        Commands::Elements(args) => commands::elements::run(&args),
    }
}
