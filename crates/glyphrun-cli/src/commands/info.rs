//! Info command implementation

use anyhow::Result;
use glyphrun::wasm::MODULE_ENV;

pub fn run() -> Result<()> {
    println!("glyphrun v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("Backends:");
    let native = glyphrun::native::shared_backend();
    println!(
        "  native            - {} ({}, in-process)",
        native.name(),
        native.kind().as_str()
    );
    match std::env::var_os(MODULE_ENV) {
        Some(path) => println!(
            "  wasm              - wasmtime sandbox, module {}",
            std::path::Path::new(&path).display()
        ),
        None => println!(
            "  wasm              - wasmtime sandbox (pass --wasm-module or set {MODULE_ENV})"
        ),
    }
    Ok(())
}
