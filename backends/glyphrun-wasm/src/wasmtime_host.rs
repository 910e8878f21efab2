//! [`SandboxHost`] on wasmtime

use std::collections::HashMap;
use std::path::Path;

use wasmtime::{Engine, Func, Instance, Memory, Module, Store, Val};

use glyphrun_core::{GlyphrunError, Result};

use crate::host::SandboxHost;

/// One instantiated guest module with its own store and memory
#[derive(Debug)]
pub struct WasmtimeHost {
    store: Store<()>,
    instance: Instance,
    memory: Memory,
    exports: HashMap<String, Func>,
}

fn sandbox(context: &str, err: impl std::fmt::Display) -> GlyphrunError {
    GlyphrunError::Sandbox(format!("{context}: {err}"))
}

impl WasmtimeHost {
    /// Compiles and instantiates a module from its binary (or text) form
    ///
    /// The guest gets no imports, so a module that needs any fails here.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let engine = Engine::default();
        let module = Module::new(&engine, bytes).map_err(|e| sandbox("invalid module", e))?;
        Self::instantiate(&engine, &module)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => {
                GlyphrunError::ResourceNotFound(format!("guest module {}", path.display()))
            }
            _ => GlyphrunError::Io(err),
        })?;
        log::info!("loading guest module {}", path.display());
        Self::from_bytes(&bytes)
    }

    pub fn instantiate(engine: &Engine, module: &Module) -> Result<Self> {
        let mut store = Store::new(engine, ());
        let instance = Instance::new(&mut store, module, &[])
            .map_err(|e| sandbox("instantiation failed", e))?;
        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| GlyphrunError::ResourceNotFound("guest export `memory`".to_string()))?;
        Ok(Self {
            store,
            instance,
            memory,
            exports: HashMap::new(),
        })
    }

    fn export(&mut self, name: &str) -> Result<Func> {
        if let Some(func) = self.exports.get(name) {
            return Ok(*func);
        }
        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or_else(|| GlyphrunError::ResourceNotFound(format!("guest export `{name}`")))?;
        self.exports.insert(name.to_string(), func);
        Ok(func)
    }

    fn check_range(&self, ptr: u32, len: usize) -> Result<usize> {
        let start = ptr as usize;
        match start.checked_add(len) {
            Some(end) if end <= self.memory.data_size(&self.store) => Ok(start),
            _ => Err(GlyphrunError::Sandbox(format!(
                "{len} bytes at {ptr:#x} fall outside guest memory"
            ))),
        }
    }
}

impl SandboxHost for WasmtimeHost {
    fn call(&mut self, name: &str, args: &[i32]) -> Result<i32> {
        let func = self.export(name)?;
        let params: Vec<Val> = args.iter().map(|&a| Val::I32(a)).collect();
        let result_count = func.ty(&self.store).results().len();
        let mut results = vec![Val::I32(0); result_count];
        func.call(&mut self.store, &params, &mut results)
            .map_err(|e| sandbox(&format!("call to `{name}` trapped"), e))?;
        Ok(results.first().and_then(Val::i32).unwrap_or(0))
    }

    fn read(&mut self, ptr: u32, len: usize) -> Result<Vec<u8>> {
        let start = self.check_range(ptr, len)?;
        let mut out = vec![0; len];
        self.memory
            .read(&self.store, start, &mut out)
            .map_err(|e| sandbox("guest memory read", e))?;
        Ok(out)
    }

    fn write(&mut self, ptr: u32, bytes: &[u8]) -> Result<()> {
        let start = self.check_range(ptr, bytes.len())?;
        self.memory
            .write(&mut self.store, start, bytes)
            .map_err(|e| sandbox("guest memory write", e))
    }
}
