//! What the sandboxed engine needs from a WebAssembly runtime

use glyphrun_core::{GlyphrunError, Result};

/// A running guest module: its exports and its linear memory
///
/// Guest pointers are 32-bit offsets into linear memory. Zero is never a
/// valid allocation and signals failure.
pub trait SandboxHost: Send {
    /// Calls export `name` with 32-bit integer arguments
    ///
    /// Exports without a result return 0.
    fn call(&mut self, name: &str, args: &[i32]) -> Result<i32>;

    /// Copies `len` bytes out of linear memory starting at `ptr`
    fn read(&mut self, ptr: u32, len: usize) -> Result<Vec<u8>>;

    /// Copies `bytes` into linear memory starting at `ptr`
    fn write(&mut self, ptr: u32, bytes: &[u8]) -> Result<()>;

    /// Reserves `size` bytes in the guest
    fn alloc(&mut self, size: usize) -> Result<u32> {
        let size = guest_len(size)?;
        let ptr = self.call("glyphrun_alloc", &[size])? as u32;
        if ptr == 0 {
            return Err(GlyphrunError::Sandbox(format!(
                "guest could not allocate {size} bytes"
            )));
        }
        Ok(ptr)
    }

    /// Returns a block obtained from [`alloc`](Self::alloc)
    fn free(&mut self, ptr: u32, size: usize) -> Result<()> {
        let size = guest_len(size)?;
        self.call("glyphrun_free", &[ptr as i32, size])?;
        Ok(())
    }
}

/// Lengths crossing the boundary must fit the guest's 32-bit address space
pub(crate) fn guest_len(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| {
        GlyphrunError::InvalidArgument(format!("{len} bytes do not fit in guest memory"))
    })
}
