//! Instance exports and loader utility accessors

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use wasmtime::{Instance, Store, Val};

use super::value::WasmValue;
use crate::utils::error::ExportError;
use crate::utils::Result;

/// Name of the memory export the accessors read from
pub const MEMORY_EXPORT: &str = "memory";

/// Size of the AssemblyScript object header field holding the byte length
const AS_SIZE_FIELD: u32 = 4;
/// Offset back from the payload to the runtime class id
const AS_ID_OFFSET: u32 = 8;
/// AssemblyScript runtime class id of `String`
const AS_STRING_ID: u32 = 2;

/// Exports of an instantiated module
///
/// Besides plain calls and globals this carries the string and buffer
/// accessors AssemblyScript hosts rely on.
#[derive(Clone)]
pub struct ModuleExports {
    instance: Instance,
    store: Arc<Mutex<Store<()>>>,
    names: Vec<String>,
}

impl ModuleExports {
    pub(crate) fn new(mut store: Store<()>, instance: Instance) -> Self {
        let names = instance
            .exports(&mut store)
            .map(|export| export.name().to_string())
            .collect();
        Self {
            instance,
            store: Arc::new(Mutex::new(store)),
            names,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Store<()>>> {
        Ok(self.store.lock().map_err(|_| ExportError::StorePoisoned)?)
    }

    /// Export names in declaration order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Call an exported function
    pub fn call(&self, name: &str, args: &[WasmValue]) -> Result<Vec<WasmValue>> {
        let mut store = self.lock()?;

        let func = self
            .instance
            .get_func(&mut *store, name)
            .ok_or_else(|| ExportError::NotFound(name.to_string()))?;

        let params: Vec<Val> = args.iter().copied().map(Val::from).collect();
        let result_count = func.ty(&*store).results().len();
        let mut results = vec![Val::I32(0); result_count];

        func.call(&mut *store, &params, &mut results)?;

        results.into_iter().map(WasmValue::try_from).collect()
    }

    /// Read the current value of an exported global
    pub fn global(&self, name: &str) -> Result<WasmValue> {
        let mut store = self.lock()?;
        let global = self
            .instance
            .get_global(&mut *store, name)
            .ok_or_else(|| ExportError::NotFound(name.to_string()))?;
        WasmValue::try_from(global.get(&mut *store))
    }

    /// Current size of the exported memory in bytes
    pub fn memory_size(&self) -> Result<usize> {
        let mut store = self.lock()?;
        let memory = self
            .instance
            .get_memory(&mut *store, MEMORY_EXPORT)
            .ok_or(ExportError::NoMemory)?;
        Ok(memory.data_size(&*store))
    }

    /// Copy `len` bytes of the exported memory starting at `offset`
    pub fn read_memory(&self, offset: u32, len: u32) -> Result<Vec<u8>> {
        self.with_memory(|data| Ok(slice(data, offset, len)?.to_vec()))
    }

    /// Decode an AssemblyScript string (UTF-16LE, byte length at `ptr - 4`)
    ///
    /// The object must carry the `String` class id at `ptr - 8`.
    pub fn get_string(&self, ptr: u32) -> Result<String> {
        self.with_memory(|data| {
            if object_id(data, ptr)? != AS_STRING_ID {
                return Err(ExportError::InvalidString(ptr).into());
            }
            let size = object_size(data, ptr)?;
            if size % 2 != 0 {
                return Err(ExportError::InvalidString(ptr).into());
            }
            let bytes = slice(data, ptr, size)?;
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            Ok(String::from_utf16(&units).map_err(|_| ExportError::InvalidString(ptr))?)
        })
    }

    /// Copy an AssemblyScript `ArrayBuffer` (byte length at `ptr - 4`)
    pub fn get_array_buffer(&self, ptr: u32) -> Result<Vec<u8>> {
        self.with_memory(|data| Ok(slice(data, ptr, object_size(data, ptr)?)?.to_vec()))
    }

    fn with_memory<R>(&self, f: impl FnOnce(&[u8]) -> Result<R>) -> Result<R> {
        let mut store = self.lock()?;
        let memory = self
            .instance
            .get_memory(&mut *store, MEMORY_EXPORT)
            .ok_or(ExportError::NoMemory)?;
        f(memory.data(&*store))
    }
}

fn slice(data: &[u8], offset: u32, len: u32) -> Result<&[u8]> {
    let start = offset as usize;
    start
        .checked_add(len as usize)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| {
            ExportError::OutOfBounds {
                offset: offset.into(),
                len: len.into(),
            }
            .into()
        })
}

/// Read the u32 header field `back` bytes before `ptr`
fn header_field(data: &[u8], ptr: u32, back: u32) -> Result<u32> {
    let at = ptr.checked_sub(back).ok_or(ExportError::OutOfBounds {
        offset: ptr.into(),
        len: back.into(),
    })?;
    let field = slice(data, at, 4)?;
    Ok(u32::from_le_bytes([field[0], field[1], field[2], field[3]]))
}

fn object_size(data: &[u8], ptr: u32) -> Result<u32> {
    header_field(data, ptr, AS_SIZE_FIELD)
}

fn object_id(data: &[u8], ptr: u32) -> Result<u32> {
    header_field(data, ptr, AS_ID_OFFSET)
}

impl fmt::Debug for ModuleExports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleExports")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_bounds() {
        let data = [1u8, 2, 3, 4];
        assert_eq!(slice(&data, 1, 2).unwrap(), &[2, 3]);
        assert_eq!(slice(&data, 4, 0).unwrap(), &[] as &[u8]);
        assert!(slice(&data, 3, 2).is_err());
        assert!(slice(&data, u32::MAX, 2).is_err());
    }

    #[test]
    fn test_object_size_reads_header() {
        let mut data = vec![0u8; 16];
        data[4..8].copy_from_slice(&6u32.to_le_bytes());
        data[0..4].copy_from_slice(&AS_STRING_ID.to_le_bytes());
        assert_eq!(object_size(&data, 8).unwrap(), 6);
        assert_eq!(object_id(&data, 8).unwrap(), AS_STRING_ID);
        assert!(object_size(&data, 2).is_err());
        assert!(object_id(&data, 4).is_err());
    }
}
