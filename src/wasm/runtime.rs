//! WebAssembly engine implementation using wasmtime

use std::sync::atomic::{AtomicBool, Ordering};

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use wasmtime::*;

use super::engine::{Capability, InstantiationEngine, Instantiated};
use super::exports::ModuleExports;
use super::imports::{HostFunc, HostValue, ImportTable};
use super::value::WasmValue;
use crate::network::{Response, WASM_MIME_TYPE};
use crate::utils::error::{ExportError, LoaderError, ModuleError};

/// Magic bytes every binary module starts with
const WASM_MAGIC: &[u8; 4] = b"\0asm";
/// Binary format version of core modules
const WASM_VERSION: u32 = 1;
const PREAMBLE_LEN: usize = 8;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Report streaming capability
    pub streaming: bool,
    /// Accept WAT text as well as binaries
    pub accept_text: bool,
    /// Reject streamed responses not served as application/wasm
    pub require_wasm_mime: bool,
    pub simd: bool,
    pub bulk_memory: bool,
    pub multi_memory: bool,
    pub threads: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            streaming: true,
            accept_text: false,
            require_wasm_mime: false,
            simd: true,
            bulk_memory: true,
            multi_memory: true,
            threads: false,
        }
    }
}

/// Instantiation engine backed by wasmtime
pub struct WasmtimeEngine {
    engine: Engine,
    config: EngineConfig,
    streaming: AtomicBool,
}

impl WasmtimeEngine {
    /// Create a new engine
    pub fn new(config: EngineConfig) -> crate::Result<Self> {
        let mut wasm_config = Config::new();
        wasm_config.wasm_simd(config.simd);
        wasm_config.wasm_threads(config.threads);
        wasm_config.wasm_multi_memory(config.multi_memory);
        wasm_config.wasm_bulk_memory(config.bulk_memory);

        let engine = Engine::new(&wasm_config)?;

        Ok(Self {
            streaming: AtomicBool::new(config.streaming),
            engine,
            config,
        })
    }

    /// Get the engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Toggle streaming support; takes effect on the next load
    pub fn set_streaming(&self, enabled: bool) {
        self.streaming.store(enabled, Ordering::Relaxed);
    }

    /// Compile a module from bytes
    pub fn compile(&self, bytes: &[u8]) -> crate::Result<Module> {
        self.screen(bytes)?;
        let module = Module::new(&self.engine, bytes)?;
        log::trace!("Compiled module ({} bytes)", bytes.len());
        Ok(module)
    }

    /// Instantiate a compiled module in a fresh store
    pub fn instantiate_module(
        &self,
        module: &Module,
        imports: Option<&ImportTable>,
    ) -> crate::Result<ModuleExports> {
        let mut store = Store::new(&self.engine, ());
        let mut linker: Linker<()> = Linker::new(&self.engine);

        if let Some(imports) = imports {
            for (namespace, name, value) in imports.iter() {
                let item = self.materialize(&mut store, value)?;
                linker.define(&store, namespace, name, item)?;
            }
        }

        let instance = linker.instantiate(&mut store, module)?;
        let exports = ModuleExports::new(store, instance);
        log::debug!("Instantiated module with {} exports", exports.names().len());
        Ok(exports)
    }

    /// Check the preamble, letting text through when it is accepted
    fn screen(&self, bytes: &[u8]) -> std::result::Result<(), ModuleError> {
        if self.config.accept_text && !bytes.starts_with(WASM_MAGIC) {
            return Ok(());
        }
        check_preamble(bytes)
    }

    fn materialize(&self, store: &mut Store<()>, value: &HostValue) -> crate::Result<Extern> {
        let item: Extern = match value {
            HostValue::Func(func) => {
                let ty = FuncType::new(
                    &self.engine,
                    func.params().iter().copied().map(ValType::from),
                    func.results().iter().copied().map(ValType::from),
                );
                let host = func.clone();
                Func::new(&mut *store, ty, move |_caller, params, results| {
                    call_host(&host, params, results)
                })
                .into()
            }
            HostValue::Memory(desc) => {
                Memory::new(&mut *store, MemoryType::new(desc.minimum, desc.maximum))?.into()
            }
            HostValue::Table(desc) => Table::new(
                &mut *store,
                TableType::new(RefType::FUNCREF, desc.minimum, desc.maximum),
                Ref::Func(None),
            )?
            .into(),
            HostValue::Global(desc) => {
                let mutability = if desc.mutable {
                    Mutability::Var
                } else {
                    Mutability::Const
                };
                Global::new(
                    &mut *store,
                    GlobalType::new(desc.value.ty().into(), mutability),
                    desc.value.into(),
                )?
                .into()
            }
        };
        Ok(item)
    }
}

/// Validate the 8-byte module preamble
pub fn check_preamble(bytes: &[u8]) -> std::result::Result<(), ModuleError> {
    if bytes.len() < PREAMBLE_LEN {
        return Err(ModuleError::Truncated(bytes.len()));
    }
    let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if &magic != WASM_MAGIC {
        return Err(ModuleError::BadMagic(magic));
    }
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != WASM_VERSION {
        return Err(ModuleError::UnsupportedVersion(version));
    }
    Ok(())
}

fn call_host(func: &HostFunc, params: &[Val], results: &mut [Val]) -> wasmtime::Result<()> {
    let args = params
        .iter()
        .cloned()
        .map(WasmValue::try_from)
        .collect::<crate::Result<Vec<_>>>()
        .map_err(wasmtime::Error::new)?;

    let values = func.call(&args).map_err(wasmtime::Error::new)?;
    if values.len() != results.len() {
        return Err(wasmtime::Error::new(LoaderError::from(
            ExportError::ResultArity {
                expected: results.len(),
                actual: values.len(),
            },
        )));
    }

    for (slot, value) in results.iter_mut().zip(values) {
        *slot = value.into();
    }
    Ok(())
}

impl InstantiationEngine for WasmtimeEngine {
    type Exports = ModuleExports;

    fn capability(&self) -> Capability {
        if self.streaming.load(Ordering::Relaxed) {
            Capability::Streaming
        } else {
            Capability::Buffered
        }
    }

    async fn instantiate(
        &self,
        bytes: Bytes,
        imports: Option<&ImportTable>,
    ) -> crate::Result<Option<Instantiated<ModuleExports>>> {
        let module = self.compile(&bytes)?;
        Ok(Some(Instantiated::new(
            self.instantiate_module(&module, imports)?,
        )))
    }

    async fn instantiate_streaming(
        &self,
        response: Response,
        imports: Option<&ImportTable>,
    ) -> crate::Result<Option<Instantiated<ModuleExports>>> {
        if self.config.require_wasm_mime && response.content_type() != Some(WASM_MIME_TYPE) {
            return Err(ModuleError::MimeType(response.content_type().map(str::to_owned)).into());
        }

        let mut buf = BytesMut::with_capacity(response.capacity_hint());
        let mut body = response.into_stream();
        let mut screened = false;

        // Fail on a bad preamble before the rest of the body arrives
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
            if !screened && buf.len() >= PREAMBLE_LEN {
                self.screen(&buf)?;
                screened = true;
            }
        }

        let module = self.compile(&buf)?;
        Ok(Some(Instantiated::new(
            self.instantiate_module(&module, imports)?,
        )))
    }
}
