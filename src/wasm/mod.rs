//! WebAssembly instantiation for the loader
//!
//! [`InstantiationEngine`] is the seam the loader talks to; [`WasmtimeEngine`]
//! is the default implementation, able to run in streaming or buffered mode.

mod engine;
mod exports;
mod imports;
mod runtime;
mod value;

pub use engine::{Capability, InstantiationEngine, Instantiated};
pub use exports::{ModuleExports, MEMORY_EXPORT};
pub use imports::{GlobalDesc, HostFunc, HostValue, ImportTable, MemoryDesc, TableDesc};
pub use runtime::{check_preamble, EngineConfig, WasmtimeEngine};
pub use value::{WasmType, WasmValue};
