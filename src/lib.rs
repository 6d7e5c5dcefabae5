//! # wasmfetch - WebAssembly module loader
//!
//! Fetches a module by path or URL and instantiates it, preferring streaming
//! instantiation and falling back to a buffered load when the engine cannot
//! stream.
//!
//! ## Architecture
//!
//! - **loader**: the [`WasmLoader`] and its configuration
//! - **network**: resource retrieval over HTTP and the filesystem
//! - **wasm**: instantiation engines, import tables and module exports
//! - **utils**: shared error types
//!
//! ```no_run
//! # async fn run() -> wasmfetch::Result<()> {
//! use wasmfetch::wasm::{HostFunc, ImportTable, WasmType};
//!
//! let imports = ImportTable::new().with(
//!     "env",
//!     "abort",
//!     HostFunc::new(vec![WasmType::I32; 4], vec![], |_| Ok(vec![])),
//! );
//! let loader = wasmfetch::wasm_loader(Some(imports))?;
//! if let Some(exports) = loader.fetch("build/module.wasm", None).await? {
//!     println!("exports: {:?}", exports.names());
//! }
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod network;
pub mod utils;
pub mod wasm;

// Re-export main types for convenience
pub use loader::{FromExports, LoaderConfig, WasmLoader};
pub use utils::error::{LoaderError, Result};

use network::{FetchConfig, NetworkClient};
use wasm::{EngineConfig, ImportTable, WasmtimeEngine};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = "wasmfetch";

/// Create a loader over the default network client and wasmtime engine
///
/// `default_imports` is used by every call that does not pass its own table.
pub fn wasm_loader(default_imports: Option<ImportTable>) -> Result<WasmLoader> {
    Ok(WasmLoader::with_parts(
        WasmtimeEngine::new(EngineConfig::default())?,
        NetworkClient::new(FetchConfig::default())?,
        LoaderConfig { default_imports },
    ))
}
