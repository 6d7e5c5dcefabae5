//! Module loader with streaming instantiation and buffered fallback
//!
//! A [`WasmLoader`] owns a fetcher, an engine and a default import table.
//! Every [`WasmLoader::fetch`] asks the engine whether it can instantiate from
//! a stream. If it can, the response goes straight to the engine. If not, the
//! body is read into memory first. Errors from either collaborator are
//! returned as they are.

use crate::network::{NetworkClient, ResourceFetcher};
use crate::utils::Result;
use crate::wasm::{Capability, ImportTable, InstantiationEngine, WasmtimeEngine};

/// Loader configuration
#[derive(Debug, Clone, Default)]
pub struct LoaderConfig {
    /// Imports used when a call does not supply its own
    pub default_imports: Option<ImportTable>,
}

/// Typed view over an engine's exports
///
/// Purely a convenience for [`WasmLoader::fetch_as`]; the load itself is
/// unchanged.
pub trait FromExports<X>: Sized {
    fn from_exports(exports: X) -> Self;
}

impl<X> FromExports<X> for X {
    fn from_exports(exports: X) -> Self {
        exports
    }
}

/// Fetches modules and instantiates them with the engine's best strategy
#[derive(Debug, Clone)]
pub struct WasmLoader<E = WasmtimeEngine, F = NetworkClient> {
    engine: E,
    fetcher: F,
    config: LoaderConfig,
}

impl<E, F> WasmLoader<E, F>
where
    E: InstantiationEngine,
    F: ResourceFetcher,
{
    /// Create a loader over the given collaborators
    pub fn with_parts(engine: E, fetcher: F, config: LoaderConfig) -> Self {
        Self {
            engine,
            fetcher,
            config,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Imports used when a call passes `None`
    pub fn default_imports(&self) -> Option<&ImportTable> {
        self.config.default_imports.as_ref()
    }

    /// Fetch `path` and instantiate it
    ///
    /// `imports` replaces the default import table entirely when given. The
    /// result is `Ok(None)` when the engine produced no exports.
    pub async fn fetch(
        &self,
        path: &str,
        imports: Option<&ImportTable>,
    ) -> Result<Option<E::Exports>> {
        let imports = imports.or(self.config.default_imports.as_ref());

        let instance = match self.engine.capability() {
            Capability::Streaming => {
                log::debug!("Loading {path} with streaming instantiation");
                let response = self.fetcher.fetch(path).await?;
                self.engine.instantiate_streaming(response, imports).await?
            }
            Capability::Buffered => {
                log::debug!("Loading {path} with buffered instantiation");
                let response = self.fetcher.fetch(path).await?;
                let bytes = response.bytes().await?;
                self.engine.instantiate(bytes, imports).await?
            }
        };

        Ok(instance.and_then(|instance| instance.exports))
    }

    /// Like [`WasmLoader::fetch`], viewing the exports as `T`
    pub async fn fetch_as<T>(&self, path: &str, imports: Option<&ImportTable>) -> Result<Option<T>>
    where
        T: FromExports<E::Exports>,
    {
        Ok(self.fetch(path, imports).await?.map(T::from_exports))
    }
}
