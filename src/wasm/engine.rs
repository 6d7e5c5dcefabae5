//! Instantiation engine seam

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;

use super::imports::ImportTable;
use crate::network::Response;
use crate::utils::Result;

/// How an engine can consume a module body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Compile straight from the in-flight response
    Streaming,
    /// Needs the whole body in memory first
    Buffered,
}

/// Result of instantiating a module
#[derive(Debug, Clone, PartialEq)]
pub struct Instantiated<X> {
    pub exports: Option<X>,
}

impl<X> Instantiated<X> {
    pub fn new(exports: X) -> Self {
        Self {
            exports: Some(exports),
        }
    }
}

/// Compiles and instantiates modules against an import table
///
/// An engine may resolve to `Ok(None)` or to a result without exports; the
/// loader passes that through rather than treating it as a failure.
pub trait InstantiationEngine: Send + Sync {
    /// What an instance exposes to the host
    type Exports: Send;

    /// Queried before every load
    fn capability(&self) -> Capability;

    /// Instantiate from a fully buffered module
    fn instantiate(
        &self,
        bytes: Bytes,
        imports: Option<&ImportTable>,
    ) -> impl Future<Output = Result<Option<Instantiated<Self::Exports>>>> + Send;

    /// Instantiate from a response whose body is still arriving
    fn instantiate_streaming(
        &self,
        response: Response,
        imports: Option<&ImportTable>,
    ) -> impl Future<Output = Result<Option<Instantiated<Self::Exports>>>> + Send;
}

impl<E: InstantiationEngine> InstantiationEngine for Arc<E> {
    type Exports = E::Exports;

    fn capability(&self) -> Capability {
        (**self).capability()
    }

    fn instantiate(
        &self,
        bytes: Bytes,
        imports: Option<&ImportTable>,
    ) -> impl Future<Output = Result<Option<Instantiated<Self::Exports>>>> + Send {
        (**self).instantiate(bytes, imports)
    }

    fn instantiate_streaming(
        &self,
        response: Response,
        imports: Option<&ImportTable>,
    ) -> impl Future<Output = Result<Option<Instantiated<Self::Exports>>>> + Send {
        (**self).instantiate_streaming(response, imports)
    }
}
