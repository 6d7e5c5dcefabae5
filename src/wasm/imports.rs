//! Host-provided import tables

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::value::{WasmType, WasmValue};
use crate::utils::Result;

type Callback = dyn Fn(&[WasmValue]) -> Result<Vec<WasmValue>> + Send + Sync;

/// A host function with its wasm signature
///
/// Cloning is cheap; clones share the same callback.
#[derive(Clone)]
pub struct HostFunc {
    params: Vec<WasmType>,
    results: Vec<WasmType>,
    callback: Arc<Callback>,
}

impl HostFunc {
    /// Create a host function
    pub fn new<F>(params: Vec<WasmType>, results: Vec<WasmType>, f: F) -> Self
    where
        F: Fn(&[WasmValue]) -> Result<Vec<WasmValue>> + Send + Sync + 'static,
    {
        Self {
            params,
            results,
            callback: Arc::new(f),
        }
    }

    /// Parameter types
    pub fn params(&self) -> &[WasmType] {
        &self.params
    }

    /// Result types
    pub fn results(&self) -> &[WasmType] {
        &self.results
    }

    /// Invoke the callback directly
    pub fn call(&self, args: &[WasmValue]) -> Result<Vec<WasmValue>> {
        (self.callback)(args)
    }

    /// Whether both handles share one callback
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }
}

impl fmt::Debug for HostFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostFunc")
            .field("params", &self.params)
            .field("results", &self.results)
            .finish_non_exhaustive()
    }
}

/// Linear memory created for the module, in 64 KiB pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryDesc {
    pub minimum: u32,
    pub maximum: Option<u32>,
}

/// Function reference table, initially null-filled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDesc {
    pub minimum: u32,
    pub maximum: Option<u32>,
}

/// Global with its initial value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalDesc {
    pub value: WasmValue,
    pub mutable: bool,
}

/// A single host binding
#[derive(Debug, Clone)]
pub enum HostValue {
    Func(HostFunc),
    Memory(MemoryDesc),
    Table(TableDesc),
    Global(GlobalDesc),
}

impl From<HostFunc> for HostValue {
    fn from(func: HostFunc) -> Self {
        Self::Func(func)
    }
}

impl From<MemoryDesc> for HostValue {
    fn from(memory: MemoryDesc) -> Self {
        Self::Memory(memory)
    }
}

impl From<TableDesc> for HostValue {
    fn from(table: TableDesc) -> Self {
        Self::Table(table)
    }
}

impl From<GlobalDesc> for HostValue {
    fn from(global: GlobalDesc) -> Self {
        Self::Global(global)
    }
}

/// Import table: namespace -> binding name -> host value
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    namespaces: BTreeMap<String, BTreeMap<String, HostValue>>,
}

impl ImportTable {
    /// Create an empty import table
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`ImportTable::insert`]
    pub fn with(
        mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<HostValue>,
    ) -> Self {
        self.insert(namespace, name, value);
        self
    }

    /// Add a binding, returning the one it replaced
    pub fn insert(
        &mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<HostValue>,
    ) -> Option<HostValue> {
        self.namespaces
            .entry(namespace.into())
            .or_default()
            .insert(name.into(), value.into())
    }

    /// Look up a binding
    pub fn get(&self, namespace: &str, name: &str) -> Option<&HostValue> {
        self.namespaces.get(namespace)?.get(name)
    }

    /// Look up a host function binding
    pub fn func(&self, namespace: &str, name: &str) -> Option<&HostFunc> {
        match self.get(namespace, name)? {
            HostValue::Func(func) => Some(func),
            _ => None,
        }
    }

    /// Namespace names in order
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    /// All bindings as (namespace, name, value)
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &HostValue)> {
        self.namespaces.iter().flat_map(|(ns, bindings)| {
            bindings
                .iter()
                .map(move |(name, value)| (ns.as_str(), name.as_str(), value))
        })
    }

    /// Number of bindings across all namespaces
    pub fn len(&self) -> usize {
        self.namespaces.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
