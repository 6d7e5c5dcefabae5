//! Numeric WebAssembly values and types

use wasmtime::{Val, ValType};

use crate::utils::error::{ExportError, LoaderError};
use crate::utils::Result;

/// WebAssembly value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WasmType {
    I32,
    I64,
    F32,
    F64,
}

impl From<WasmType> for ValType {
    fn from(ty: WasmType) -> Self {
        match ty {
            WasmType::I32 => ValType::I32,
            WasmType::I64 => ValType::I64,
            WasmType::F32 => ValType::F32,
            WasmType::F64 => ValType::F64,
        }
    }
}

/// WebAssembly values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WasmValue {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl WasmValue {
    /// Type of this value
    pub fn ty(&self) -> WasmType {
        match self {
            Self::I32(_) => WasmType::I32,
            Self::I64(_) => WasmType::I64,
            Self::F32(_) => WasmType::F32,
            Self::F64(_) => WasmType::F64,
        }
    }

    /// Get the value as i32, if it is one
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::I32(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<WasmValue> for Val {
    fn from(value: WasmValue) -> Self {
        match value {
            WasmValue::I32(v) => Val::I32(v),
            WasmValue::I64(v) => Val::I64(v),
            WasmValue::F32(v) => Val::F32(v.to_bits()),
            WasmValue::F64(v) => Val::F64(v.to_bits()),
        }
    }
}

impl TryFrom<Val> for WasmValue {
    type Error = LoaderError;

    fn try_from(val: Val) -> Result<Self> {
        match val {
            Val::I32(v) => Ok(WasmValue::I32(v)),
            Val::I64(v) => Ok(WasmValue::I64(v)),
            Val::F32(v) => Ok(WasmValue::F32(f32::from_bits(v))),
            Val::F64(v) => Ok(WasmValue::F64(f64::from_bits(v))),
            other => Err(ExportError::UnsupportedType(format!("{other:?}")).into()),
        }
    }
}
