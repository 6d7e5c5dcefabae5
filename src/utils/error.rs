//! Error types for wasmfetch
//!
//! Failures from the fetcher and the engine are wrapped transparently, so the
//! caller sees the collaborator's own error and message.

use thiserror::Error;

/// Main error type for loader operations
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Resource retrieval errors raised by the fetcher itself
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// HTTP transport errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// I/O errors (missing file, unreadable body)
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Compile, link and instantiation errors from wasmtime
    #[error(transparent)]
    Wasm(#[from] wasmtime::Error),
    /// Module preamble and content errors
    #[error(transparent)]
    Module(#[from] ModuleError),
    /// Errors while reading an instance's exports
    #[error(transparent)]
    Exports(#[from] ExportError),
}

/// Resource retrieval errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// Server answered with a non-success status
    #[error("HTTP {status} while fetching {url}")]
    Status { status: u16, url: String },
    /// Path could not be parsed or resolved
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    /// Scheme is neither http(s) nor file
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
}

/// Module content errors detected before compilation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModuleError {
    /// Fewer than 8 bytes in the module
    #[error("module is truncated ({0} bytes)")]
    Truncated(usize),
    /// First four bytes are not `\0asm`
    #[error("bad module magic {0:02x?}")]
    BadMagic([u8; 4]),
    /// Binary format version other than 1
    #[error("unsupported module version {0}")]
    UnsupportedVersion(u32),
    /// Streaming response with a content type other than application/wasm
    #[error("incorrect response MIME type {0:?}, expected \"application/wasm\"")]
    MimeType(Option<String>),
}

/// Errors raised while working with instance exports
#[derive(Debug, Error)]
pub enum ExportError {
    /// No export with this name, or export of another kind
    #[error("export '{0}' not found")]
    NotFound(String),
    /// Instance has no exported memory
    #[error("module exports no memory")]
    NoMemory,
    /// Read past the end of linear memory
    #[error("memory access out of bounds: offset {offset}, length {len}")]
    OutOfBounds { offset: u64, len: u64 },
    /// Store mutex poisoned by a panicking caller
    #[error("instance store is poisoned")]
    StorePoisoned,
    /// Value type outside i32/i64/f32/f64
    #[error("unsupported wasm value type: {0}")]
    UnsupportedType(String),
    /// Host function returned the wrong number of results
    #[error("host function returned {actual} results, expected {expected}")]
    ResultArity { expected: usize, actual: usize },
    /// String contents are not valid UTF-16
    #[error("invalid UTF-16 string at {0:#x}")]
    InvalidString(u32),
}

/// Convenience Result type for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transparent_io_message() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "module.wasm is gone");
        let err = LoaderError::from(io);
        assert_eq!(err.to_string(), "module.wasm is gone");
        assert!(matches!(err, LoaderError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }

    #[test]
    fn test_fetch_status_message() {
        let err: LoaderError = FetchError::Status {
            status: 404,
            url: "http://localhost/module.wasm".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "HTTP 404 while fetching http://localhost/module.wasm"
        );
    }

    #[test]
    fn test_module_error_messages() {
        assert_eq!(
            ModuleError::BadMagic(*b"<htm").to_string(),
            "bad module magic [3c, 68, 74, 6d]"
        );
        assert_eq!(
            ModuleError::UnsupportedVersion(2).to_string(),
            "unsupported module version 2"
        );
    }
}
