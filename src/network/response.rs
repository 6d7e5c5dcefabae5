//! Fetched resource types

use std::fmt;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt};

use crate::utils::{LoaderError, Result};

/// Stream of body chunks as they arrive
pub type BodyStream = BoxStream<'static, Result<Bytes>>;

/// MIME type expected for WebAssembly binaries
pub const WASM_MIME_TYPE: &str = "application/wasm";

/// Upper bound on what a declared body length may preallocate
pub const MAX_PREALLOC: usize = 16 << 20;

/// A fetched resource whose body has not been read yet
///
/// The body is consumed exactly once, either incrementally through
/// [`Response::into_stream`] or fully buffered through [`Response::bytes`].
pub struct Response {
    url: String,
    status: u16,
    content_type: Option<String>,
    content_length: Option<u64>,
    body: BodyStream,
}

impl Response {
    /// Create a new response over a body stream
    pub fn new(url: impl Into<String>, status: u16, body: BodyStream) -> Self {
        Self {
            url: url.into(),
            status,
            content_type: None,
            content_length: None,
            body,
        }
    }

    /// Create a successful response with an in-memory body
    pub fn from_bytes(url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        let len = body.len() as u64;
        Self::new(
            url,
            200,
            stream::once(async move { Ok::<_, LoaderError>(body) }).boxed(),
        )
        .with_content_length(len)
    }

    /// Set the content type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the content length
    pub fn with_content_length(mut self, len: u64) -> Self {
        self.content_length = Some(len);
        self
    }

    /// Get the final URL of the resource
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Check if the response was successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get the content type, without parameters
    pub fn content_type(&self) -> Option<&str> {
        self.content_type
            .as_deref()
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim())
    }

    /// Get the declared body length, if known
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Buffer size to reserve before reading the body
    ///
    /// The declared length is only a hint; it is capped at [`MAX_PREALLOC`]
    /// and the buffer grows as chunks arrive.
    pub fn capacity_hint(&self) -> usize {
        self.content_length
            .map_or(0, |len| usize::try_from(len).unwrap_or(usize::MAX).min(MAX_PREALLOC))
    }

    /// Consume the response as a stream of chunks
    pub fn into_stream(self) -> BodyStream {
        self.body
    }

    /// Consume the response, reading the whole body into memory
    pub async fn bytes(self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.capacity_hint());
        let mut body = self.body;
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("url", &self.url)
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunked(chunks: Vec<&'static [u8]>) -> BodyStream {
        stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from_static(c)))).boxed()
    }

    #[tokio::test]
    async fn test_bytes_joins_chunks() {
        let response = Response::new("mem://a", 200, chunked(vec![&b"\0as"[..], &b"m"[..], &b"\x01\0\0\0"[..]]));
        let body = response.bytes().await.unwrap();
        assert_eq!(&body[..], b"\0asm\x01\0\0\0");
    }

    #[tokio::test]
    async fn test_stream_yields_chunks_in_order() {
        let response = Response::new("mem://a", 200, chunked(vec![&b"ab"[..], &b"cd"[..]]));
        let chunks: Vec<Bytes> = response
            .into_stream()
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec![Bytes::from_static(b"ab"), Bytes::from_static(b"cd")]);
    }

    #[tokio::test]
    async fn test_bytes_propagates_chunk_error() {
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"ab")),
            Err(LoaderError::from(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            ))),
        ])
        .boxed();
        let err = Response::new("mem://a", 200, body).bytes().await.unwrap_err();
        assert!(matches!(err, LoaderError::Io(e) if e.kind() == std::io::ErrorKind::ConnectionReset));
    }

    #[test]
    fn test_content_type_strips_parameters() {
        let response = Response::from_bytes("mem://a", Bytes::new())
            .with_content_type("application/wasm; charset=binary");
        assert_eq!(response.content_type(), Some(WASM_MIME_TYPE));
        assert_eq!(response.content_length(), Some(0));
    }

    #[tokio::test]
    async fn test_oversized_content_length_is_only_a_hint() {
        let response = Response::new("mem://a", 200, chunked(vec![&b"\0asm"[..]]))
            .with_content_length(1 << 62);
        assert_eq!(response.capacity_hint(), MAX_PREALLOC);

        let body = response.bytes().await.unwrap();
        assert_eq!(&body[..], b"\0asm");
    }

    #[test]
    fn test_capacity_hint_follows_small_lengths() {
        let response = Response::from_bytes("mem://a", Bytes::from_static(b"abc"));
        assert_eq!(response.capacity_hint(), 3);
        let unknown = Response::new("mem://a", 200, stream::empty().boxed());
        assert_eq!(unknown.capacity_hint(), 0);
    }

    #[test]
    fn test_status_checks() {
        let ok = Response::new("mem://a", 204, stream::empty().boxed());
        assert!(ok.is_success());
        let missing = Response::new("mem://a", 404, stream::empty().boxed());
        assert!(!missing.is_success());
    }
}
