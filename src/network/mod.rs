//! Resource retrieval for module binaries
//!
//! A [`ResourceFetcher`] turns a path into a [`Response`] whose body can be
//! read either as a chunk stream or as one buffer.

mod client;
mod response;

pub use client::{FetchConfig, Location, NetworkClient, ResourceFetcher};
pub use response::{BodyStream, Response, MAX_PREALLOC, WASM_MIME_TYPE};
