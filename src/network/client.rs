//! Resource retrieval over HTTP and the local filesystem

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, StreamExt};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use url::Url;

use super::response::{Response, WASM_MIME_TYPE};
use crate::utils::error::{FetchError, LoaderError};
use crate::utils::Result;

/// Read size for file-backed bodies
const FILE_CHUNK_SIZE: usize = 64 * 1024;

/// Retrieves a resource by path or URL
pub trait ResourceFetcher: Send + Sync {
    /// Fetch `path`, returning the response with its body still unread
    fn fetch(&self, path: &str) -> impl Future<Output = Result<Response>> + Send;
}

impl<T: ResourceFetcher> ResourceFetcher for Arc<T> {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<Response>> + Send {
        (**self).fetch(path)
    }
}

/// Network client configuration
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Base URL that relative paths are resolved against
    pub base_url: Option<Url>,
    /// User-Agent header sent with HTTP requests
    pub user_agent: String,
    /// Total request timeout (none by default)
    pub timeout: Option<Duration>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            user_agent: format!("{}/{}", crate::NAME, crate::VERSION),
            timeout: None,
        }
    }
}

/// Where a path resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// http or https resource
    Remote(Url),
    /// Local file
    File(PathBuf),
}

/// Fetcher backed by reqwest for http(s) and tokio for files
#[derive(Debug, Clone)]
pub struct NetworkClient {
    http: reqwest::Client,
    config: FetchConfig,
}

impl NetworkClient {
    /// Create a new client
    pub fn new(config: FetchConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            config,
        })
    }

    /// Get the client configuration
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Resolve a path the way a browser resolves `fetch(path)`
    pub fn resolve(&self, path: &str) -> Result<Location> {
        let url = match Url::parse(path) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.config.base_url {
                Some(base) => base
                    .join(path)
                    .map_err(|e| FetchError::InvalidUrl(format!("{path}: {e}")))?,
                None => return Ok(Location::File(PathBuf::from(path))),
            },
            Err(e) => return Err(FetchError::InvalidUrl(format!("{path}: {e}")).into()),
        };

        match url.scheme() {
            "http" | "https" => Ok(Location::Remote(url)),
            "file" => url
                .to_file_path()
                .map(Location::File)
                .map_err(|()| FetchError::InvalidUrl(url.to_string()).into()),
            other => Err(FetchError::UnsupportedScheme(other.to_string()).into()),
        }
    }

    async fn fetch_remote(&self, url: Url) -> Result<Response> {
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }
            .into());
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let content_length = response.content_length();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(LoaderError::from))
            .boxed();

        let mut response = Response::new(final_url, status.as_u16(), body);
        if let Some(ct) = content_type {
            response = response.with_content_type(ct);
        }
        if let Some(len) = content_length {
            response = response.with_content_length(len);
        }
        Ok(response)
    }

    async fn fetch_file(&self, path: &Path) -> Result<Response> {
        let file = File::open(path).await?;
        let len = file.metadata().await?.len();
        let body = stream::try_unfold(file, read_chunk).boxed();

        let mut response =
            Response::new(path.display().to_string(), 200, body).with_content_length(len);
        if path.extension().is_some_and(|ext| ext == "wasm") {
            response = response.with_content_type(WASM_MIME_TYPE);
        }
        Ok(response)
    }
}

async fn read_chunk(mut file: File) -> Result<Option<(Bytes, File)>> {
    let mut buf = BytesMut::with_capacity(FILE_CHUNK_SIZE);
    if file.read_buf(&mut buf).await? == 0 {
        return Ok(None);
    }
    Ok(Some((buf.freeze(), file)))
}

impl ResourceFetcher for NetworkClient {
    async fn fetch(&self, path: &str) -> Result<Response> {
        let location = self.resolve(path)?;
        log::debug!("Fetching {path} from {location:?}");
        match location {
            Location::Remote(url) => self.fetch_remote(url).await,
            Location::File(file) => self.fetch_file(&file).await,
        }
    }
}
