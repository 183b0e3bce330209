//! Provider abstractions for the remote file tree, the cover-art search
//! service and raw image downloads.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

pub mod anilist;
pub mod http;
pub mod local;
pub mod models;
pub mod nas;
pub mod noop;

pub use models::{Entry, Metadata, ScanPage};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("path outside the library: {0}")]
    InvalidPath(String),
}

/// Access to one file tree, local or remote.
///
/// Backends implement the fallible `try_*` methods. Callers normally use
/// [`list`](Self::list) and [`get_content`](Self::get_content), which absorb
/// every failure into an empty result after logging it.
#[async_trait::async_trait]
pub trait FileGateway: Send + Sync {
    /// Backend name, for logging.
    fn name(&self) -> &str;

    async fn try_list(&self, path: &str) -> Result<Vec<Entry>, GatewayError>;

    async fn try_get_content(&self, path: &str) -> Result<Vec<u8>, GatewayError>;

    /// Immediate children of `path`, directories first, then by name.
    /// Empty on any failure.
    async fn list(&self, path: &str) -> Vec<Entry> {
        match self.try_list(path).await {
            Ok(mut entries) => {
                models::sort_entries(&mut entries);
                entries
            }
            Err(e) => {
                warn!(gateway = self.name(), path, error = %e, "listing failed");
                Vec::new()
            }
        }
    }

    /// Full byte content of a file node. Empty on any failure.
    async fn get_content(&self, path: &str) -> Vec<u8> {
        match self.try_get_content(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(gateway = self.name(), path, error = %e, "content fetch failed");
                Vec::new()
            }
        }
    }

    /// A page from a server-side scan index, when the backend keeps one.
    /// `page` is 0-based.
    async fn scan_page(&self, _path: &str, _page: usize, _page_size: usize) -> Option<ScanPage> {
        None
    }

    /// Title search against the backend's own index. `page` is 0-based.
    async fn search(&self, _query: &str, _page: usize, _page_size: usize) -> Option<ScanPage> {
        None
    }

    /// Metadata the backend keeps for a folder (sidecar files, cover images).
    async fn metadata(&self, _path: &str) -> Option<Metadata> {
        None
    }
}

#[async_trait::async_trait]
pub trait PosterProvider: Send + Sync {
    /// Cover image URL for the single best match of `query`, `Ok(None)` when
    /// the provider has no match.
    async fn search_cover(&self, query: &str) -> Result<Option<String>, ProviderError>;
}

#[async_trait::async_trait]
pub trait ImageSource: Send + Sync {
    /// Raw bytes behind `url`. Non-success statuses are errors.
    async fn get(&self, url: &str) -> Result<Bytes, ProviderError>;
}

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    posters: HashMap<String, Arc<dyn PosterProvider>>,
    pub preferred_poster: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poster(mut self, name: &str, provider: Arc<dyn PosterProvider>) -> Self {
        self.posters.insert(name.to_string(), provider);
        self
    }

    pub fn set_preferred_poster(mut self, name: &str) -> Self {
        self.preferred_poster = Some(name.to_string());
        self
    }

    pub fn poster(&self, name: Option<&str>) -> Result<Arc<dyn PosterProvider>, ProviderError> {
        let key = name
            .map(str::to_string)
            .or_else(|| self.preferred_poster.clone())
            .ok_or_else(|| ProviderError::UnknownProvider("no poster provider configured".into()))?;
        self.posters
            .get(&key)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProvider(key))
    }
}
