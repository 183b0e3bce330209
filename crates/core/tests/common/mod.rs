#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use providers::models::join_path;
use providers::{
    Entry, FileGateway, GatewayError, ImageSource, Metadata, PosterProvider, ProviderError,
    ScanPage,
};
use shelfscan_core::config::AppConfig;
use shelfscan_core::library::{Library, LibraryParts};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storage::BlobStore;

pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x06\0\0\0";

/// In-memory file tree keyed by directory path.
#[derive(Default)]
pub struct MemoryGateway {
    dirs: HashMap<String, Vec<Entry>>,
    files: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    folder_metadata: HashMap<String, Metadata>,
    index: Option<Vec<Entry>>,
    pub list_calls: AtomicUsize,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `children` under `dir`. Names ending in `/` become directories.
    pub fn dir(mut self, dir: &str, children: &[&str]) -> Self {
        let entries = children
            .iter()
            .map(|c| match c.strip_suffix('/') {
                Some(name) => Entry::directory(name, join_path(dir, name)),
                None => Entry::file(*c, join_path(dir, c)),
            })
            .collect();
        self.dirs.insert(dir.to_string(), entries);
        self
    }

    pub fn file(mut self, path: &str, bytes: &[u8]) -> Self {
        self.files.insert(path.to_string(), bytes.to_vec());
        self
    }

    pub fn failing(mut self, dir: &str) -> Self {
        self.failing.insert(dir.to_string());
        self
    }

    pub fn folder_metadata(mut self, path: &str, meta: Metadata) -> Self {
        self.folder_metadata.insert(path.to_string(), meta);
        self
    }

    /// Entries answered by `search`, filtered by substring.
    pub fn search_index(mut self, entries: Vec<Entry>) -> Self {
        self.index = Some(entries);
        self
    }

    pub fn calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileGateway for MemoryGateway {
    fn name(&self) -> &str {
        "memory"
    }

    async fn try_list(&self, path: &str) -> Result<Vec<Entry>, GatewayError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.failing.contains(path) {
            return Err(GatewayError::Request(format!("share offline: {path}")));
        }
        self.dirs
            .get(path)
            .cloned()
            .ok_or_else(|| GatewayError::NotADirectory(path.to_string()))
    }

    async fn try_get_content(&self, path: &str) -> Result<Vec<u8>, GatewayError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| GatewayError::Io(std::io::ErrorKind::NotFound.into()))
    }

    async fn search(&self, query: &str, page: usize, page_size: usize) -> Option<ScanPage> {
        let hits: Vec<Entry> = self
            .index
            .as_ref()?
            .iter()
            .filter(|e| e.name.contains(query))
            .cloned()
            .collect();
        Some(ScanPage {
            total: hits.len(),
            page,
            page_size,
            items: hits.into_iter().skip(page * page_size).take(page_size).collect(),
        })
    }

    async fn metadata(&self, path: &str) -> Option<Metadata> {
        self.folder_metadata.get(path).cloned()
    }
}

/// Poster provider answering from a fixed table and counting queries.
#[derive(Default)]
pub struct ScriptedProvider {
    answers: HashMap<String, Result<Option<String>, u16>>,
    delay: Option<Duration>,
    pub queries: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, query: &str, url: &str) -> Self {
        self.answers
            .insert(query.to_string(), Ok(Some(url.to_string())));
        self
    }

    pub fn fail(mut self, query: &str, status: u16) -> Self {
        self.answers.insert(query.to_string(), Err(status));
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl PosterProvider for ScriptedProvider {
    async fn search_cover(&self, query: &str) -> Result<Option<String>, ProviderError> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.answers.get(query) {
            Some(Ok(url)) => Ok(url.clone()),
            Some(Err(status)) => Err(ProviderError::Status(*status)),
            None => Ok(None),
        }
    }
}

/// Image source serving fixed bodies and 404 for everything else.
#[derive(Default)]
pub struct StubImages {
    bodies: HashMap<String, Vec<u8>>,
    pub calls: AtomicUsize,
}

impl StubImages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, url: &str, body: &[u8]) -> Self {
        self.bodies.insert(url.to_string(), body.to_vec());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageSource for StubImages {
    async fn get(&self, url: &str) -> Result<Bytes, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies
            .get(url)
            .map(|b| Bytes::from(b.clone()))
            .ok_or(ProviderError::Status(404))
    }
}

pub async fn pool(name: &str) -> sqlx::SqlitePool {
    let pool = storage::connect(&format!("sqlite://file:{name}?mode=memory&cache=shared"))
        .await
        .unwrap();
    storage::migrate(&pool).await.unwrap();
    pool
}

pub struct Harness {
    pub library: Library,
    pub gateway: Arc<MemoryGateway>,
    pub provider: Arc<ScriptedProvider>,
    pub images: Arc<StubImages>,
    pub blobs: tempfile::TempDir,
}

pub async fn harness(
    name: &str,
    config: AppConfig,
    gateway: MemoryGateway,
    provider: ScriptedProvider,
    images: StubImages,
) -> Harness {
    let blobs = tempfile::tempdir().unwrap();
    let gateway = Arc::new(gateway);
    let provider = Arc::new(provider);
    let images = Arc::new(images);
    let library = Library::from_parts(
        config,
        LibraryParts {
            gateway: gateway.clone(),
            poster_provider: provider.clone(),
            image_source: images.clone(),
            pool: pool(name).await,
            blobs: BlobStore::open(blobs.path()).await.unwrap(),
        },
    );
    Harness {
        library,
        gateway,
        provider,
        images,
        blobs,
    }
}

/// Config with pacing disabled so tests do not sleep.
pub fn quiet_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.poster.pacing_ms = 0;
    cfg
}
