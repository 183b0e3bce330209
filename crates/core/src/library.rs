//! The comic library service: one explicitly constructed value holding the
//! gateway, caches, resolver and fetcher, shared by every front end.

use crate::cache::{title_key, ContentCache};
use crate::config::{AppConfig, GatewayKind};
use crate::fetcher::ImageFetcher;
use crate::history::History;
use crate::pagination::ScanSession;
use crate::resolver::PosterResolver;
use crate::scanner::{self, ComicScan, ScanOptions};
use crate::title;
use anyhow::Context;
use providers::anilist::{AniListConfig, AniListProvider};
use providers::http::HttpImageSource;
use providers::local::LocalGateway;
use providers::nas::{HttpGateway, NasConfig};
use providers::noop::NoopProvider;
use providers::{
    Entry, FileGateway, ImageSource, Metadata, PosterProvider, ProviderRegistry, ScanPage,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storage::{connect, migrate, BlobStore};
use tracing::{debug, info, warn};

const ADULT_KEYWORDS: [&str; 7] = ["성인", "19", "adult", "hentai", "에로", "섹스", "sex"];

/// Abbreviated category folder names and what they stand for.
const CATEGORY_NAMES: [(&str, &str); 4] = [
    ("ㅂㅇ", "번역"),
    ("ㅇㅈ", "연재"),
    ("ㅇㄱ", "완결"),
    ("ㅈㄱ", "작가"),
];

pub struct Library {
    config: AppConfig,
    gateway: Arc<dyn FileGateway>,
    http_gateway: Option<Arc<HttpGateway>>,
    cache: ContentCache,
    history: History,
    resolver: PosterResolver,
    fetcher: ImageFetcher,
    /// Most recently paged root first.
    sessions: Mutex<VecDeque<Arc<ScanSession>>>,
}

/// Everything a [`Library`] is assembled from.
pub struct LibraryParts {
    pub gateway: Arc<dyn FileGateway>,
    pub poster_provider: Arc<dyn PosterProvider>,
    pub image_source: Arc<dyn ImageSource>,
    pub pool: sqlx::SqlitePool,
    pub blobs: BlobStore,
}

impl Library {
    /// Builds the library described by `config`: database, blob store,
    /// gateway and providers.
    pub async fn open(config: AppConfig) -> anyhow::Result<Self> {
        let pool = connect(&config.database.path).await.context("db connect")?;
        migrate(&pool).await.context("db migrate")?;
        let blobs = BlobStore::open(&config.cache.dir)
            .await
            .context("blob store")?;

        let (gateway, http_gateway) = build_gateway(&config)?;
        let registry = build_registry(&config)?;
        let poster_provider = registry.poster(None)?;
        let image_source = Arc::new(HttpImageSource::new(config.http.timeouts())?);

        let mut library = Self::from_parts(
            config,
            LibraryParts {
                gateway,
                poster_provider,
                image_source,
                pool,
                blobs,
            },
        );
        library.http_gateway = http_gateway;
        info!(gateway = library.gateway.name(), "library ready");
        Ok(library)
    }

    pub fn from_parts(config: AppConfig, parts: LibraryParts) -> Self {
        let cache = ContentCache::new(parts.pool.clone(), parts.blobs);
        let resolver = PosterResolver::new(parts.poster_provider, cache.clone())
            .with_negative_ttl(config.poster.negative_ttl_secs.map(Duration::from_secs));
        let fetcher = ImageFetcher::new(parts.image_source, parts.gateway.clone(), cache.clone());
        Self {
            gateway: parts.gateway,
            http_gateway: None,
            history: History::new(parts.pool),
            cache,
            resolver,
            fetcher,
            sessions: Mutex::new(VecDeque::new()),
            config,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub async fn list(&self, path: &str) -> Vec<Entry> {
        self.gateway.list(path).await
    }

    pub async fn get_content(&self, path: &str) -> Vec<u8> {
        self.gateway.get_content(path).await
    }

    /// Fresh walk from `root` as a lazy stream of comic folders.
    pub fn scan(&self, root: &str, max_depth: Option<usize>) -> anyhow::Result<ComicScan> {
        let mut options = ScanOptions::from(&self.config.scan);
        if let Some(depth) = max_depth {
            options.max_depth = depth;
        }
        scanner::scan(self.gateway.clone(), root, &options)
    }

    /// Page `page` (0-based) of the comic folders under `path`.
    ///
    /// Served from the gateway's own scan index when it has one, otherwise
    /// from a walk that is started on first request and kept until
    /// [`refresh`](Self::refresh).
    pub async fn page(&self, path: &str, page: usize, page_size: usize) -> anyhow::Result<ScanPage> {
        if let Some(remote) = self.gateway.scan_page(path, page, page_size).await {
            return Ok(remote);
        }
        let session = self.session(path)?;
        Ok(session.page(page, page_size).await)
    }

    /// The walk for `path`, started on first use. Only the
    /// `scan.sessions` most recently paged roots are kept; older walks are
    /// dropped and rescan when paged again.
    fn session(&self, path: &str) -> anyhow::Result<Arc<ScanSession>> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| anyhow::anyhow!("scan session table poisoned"))?;
        let session = match sessions.iter().position(|s| s.root() == path) {
            Some(i) => sessions.remove(i).context("scan session vanished")?,
            None => Arc::new(ScanSession::start(path, self.scan(path, None)?)),
        };
        sessions.push_front(session.clone());
        let limit = self.config.scan.sessions.max(1);
        while sessions.len() > limit {
            if let Some(evicted) = sessions.pop_back() {
                debug!(root = evicted.root(), "scan session evicted");
            }
        }
        Ok(session)
    }

    /// Forgets the memoized walk for `path`; the next page request rescans.
    pub fn refresh(&self, path: &str) {
        if let Ok(mut sessions) = self.sessions.lock() {
            let before = sessions.len();
            sessions.retain(|s| s.root() != path);
            if sessions.len() < before {
                debug!(path, "scan session dropped");
            }
        }
    }

    /// Title search. The query is recorded in the recent searches, then
    /// answered from the gateway's index when it has one, otherwise by
    /// matching folder and display names in the walk of `root`.
    pub async fn search(
        &self,
        root: &str,
        query: &str,
        page: usize,
        page_size: usize,
    ) -> anyhow::Result<ScanPage> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(ScanPage {
                total: 0,
                page,
                page_size,
                items: Vec::new(),
            });
        }
        if let Err(e) = self.history.add_search(query).await {
            warn!(query, error = %e, "recent search not recorded");
        }
        if let Some(remote) = self.gateway.search(query, page, page_size).await {
            return Ok(remote);
        }

        let session = self.session(root)?;
        session.finish().await;
        let needle = query.to_lowercase();
        let matches: Vec<Entry> = session
            .entries()
            .into_iter()
            .filter(|e| {
                e.name.to_lowercase().contains(&needle)
                    || e.metadata
                        .as_ref()
                        .and_then(|m| m.title.as_deref())
                        .is_some_and(|t| t.to_lowercase().contains(&needle))
            })
            .collect();
        Ok(ScanPage {
            total: matches.len(),
            page,
            page_size,
            items: matches
                .into_iter()
                .skip(page.saturating_mul(page_size))
                .take(page_size)
                .collect(),
        })
    }

    pub async fn resolve_poster(&self, raw_title: &str) -> Option<String> {
        self.resolver.resolve(raw_title).await
    }

    /// Display metadata for `entry`, cached as one structured row per title.
    ///
    /// Metadata kept by the gateway for the folder wins over what the entry
    /// carries; the poster resolver only fills in a missing cover.
    pub async fn metadata(&self, entry: &Entry) -> Metadata {
        let display = title::clean(&entry.name);
        let key = title_key(&display);
        if let Some(cached) = self.cache.metadata(&key).await {
            return cached;
        }
        let mut meta = entry.metadata.clone().unwrap_or_default();
        if let Some(server) = self.gateway.metadata(&entry.path).await {
            meta = Metadata {
                poster_url: server.poster_url.or(meta.poster_url),
                title: server.title.or(meta.title),
                author: server.author.or(meta.author),
                summary: server.summary.or(meta.summary),
            };
        }
        meta.title.get_or_insert_with(|| display.clone());
        if meta.poster_url.is_none() {
            meta.poster_url = self.resolver.resolve(&entry.name).await;
        }
        if meta.poster_url.is_some() {
            self.cache.store_metadata(&key, &meta).await;
        }
        meta
    }

    /// Attaches posters to a page of entries with the configured pacing.
    pub async fn enrich(&self, items: &mut [Entry]) {
        let pacing = Duration::from_millis(self.config.poster.pacing_ms);
        self.resolver.enrich(items, pacing).await;
    }

    pub async fn fetch_image(&self, url: &str) -> Option<Vec<u8>> {
        self.fetcher.fetch(url).await
    }

    /// Top-level category folders under `root`.
    pub async fn categories(&self, root: &str) -> Vec<Entry> {
        let mut categories: Vec<Entry> = self
            .gateway
            .list(root)
            .await
            .into_iter()
            .filter(|e| e.is_directory && !is_adult(&e.name))
            .map(|mut e| {
                if let Some((_, full)) = CATEGORY_NAMES.iter().find(|(short, _)| *short == e.name) {
                    e.name = full.to_string();
                }
                e
            })
            .collect();
        categories.sort_by(|a, b| {
            category_priority(&a.name)
                .cmp(&category_priority(&b.name))
                .then_with(|| a.name.cmp(&b.name))
        });
        categories
    }

    /// Swaps the credentials of the remote gateway. Returns false when the
    /// library is not backed by one.
    pub fn set_credentials(&self, username: &str, password: &str) -> bool {
        match &self.http_gateway {
            Some(gw) => {
                gw.set_credentials(username, password);
                true
            }
            None => false,
        }
    }

    pub async fn add_recent_search(&self, query: &str) -> anyhow::Result<()> {
        self.history.add_search(query).await
    }

    pub async fn recent_searches(&self) -> anyhow::Result<Vec<String>> {
        self.history.searches().await
    }

    pub async fn clear_recent_searches(&self) -> anyhow::Result<()> {
        self.history.clear_searches().await
    }

    pub async fn add_recent_comic(&self, entry: &Entry) -> anyhow::Result<()> {
        self.history.add_comic(entry).await
    }

    pub async fn recent_comics(&self) -> anyhow::Result<Vec<Entry>> {
        self.history.comics().await
    }

    pub async fn remove_recent_comic(&self, path: &str) -> anyhow::Result<()> {
        self.history.remove_comic(path).await
    }
}

fn is_adult(name: &str) -> bool {
    let lower = name.to_lowercase();
    ADULT_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn category_priority(name: &str) -> u8 {
    if name.contains("완결A") {
        1
    } else if name.contains("완결B") {
        2
    } else {
        10
    }
}

type Gateways = (Arc<dyn FileGateway>, Option<Arc<HttpGateway>>);

pub fn build_gateway(config: &AppConfig) -> anyhow::Result<Gateways> {
    match config.gateway.kind {
        GatewayKind::Local => Ok((Arc::new(LocalGateway::new(&config.gateway.root)), None)),
        GatewayKind::Http => {
            let base_url = config
                .gateway
                .base_url
                .clone()
                .context("gateway.base_url is required for the http gateway")?;
            let gw = Arc::new(HttpGateway::new(NasConfig {
                base_url,
                username: config.gateway.username.clone(),
                password: config.gateway.password.clone(),
                server_side_scan: config.gateway.server_side_scan,
                timeouts: config.http.timeouts(),
            })?);
            Ok((gw.clone(), Some(gw)))
        }
    }
}

pub fn build_registry(config: &AppConfig) -> anyhow::Result<ProviderRegistry> {
    let anilist = AniListProvider::new(AniListConfig {
        endpoint: config.poster.endpoint.clone(),
        timeouts: config.http.timeouts(),
    })?;
    Ok(ProviderRegistry::new()
        .with_poster("noop", Arc::new(NoopProvider))
        .with_poster("anilist", Arc::new(anilist))
        .set_preferred_poster(&config.poster.provider))
}
