use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub scan: ScanConfig,
    pub poster: PosterConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    #[default]
    Local,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub kind: GatewayKind,
    /// Root directory for the local gateway.
    pub root: String,
    /// Companion server URL for the http gateway.
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub server_side_scan: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            kind: GatewayKind::Local,
            root: ".".to_string(),
            base_url: None,
            username: None,
            password: None,
            server_side_scan: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/shelfscan.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory of the poster image blob store.
    pub dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: "data/posters".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub max_depth: usize,
    pub page_size: usize,
    /// Archive extensions that mark a comic folder, without the dot.
    pub extensions: Vec<String>,
    /// Glob patterns matched against directory names; matches are not entered.
    pub exclude: Vec<String>,
    /// Paged walks kept alive at once; the least recently paged is dropped.
    pub sessions: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            page_size: 50,
            extensions: vec!["zip".to_string(), "cbz".to_string()],
            exclude: vec!["@eaDir".to_string(), "#recycle".to_string(), ".*".to_string()],
            sessions: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PosterConfig {
    pub provider: String,
    pub endpoint: String,
    /// Pause after each item that needed the provider during bulk enrichment.
    pub pacing_ms: u64,
    /// Remember "no match" outcomes for this long. Unset means never.
    pub negative_ttl_secs: Option<u64>,
}

impl Default for PosterConfig {
    fn default() -> Self {
        Self {
            provider: "anilist".to_string(),
            endpoint: providers::anilist::DEFAULT_ENDPOINT.to_string(),
            pacing_ms: 300,
            negative_ttl_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            timeout_secs: 10,
        }
    }
}

impl HttpConfig {
    pub fn timeouts(&self) -> providers::http::HttpTimeouts {
        providers::http::HttpTimeouts {
            connect: std::time::Duration::from_secs(self.connect_timeout_secs),
            total: std::time::Duration::from_secs(self.timeout_secs),
        }
    }
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("SHELFSCAN")
            .separator("__")
            .try_parsing(true),
    );
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
