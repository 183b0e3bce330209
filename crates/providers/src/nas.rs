//! Gateway for the NAS companion HTTP server.
//!
//! Endpoints: `GET /files?path=` (directory listing), `GET /download?path=`
//! (file bytes), `GET /scan?path=&page=&page_size=` and
//! `GET /search?query=&page=&page_size=` (1-based pages from the server's own
//! index) and `GET /metadata?path=` (folder sidecar metadata).

use crate::http::{build_client, HttpTimeouts};
use crate::{Entry, FileGateway, GatewayError, Metadata, ProviderError, ScanPage};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::sync::RwLock;
use tracing::{debug, warn};

#[derive(Clone, Default)]
pub struct NasConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Serve pages from the server's `/scan` index.
    pub server_side_scan: bool,
    pub timeouts: HttpTimeouts,
}

pub struct HttpGateway {
    client: Client,
    base_url: String,
    server_side_scan: bool,
    credentials: RwLock<Option<(String, Option<String>)>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteEntry {
    name: String,
    is_directory: bool,
    path: String,
    #[serde(default)]
    metadata: Option<Metadata>,
}

impl From<RemoteEntry> for Entry {
    fn from(r: RemoteEntry) -> Self {
        Entry {
            name: r.name,
            is_directory: r.is_directory,
            path: r.path,
            metadata: r
                .metadata
                .map(Metadata::without_blanks)
                .filter(|m| !m.is_empty()),
        }
    }
}

#[derive(Deserialize)]
struct RemoteScanPage {
    total_items: usize,
    #[serde(default)]
    items: Vec<RemoteEntry>,
}

impl HttpGateway {
    pub fn new(cfg: NasConfig) -> Result<Self, ProviderError> {
        let credentials = cfg.username.map(|u| (u, cfg.password));
        Ok(Self {
            client: build_client(cfg.timeouts)?,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            server_side_scan: cfg.server_side_scan,
            credentials: RwLock::new(credentials),
        })
    }

    /// Replaces the credentials used by every following request.
    pub fn set_credentials(&self, username: &str, password: &str) {
        if let Ok(mut guard) = self.credentials.write() {
            *guard = Some((username.to_string(), Some(password.to_string())));
        }
    }

    pub fn clear_credentials(&self) {
        if let Ok(mut guard) = self.credentials.write() {
            *guard = None;
        }
    }

    fn get(&self, endpoint: &str) -> RequestBuilder {
        let builder = self.client.get(format!("{}/{}", self.base_url, endpoint));
        let creds = self
            .credentials
            .read()
            .ok()
            .and_then(|guard| guard.clone());
        match creds {
            Some((user, pass)) => builder.basic_auth(user, pass),
            None => builder,
        }
    }

    /// One page from a paged endpoint (`/scan`, `/search`). The server counts
    /// pages from 1.
    async fn remote_page(
        &self,
        endpoint: &str,
        (key, value): (&str, &str),
        page: usize,
        page_size: usize,
    ) -> Result<ScanPage, GatewayError> {
        let request = self.get(endpoint).query(&[
            (key, value.to_string()),
            ("page", page.saturating_add(1).to_string()),
            ("page_size", page_size.to_string()),
        ]);
        let remote: RemoteScanPage = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(ScanPage {
            total: remote.total_items,
            page,
            page_size,
            items: remote.items.into_iter().map(Entry::from).collect(),
        })
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, GatewayError> {
        let resp = builder
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(GatewayError::Status(resp.status().as_u16()));
        }
        Ok(resp)
    }
}

#[async_trait::async_trait]
impl FileGateway for HttpGateway {
    fn name(&self) -> &str {
        "http"
    }

    async fn try_list(&self, path: &str) -> Result<Vec<Entry>, GatewayError> {
        let resp = self.send(self.get("files").query(&[("path", path)])).await?;
        let remote: Vec<RemoteEntry> = resp
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(remote.into_iter().map(Entry::from).collect())
    }

    async fn try_get_content(&self, path: &str) -> Result<Vec<u8>, GatewayError> {
        let resp = self
            .send(self.get("download").query(&[("path", path)]))
            .await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn scan_page(&self, path: &str, page: usize, page_size: usize) -> Option<ScanPage> {
        if !self.server_side_scan {
            return None;
        }
        match self.remote_page("scan", ("path", path), page, page_size).await {
            Ok(result) => Some(result),
            Err(e) => {
                debug!(path, page, error = %e, "server scan unavailable");
                None
            }
        }
    }

    async fn search(&self, query: &str, page: usize, page_size: usize) -> Option<ScanPage> {
        match self.remote_page("search", ("query", query), page, page_size).await {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(query, page, error = %e, "server search failed");
                None
            }
        }
    }

    async fn metadata(&self, path: &str) -> Option<Metadata> {
        let result: Result<Metadata, GatewayError> = async {
            let resp = self.send(self.get("metadata").query(&[("path", path)])).await?;
            resp.json()
                .await
                .map_err(|e| GatewayError::Decode(e.to_string()))
        }
        .await;
        match result {
            Ok(meta) => Some(meta.without_blanks()).filter(|m| !m.is_empty()),
            Err(e) => {
                debug!(path, error = %e, "server metadata unavailable");
                None
            }
        }
    }
}
