//! AniList GraphQL cover search.

use crate::http::{build_client, HttpTimeouts};
use crate::{PosterProvider, ProviderError};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_ENDPOINT: &str = "https://graphql.anilist.co";

/// Title search, one result, adult content excluded.
const SEARCH_QUERY: &str = "query ($search: String) { \
Page(page: 1, perPage: 1) { \
media(search: $search, type: MANGA, isAdult: false) { \
coverImage { extraLarge } } } }";

#[derive(Clone)]
pub struct AniListConfig {
    pub endpoint: String,
    pub timeouts: HttpTimeouts,
}

impl Default for AniListConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeouts: HttpTimeouts::default(),
        }
    }
}

#[derive(Clone)]
pub struct AniListProvider {
    client: Client,
    cfg: Arc<AniListConfig>,
}

impl AniListProvider {
    pub fn new(cfg: AniListConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(cfg.timeouts)?,
            cfg: Arc::new(cfg),
        })
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'static str,
    variables: SearchVariables<'a>,
}

#[derive(Serialize)]
struct SearchVariables<'a> {
    search: &'a str,
}

/// `data.Page.media[0].coverImage.extraLarge`, ignoring blank URLs.
pub fn parse_cover(body: &serde_json::Value) -> Option<String> {
    body.pointer("/data/Page/media/0/coverImage/extraLarge")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[async_trait::async_trait]
impl PosterProvider for AniListProvider {
    async fn search_cover(&self, query: &str) -> Result<Option<String>, ProviderError> {
        let body = SearchRequest {
            query: SEARCH_QUERY,
            variables: SearchVariables { search: query },
        };

        let resp = self
            .client
            .post(&self.cfg.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(query, "cover search rate limited");
        }
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let parsed: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        let cover = parse_cover(&parsed);
        debug!(query, found = cover.is_some(), "cover search");
        Ok(cover)
    }
}
