//! Resolves comic titles to cover image URLs.
//!
//! A lookup normalizes the title, consults the poster cache and, on a miss,
//! walks a query-narrowing ladder against the [`PosterProvider`]: the full
//! title first, then ever shorter word prefixes, stopping at the first match.
//! Matches are cached under the hash of the full normalized title.
//!
//! Concurrent lookups of the same normalized title share one provider walk.

use crate::cache::{now_millis, title_key, ContentCache};
use crate::title;
use providers::{Entry, PosterProvider};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

const MIN_QUERY_CHARS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Resolution {
    url: Option<String>,
    /// The provider was contacted to produce this result.
    queried: bool,
}

type Flight = Arc<OnceCell<Resolution>>;

pub struct PosterResolver {
    provider: Arc<dyn PosterProvider>,
    cache: ContentCache,
    negative_ttl: Option<Duration>,
    in_flight: Mutex<HashMap<String, Flight>>,
}

impl PosterResolver {
    pub fn new(provider: Arc<dyn PosterProvider>, cache: ContentCache) -> Self {
        Self {
            provider,
            cache,
            negative_ttl: None,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Remember "no match" outcomes for `ttl`. Provider failures are never
    /// remembered.
    pub fn with_negative_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.negative_ttl = ttl;
        self
    }

    pub async fn resolve(&self, raw_title: &str) -> Option<String> {
        self.resolve_inner(raw_title).await.url
    }

    async fn resolve_inner(&self, raw_title: &str) -> Resolution {
        let normalized = title::clean(raw_title);
        if normalized.trim().chars().count() < MIN_QUERY_CHARS {
            debug!(raw_title, "title too short to resolve");
            return Resolution {
                url: None,
                queried: false,
            };
        }
        let key = title_key(&normalized);

        let flight = match self.in_flight.lock() {
            Ok(mut map) => map.entry(key.clone()).or_default().clone(),
            Err(_) => Arc::new(OnceCell::new()),
        };
        let resolution = flight
            .get_or_init(|| self.lookup(&normalized, &key))
            .await
            .clone();
        if let Ok(mut map) = self.in_flight.lock() {
            if map.get(&key).is_some_and(|f| Arc::ptr_eq(f, &flight)) {
                map.remove(&key);
            }
        }
        resolution
    }

    async fn lookup(&self, normalized: &str, key: &str) -> Resolution {
        if let Some(row) = self.cache.poster(key).await {
            match row.poster_url {
                Some(url) => {
                    debug!(title = normalized, "poster cache hit");
                    return Resolution {
                        url: Some(url),
                        queried: false,
                    };
                }
                None if self.negative_is_fresh(row.cached_at) => {
                    debug!(title = normalized, "cached miss");
                    return Resolution {
                        url: None,
                        queried: false,
                    };
                }
                None => {}
            }
        }

        let words: Vec<&str> = normalized.split_whitespace().collect();
        let mut provider_failed = false;
        for k in (1..=words.len()).rev() {
            let candidate = words[..k].join(" ");
            if candidate.chars().count() < MIN_QUERY_CHARS {
                continue;
            }
            match self.provider.search_cover(&candidate).await {
                Ok(Some(url)) => {
                    info!(title = normalized, query = %candidate, "poster resolved");
                    self.cache.store_poster(key, Some(&url)).await;
                    return Resolution {
                        url: Some(url),
                        queried: true,
                    };
                }
                Ok(None) => debug!(query = %candidate, "no cover match"),
                Err(e) => {
                    warn!(query = %candidate, error = %e, "cover search failed");
                    provider_failed = true;
                }
            }
        }

        if self.negative_ttl.is_some() && !provider_failed {
            self.cache.store_poster(key, None).await;
        }
        Resolution {
            url: None,
            queried: true,
        }
    }

    fn negative_is_fresh(&self, cached_at: i64) -> bool {
        match self.negative_ttl {
            Some(ttl) => {
                let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
                now_millis() < cached_at.saturating_add(ttl_ms)
            }
            None => false,
        }
    }

    /// Attaches poster URLs to `entries`, pausing for `pacing` after every
    /// entry that had to go to the provider.
    pub async fn enrich(&self, entries: &mut [Entry], pacing: Duration) {
        let last = entries.len().saturating_sub(1);
        for (i, entry) in entries.iter_mut().enumerate() {
            if entry
                .metadata
                .as_ref()
                .is_some_and(|m| m.poster_url.is_some())
            {
                continue;
            }
            let resolution = self.resolve_inner(&entry.name).await;
            if let Some(url) = resolution.url {
                entry.metadata.get_or_insert_with(Default::default).poster_url = Some(url);
            }
            if resolution.queried && i < last && !pacing.is_zero() {
                tokio::time::sleep(pacing).await;
            }
        }
    }
}
