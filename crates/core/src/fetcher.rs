use crate::cache::ContentCache;
use providers::{FileGateway, ImageSource};
use std::sync::Arc;
use tracing::{debug, warn};

/// Downloads poster images and keeps them in the blob store.
///
/// `http(s)://` URLs go through the [`ImageSource`]; anything else is taken
/// as a path inside the file tree and read through the gateway.
pub struct ImageFetcher {
    source: Arc<dyn ImageSource>,
    gateway: Arc<dyn FileGateway>,
    cache: ContentCache,
}

impl ImageFetcher {
    pub fn new(
        source: Arc<dyn ImageSource>,
        gateway: Arc<dyn FileGateway>,
        cache: ContentCache,
    ) -> Self {
        Self {
            source,
            gateway,
            cache,
        }
    }

    pub async fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        if url.trim().is_empty() {
            return None;
        }
        if let Some(bytes) = self.cache.blob(url).await {
            debug!(url, "image cache hit");
            return Some(bytes);
        }

        let bytes = if is_remote(url) {
            match self.source.get(url).await {
                Ok(bytes) => bytes.to_vec(),
                Err(e) => {
                    debug!(url, error = %e, "image download failed");
                    return None;
                }
            }
        } else {
            self.gateway.get_content(url).await
        };

        if bytes.is_empty() || !infer::is_image(&bytes) {
            warn!(url, len = bytes.len(), "payload is not an image, skipping");
            return None;
        }
        self.cache.store_blob(url, &bytes).await;
        Some(bytes)
    }
}

fn is_remote(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
