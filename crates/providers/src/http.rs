use crate::{ImageSource, ProviderError};
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub total: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            total: Duration::from_secs(10),
        }
    }
}

pub fn build_client(timeouts: HttpTimeouts) -> Result<Client, ProviderError> {
    Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.total)
        .build()
        .map_err(|e| ProviderError::RequestFailed(e.to_string()))
}

/// Plain HTTP GET for cover images.
#[derive(Clone)]
pub struct HttpImageSource {
    client: Client,
}

impl HttpImageSource {
    pub fn new(timeouts: HttpTimeouts) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(timeouts)?,
        })
    }
}

#[async_trait::async_trait]
impl ImageSource for HttpImageSource {
    async fn get(&self, url: &str) -> Result<Bytes, ProviderError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            debug!(url, status = status.as_u16(), "image request rejected");
            return Err(ProviderError::Status(status.as_u16()));
        }
        resp.bytes()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))
    }
}
