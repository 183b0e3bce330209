use crate::{PosterProvider, ProviderError};

#[derive(Debug, Default)]
pub struct NoopProvider;

#[async_trait::async_trait]
impl PosterProvider for NoopProvider {
    async fn search_cover(&self, _query: &str) -> Result<Option<String>, ProviderError> {
        Ok(None)
    }
}
