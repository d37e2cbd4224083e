use async_trait::async_trait;
use std::path::PathBuf;

use crate::charts::ChartSpec;

// Fetch-side port
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpGetResult, String>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl HttpGetResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// Render-side port
pub trait ChartRendererPort: Send + Sync {
    /// Persist one chart and return where it landed.
    fn render(&self, chart: &ChartSpec) -> crate::error::Result<PathBuf>;
}
