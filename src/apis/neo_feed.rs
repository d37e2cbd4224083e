use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::app::ports::HttpClientPort;
use crate::config::FeedConfig;
use crate::error::{NeoError, Result};
use crate::types::NeoFeed;

/// Longest slice of an error body quoted back in a fetch failure.
const BODY_EXCERPT_CHARS: usize = 200;

/// Client for the date-bounded NEO feed.
pub struct NeoFeedApi {
    http: Arc<dyn HttpClientPort>,
    config: FeedConfig,
}

impl NeoFeedApi {
    pub fn new(http: Arc<dyn HttpClientPort>, config: FeedConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Issue one request for the configured range. No retries.
    #[instrument(skip(self), fields(start = %self.config.start_date, end = %self.config.end_date))]
    pub async fn fetch_feed(&self) -> Result<NeoFeed> {
        self.config.validate()?;

        info!(url = %self.config.redacted_url(), "Requesting NEO feed");
        let response = self
            .http
            .get(&self.config.feed_url())
            .await
            .map_err(|message| NeoError::Fetch { message })?;

        if !response.is_success() {
            warn!(status = response.status, "Feed returned non-success status");
            return Err(NeoError::Fetch {
                message: format!("status {}: {}", response.status, excerpt(&response.bytes)),
            });
        }

        debug!(
            bytes = response.bytes.len(),
            content_type = %response.content_type,
            "Feed response received"
        );
        let feed = NeoFeed::from_bytes(&response.bytes)?;
        info!(element_count = ?feed.element_count(), "Feed parsed");
        Ok(feed)
    }
}

fn excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    if trimmed.chars().count() > BODY_EXCERPT_CHARS {
        format!("{}...", trimmed.chars().take(BODY_EXCERPT_CHARS).collect::<String>())
    } else {
        trimmed.to_string()
    }
}
