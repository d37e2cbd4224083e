//! Constants shared by the fetcher, the aggregations and the chart builders.

// NASA NeoWs feed endpoint
pub const DEFAULT_FEED_URL: &str = "https://api.nasa.gov/neo/rest/v1/feed";

// Feed date format for query parameters and close-approach dates
pub const FEED_DATE_FORMAT: &str = "%Y-%m-%d";

// Environment variable names
pub const ENV_API_KEY: &str = "NASA_API_KEY";
pub const ENV_START_DATE: &str = "START_DATE";
pub const ENV_END_DATE: &str = "END_DATE";
pub const ENV_FEED_URL: &str = "NEO_FEED_URL";
pub const ENV_HTTP_TIMEOUT: &str = "NEO_HTTP_TIMEOUT_SECS";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// Binning over the full table and over the zoomed low-diameter subset
pub const DIAMETER_BINS: usize = 3;
pub const ZOOM_DIAMETER_BINS: usize = 5;
pub const ZOOM_SMALLEST_COUNT: usize = 106;

// Daily-minimum chart re-plotted over the earliest records only
pub const FIRST_N_BY_DATE: usize = 60;

pub const DEFAULT_OUTPUT_DIR: &str = "output";

pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Marker images cycled over the daily-minimum points.
pub fn default_marker_images() -> Vec<String> {
    [
        "asteroid1.png",
        "asteroid2.png",
        "asteroid3.png",
        "asteroid4.png",
        "asteroid5-1.png",
        "asteroid6.png",
        "asteroid7.png",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
