use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::error::{NeoError, Result};

/// Everything a run needs: the feed request and the chart settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub feed: FeedConfig,
    pub charts: ChartConfig,
}

impl Config {
    /// Read the feed settings from the environment and the chart settings
    /// from an optional TOML file. Dates given in `dates` win over the
    /// environment, which then only has to supply the missing bound.
    pub fn load(chart_config_path: Option<&Path>, dates: DateOverrides) -> Result<Self> {
        let feed = FeedConfig::from_env(dates)?;
        let charts = match chart_config_path {
            Some(path) => ChartConfig::load(path)?,
            None => ChartConfig::default(),
        };
        Ok(Self { feed, charts })
    }
}

/// Range bounds passed on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateOverrides {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Request parameters for the date-bounded feed.
#[derive(Clone)]
pub struct FeedConfig {
    pub api_key: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl FeedConfig {
    pub fn new(
        api_key: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self> {
        let config = Self {
            api_key: api_key.into(),
            start_date,
            end_date,
            base_url: constants::DEFAULT_FEED_URL.to_string(),
            timeout_secs: constants::DEFAULT_HTTP_TIMEOUT_SECS,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_env(dates: DateOverrides) -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), dates)
    }

    /// Build from any key/value source. `from_env` passes `std::env::var`.
    ///
    /// A date present in `dates` is used as is and its variable is never read.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        dates: DateOverrides,
    ) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| NeoError::Config(format!("{} is not set", key)))
        };
        let date = |key: &str, given: Option<NaiveDate>| -> Result<NaiveDate> {
            match given {
                Some(date) => Ok(date),
                None => parse_date(key, &required(key)?),
            }
        };

        let api_key = required(constants::ENV_API_KEY)?;
        let start_date = date(constants::ENV_START_DATE, dates.start_date)?;
        let end_date = date(constants::ENV_END_DATE, dates.end_date)?;

        let base_url = lookup(constants::ENV_FEED_URL)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| constants::DEFAULT_FEED_URL.to_string());

        let timeout_secs = match lookup(constants::ENV_HTTP_TIMEOUT) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                NeoError::Config(format!(
                    "{} must be a whole number of seconds: {}",
                    constants::ENV_HTTP_TIMEOUT,
                    e
                ))
            })?,
            None => constants::DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let config = Self {
            api_key,
            start_date,
            end_date,
            base_url,
            timeout_secs,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(NeoError::Config("API key is empty".to_string()));
        }
        if self.start_date > self.end_date {
            return Err(NeoError::Config(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        Ok(())
    }

    pub fn feed_url(&self) -> String {
        self.url_with_key(&self.api_key)
    }

    /// The request URL with the key masked, for logs.
    pub fn redacted_url(&self) -> String {
        self.url_with_key("***")
    }

    fn url_with_key(&self, key: &str) -> String {
        format!(
            "{}?start_date={}&end_date={}&api_key={}",
            self.base_url.trim_end_matches('/'),
            self.start_date.format(constants::FEED_DATE_FORMAT),
            self.end_date.format(constants::FEED_DATE_FORMAT),
            key
        )
    }
}

impl fmt::Debug for FeedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedConfig")
            .field("api_key", &"***")
            .field("start_date", &self.start_date)
            .field("end_date", &self.end_date)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), constants::FEED_DATE_FORMAT).map_err(|e| {
        NeoError::Config(format!(
            "{} '{}' is not a YYYY-MM-DD date: {}",
            field, value, e
        ))
    })
}

/// Output settings for the rendered charts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub output_dir: PathBuf,
    /// Image paths cycled over the daily-minimum points. Empty disables them.
    pub marker_images: Vec<String>,
    /// Marker image extent in data units on both axes.
    pub marker_image_size: f64,
    pub diameter_bins: usize,
    pub zoom_bins: usize,
    pub zoom_smallest: usize,
    pub first_n_by_date: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(constants::DEFAULT_OUTPUT_DIR),
            marker_images: constants::default_marker_images(),
            marker_image_size: 4e7,
            diameter_bins: constants::DIAMETER_BINS,
            zoom_bins: constants::ZOOM_DIAMETER_BINS,
            zoom_smallest: constants::ZOOM_SMALLEST_COUNT,
            first_n_by_date: constants::FIRST_N_BY_DATE,
        }
    }
}

impl ChartConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            NeoError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: ChartConfig = toml::from_str(&content)?;
        if config.diameter_bins == 0 || config.zoom_bins == 0 {
            return Err(NeoError::Config("bin counts must be at least 1".to_string()));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_reads_required_values() {
        let config = FeedConfig::from_lookup(
            lookup_from(&[
                ("NASA_API_KEY", "DEMO_KEY"),
                ("START_DATE", "2024-01-01"),
                ("END_DATE", "2024-01-07"),
            ]),
            DateOverrides::default(),
        )
        .unwrap();

        assert_eq!(config.api_key, "DEMO_KEY");
        assert_eq!(config.start_date.to_string(), "2024-01-01");
        assert_eq!(config.base_url, constants::DEFAULT_FEED_URL);
        assert_eq!(config.timeout_secs, constants::DEFAULT_HTTP_TIMEOUT_SECS);
        assert_eq!(
            config.feed_url(),
            concat!(
                "https://api.nasa.gov/neo/rest/v1/feed",
                "?start_date=2024-01-01&end_date=2024-01-07&api_key=DEMO_KEY"
            )
        );
        assert!(!config.redacted_url().contains("DEMO_KEY"));
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let err = FeedConfig::from_lookup(
            lookup_from(&[
                ("START_DATE", "2024-01-01"),
                ("END_DATE", "2024-01-07"),
            ]),
            DateOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, NeoError::Config(msg) if msg.contains("NASA_API_KEY")));
    }

    #[test]
    fn test_reversed_range_rejected() {
        let err = FeedConfig::from_lookup(
            lookup_from(&[
                ("NASA_API_KEY", "k"),
                ("START_DATE", "2024-01-08"),
                ("END_DATE", "2024-01-01"),
            ]),
            DateOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, NeoError::Config(_)));
    }

    #[test]
    fn test_bad_date_format_rejected() {
        let err = FeedConfig::from_lookup(
            lookup_from(&[
                ("NASA_API_KEY", "k"),
                ("START_DATE", "01/01/2024"),
                ("END_DATE", "2024-01-07"),
            ]),
            DateOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, NeoError::Config(msg) if msg.contains("START_DATE")));
    }

    fn overrides(start: Option<NaiveDate>, end: Option<NaiveDate>) -> DateOverrides {
        DateOverrides {
            start_date: start,
            end_date: end,
        }
    }

    #[test]
    fn test_cli_dates_stand_in_for_missing_env_dates() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        let config = FeedConfig::from_lookup(
            lookup_from(&[("NASA_API_KEY", "k")]),
            overrides(Some(start), Some(end)),
        )
        .unwrap();

        assert_eq!(config.start_date, start);
        assert_eq!(config.end_date, end);
    }

    #[test]
    fn test_cli_dates_win_over_malformed_env_dates() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        let config = FeedConfig::from_lookup(
            lookup_from(&[
                ("NASA_API_KEY", "k"),
                ("START_DATE", "yesterday"),
                ("END_DATE", "2024-13-40"),
            ]),
            overrides(Some(start), Some(end)),
        )
        .unwrap();

        assert_eq!(config.start_date, start);
        assert_eq!(config.end_date, end);
    }

    #[test]
    fn test_one_cli_date_merges_with_env_and_range_is_checked() {
        let end = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        let config = FeedConfig::from_lookup(
            lookup_from(&[("NASA_API_KEY", "k"), ("START_DATE", "2024-01-05")]),
            overrides(None, Some(end)),
        )
        .unwrap();
        assert_eq!(config.start_date.to_string(), "2024-01-05");
        assert_eq!(config.end_date, end);

        let early = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let err = FeedConfig::from_lookup(
            lookup_from(&[("NASA_API_KEY", "k"), ("START_DATE", "2024-01-05")]),
            overrides(None, Some(early)),
        )
        .unwrap_err();
        assert!(matches!(err, NeoError::Config(msg) if msg.contains("after")));

        let err = FeedConfig::from_lookup(
            lookup_from(&[("NASA_API_KEY", "k")]),
            overrides(None, Some(end)),
        )
        .unwrap_err();
        assert!(matches!(err, NeoError::Config(msg) if msg.contains("START_DATE")));
    }

    #[test]
    fn test_feed_url_override() {
        let config = FeedConfig::from_lookup(
            lookup_from(&[
                ("NASA_API_KEY", "k"),
                ("START_DATE", "2024-01-01"),
                ("END_DATE", "2024-01-02"),
                ("NEO_FEED_URL", " http://localhost:8080/feed/ "),
            ]),
            DateOverrides::default(),
        )
        .unwrap();

        assert_eq!(config.base_url, "http://localhost:8080/feed/");
        assert_eq!(
            config.feed_url(),
            "http://localhost:8080/feed?start_date=2024-01-01&end_date=2024-01-02&api_key=k"
        );
    }

    #[test]
    fn test_timeout_parsing() {
        let base = [
            ("NASA_API_KEY", "k"),
            ("START_DATE", "2024-01-01"),
            ("END_DATE", "2024-01-02"),
        ];

        let mut pairs = base.to_vec();
        pairs.push(("NEO_HTTP_TIMEOUT_SECS", " 5 "));
        let config =
            FeedConfig::from_lookup(lookup_from(&pairs), DateOverrides::default()).unwrap();
        assert_eq!(config.timeout_secs, 5);

        let mut pairs = base.to_vec();
        pairs.push(("NEO_HTTP_TIMEOUT_SECS", "soon"));
        let err =
            FeedConfig::from_lookup(lookup_from(&pairs), DateOverrides::default()).unwrap_err();
        assert!(matches!(err, NeoError::Config(msg) if msg.contains("NEO_HTTP_TIMEOUT_SECS")));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let config = FeedConfig::new("secret-key", start, start).unwrap();
        assert!(!format!("{:?}", config).contains("secret-key"));
    }

    #[test]
    fn test_chart_config_partial_toml_uses_defaults() {
        let config: ChartConfig =
            toml::from_str("output_dir = \"charts\"\nzoom_bins = 4\n").unwrap();
        assert_eq!(config.output_dir, PathBuf::from("charts"));
        assert_eq!(config.zoom_bins, 4);
        assert_eq!(config.diameter_bins, constants::DIAMETER_BINS);
        assert_eq!(config.marker_images.len(), 7);
    }

    #[test]
    fn test_chart_config_load_rejects_zero_bins() {
        let dir = tempfile::tempdir().unwrap();

        let path = dir.path().join("zero_bins.toml");
        fs::write(&path, "diameter_bins = 0\n").unwrap();
        assert!(matches!(ChartConfig::load(&path), Err(NeoError::Config(_))));

        let path = dir.path().join("zero_zoom.toml");
        fs::write(&path, "zoom_bins = 0\n").unwrap();
        assert!(matches!(ChartConfig::load(&path), Err(NeoError::Config(_))));

        let path = dir.path().join("ok.toml");
        fs::write(&path, "zoom_smallest = 20\n").unwrap();
        let config = ChartConfig::load(&path).unwrap();
        assert_eq!(config.zoom_smallest, 20);
        assert_eq!(config.zoom_bins, constants::ZOOM_DIAMETER_BINS);
    }

    #[test]
    fn test_chart_config_load_missing_file() {
        let err = ChartConfig::load(Path::new("/nonexistent/neo_watch.toml")).unwrap_err();
        assert!(matches!(err, NeoError::Config(msg) if msg.contains("neo_watch.toml")));
    }
}
