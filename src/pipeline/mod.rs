// Fetch -> normalize -> aggregate -> render, run once and in order

pub mod aggregate;
pub mod normalize;

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::apis::neo_feed::NeoFeedApi;
use crate::app::ports::ChartRendererPort;
use crate::charts::ChartBuilder;
use crate::constants::FEED_DATE_FORMAT;
use crate::error::Result;
use crate::metrics::PipelineMetrics;
use crate::types::AsteroidApproachRecord;

pub use normalize::{normalize_feed, FeedNormalizer, NormalizeOutcome, RecordPolicy};

/// Result of a complete pipeline run
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub total_objects: usize,
    pub records: Vec<AsteroidApproachRecord>,
    /// Objects dropped during normalization, one message each.
    pub skipped: Vec<String>,
    pub charts: Vec<PathBuf>,
    /// Chart render failures; these do not abort the run.
    pub errors: Vec<String>,
}

pub struct Pipeline;

impl Pipeline {
    /// Fetch the feed and flatten it. Fetch and structural parse failures abort.
    #[instrument(skip(api))]
    pub async fn fetch_records(api: &NeoFeedApi) -> Result<NormalizeOutcome> {
        let t_fetch = Instant::now();
        let feed = api.fetch_feed().await?;
        PipelineMetrics::record_fetch(t_fetch.elapsed().as_secs_f64());

        let outcome = normalize_feed(&feed)?;
        PipelineMetrics::record_normalized(outcome.records.len(), outcome.skipped.len());

        if let Some(reported) = outcome.count_mismatch() {
            warn!(
                reported,
                seen = outcome.total_objects,
                "Feed element_count does not match objects listed"
            );
        }
        info!(
            "Normalized {} records ({} skipped)",
            outcome.records.len(),
            outcome.skipped.len()
        );
        Ok(outcome)
    }

    /// Build and render every chart. A failed write is recorded and the rest still run.
    pub fn render_charts(
        records: &[AsteroidApproachRecord],
        builder: &ChartBuilder,
        renderer: &dyn ChartRendererPort,
    ) -> Result<(Vec<PathBuf>, Vec<String>)> {
        let specs = builder.build_all(records)?;
        if specs.is_empty() {
            info!("No records to chart");
        }

        let mut written = Vec::new();
        let mut errors = Vec::new();
        for spec in &specs {
            match renderer.render(spec) {
                Ok(path) => {
                    PipelineMetrics::record_chart_rendered();
                    info!("Rendered {} to {}", spec.id, path.display());
                    written.push(path);
                }
                Err(e) => {
                    error!("Failed to render chart {}: {}", spec.id, e);
                    errors.push(format!("chart {}: {}", spec.id, e));
                }
            }
        }
        Ok((written, errors))
    }

    /// Run the complete pipeline: one fetch, then normalization and charts.
    #[instrument(skip_all)]
    pub async fn run(
        api: &NeoFeedApi,
        builder: &ChartBuilder,
        renderer: &dyn ChartRendererPort,
    ) -> Result<PipelineResult> {
        let t_pipeline = Instant::now();
        let outcome = Self::fetch_records(api).await?;
        let (charts, errors) = Self::render_charts(&outcome.records, builder, renderer)?;
        PipelineMetrics::record_pipeline(t_pipeline.elapsed().as_secs_f64());

        Ok(PipelineResult {
            total_objects: outcome.total_objects,
            records: outcome.records,
            skipped: outcome.skipped.iter().map(|e| e.to_string()).collect(),
            charts,
            errors,
        })
    }

    /// Write the records as pretty JSON named after the requested range.
    pub fn persist_records(
        records: &[AsteroidApproachRecord],
        output_dir: &Path,
        api: &NeoFeedApi,
    ) -> Result<PathBuf> {
        fs::create_dir_all(output_dir)?;

        let config = api.config();
        let filename = format!(
            "neo_records_{}_{}.json",
            config.start_date.format(FEED_DATE_FORMAT),
            config.end_date.format(FEED_DATE_FORMAT)
        );
        let filepath = output_dir.join(filename);

        let json_content = serde_json::to_string_pretty(records)?;
        fs::write(&filepath, json_content)?;

        Ok(filepath)
    }
}
