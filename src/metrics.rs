//! Run metrics for the NEO pipeline
//!
//! Names and descriptions live here so the pipeline code only calls the
//! `record_*` helpers. A short-lived run has nobody scraping it, so the
//! Prometheus text is written next to the charts when the run ends.

use ::metrics::Unit;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Once, OnceLock};
use tracing::{info, warn};

use crate::error::Result;

pub const FETCH_DURATION: &str = "neo_fetch_duration_seconds";
pub const RECORDS_NORMALIZED: &str = "neo_records_normalized_total";
pub const RECORDS_SKIPPED: &str = "neo_records_skipped_total";
pub const CHARTS_RENDERED: &str = "neo_charts_rendered_total";
pub const PIPELINE_DURATION: &str = "neo_pipeline_duration_seconds";

/// File written by [`write_snapshot`].
pub const SNAPSHOT_FILE: &str = "neo_metrics.prom";

static INIT: Once = Once::new();
static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder and describe every metric.
///
/// Idempotent. Returns `None` when another recorder is already installed.
pub fn init_metrics() -> Option<&'static PrometheusHandle> {
    INIT.call_once(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if HANDLE.set(handle).is_err() {
                warn!("Prometheus handle was already stored");
            }
            describe_metrics();
            info!("Prometheus recorder installed");
        }
        Err(e) => {
            warn!("Failed to install Prometheus recorder: {}", e);
        }
    });
    HANDLE.get()
}

/// Attach units and help text to the pipeline metrics on the active recorder.
pub fn describe_metrics() {
    ::metrics::describe_histogram!(
        FETCH_DURATION,
        Unit::Seconds,
        "Time spent on the feed request, including the body download"
    );
    ::metrics::describe_counter!(
        RECORDS_NORMALIZED,
        Unit::Count,
        "Feed objects turned into approach records"
    );
    ::metrics::describe_counter!(
        RECORDS_SKIPPED,
        Unit::Count,
        "Feed objects dropped because they could not become a record"
    );
    ::metrics::describe_counter!(
        CHARTS_RENDERED,
        Unit::Count,
        "Chart pages written successfully"
    );
    ::metrics::describe_histogram!(
        PIPELINE_DURATION,
        Unit::Seconds,
        "Wall time of a complete fetch, normalize and render run"
    );
}

/// Metric updates made by the pipeline.
pub struct PipelineMetrics;

impl PipelineMetrics {
    pub fn record_fetch(duration_secs: f64) {
        ::metrics::histogram!(FETCH_DURATION).record(duration_secs);
    }

    pub fn record_normalized(records: usize, skipped: usize) {
        ::metrics::counter!(RECORDS_NORMALIZED).increment(records as u64);
        ::metrics::counter!(RECORDS_SKIPPED).increment(skipped as u64);
    }

    pub fn record_chart_rendered() {
        ::metrics::counter!(CHARTS_RENDERED).increment(1);
    }

    pub fn record_pipeline(duration_secs: f64) {
        ::metrics::histogram!(PIPELINE_DURATION).record(duration_secs);
    }
}

/// Render the recorder's current state in Prometheus text format into
/// `<output_dir>/neo_metrics.prom`.
pub fn write_snapshot(handle: &PrometheusHandle, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(SNAPSHOT_FILE);
    fs::write(&path, handle.render())?;
    info!("Wrote metrics snapshot to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_snapshot_contains_recorded_values() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        ::metrics::with_local_recorder(&recorder, || {
            describe_metrics();
            PipelineMetrics::record_normalized(4, 1);
            PipelineMetrics::record_chart_rendered();
            PipelineMetrics::record_chart_rendered();
        });

        let dir = tempdir().unwrap();
        let path = write_snapshot(&handle, dir.path()).unwrap();
        assert_eq!(path, dir.path().join(SNAPSHOT_FILE));

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("neo_records_normalized_total 4"));
        assert!(text.contains("neo_records_skipped_total 1"));
        assert!(text.contains("neo_charts_rendered_total 2"));
        assert!(text.contains("# TYPE neo_charts_rendered_total counter"));
    }
}
