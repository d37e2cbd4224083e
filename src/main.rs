use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use neo_watch::apis::neo_feed::NeoFeedApi;
use neo_watch::charts::ChartBuilder;
use neo_watch::config::{parse_date, Config, DateOverrides};
use neo_watch::infra::chart_writer::HtmlChartWriter;
use neo_watch::infra::http_client::ReqwestHttp;
use neo_watch::logging;
use neo_watch::metrics;
use neo_watch::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "neo_watch")]
#[command(about = "Near-Earth-object close-approach fetcher and chart generator")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RangeArgs {
    /// First day of the feed (YYYY-MM-DD). Overrides START_DATE
    #[arg(long, value_parser = parse_cli_date)]
    start_date: Option<NaiveDate>,
    /// Last day of the feed (YYYY-MM-DD). Overrides END_DATE
    #[arg(long, value_parser = parse_cli_date)]
    end_date: Option<NaiveDate>,
    /// TOML file with chart and output settings
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and normalize the feed, then write the records as JSON
    Fetch {
        #[command(flatten)]
        range: RangeArgs,
        /// Print the records to stdout instead of writing a file
        #[arg(long)]
        stdout: bool,
    },
    /// Fetch, normalize and render every chart
    Run {
        #[command(flatten)]
        range: RangeArgs,
    },
}

fn parse_cli_date(value: &str) -> Result<NaiveDate, String> {
    parse_date("date", value).map_err(|e| e.to_string())
}

fn load_config(range: &RangeArgs) -> anyhow::Result<Config> {
    let dates = DateOverrides {
        start_date: range.start_date,
        end_date: range.end_date,
    };
    Ok(Config::load(range.config.as_deref(), dates)?)
}

fn feed_api(config: &Config) -> anyhow::Result<NeoFeedApi> {
    let http = ReqwestHttp::new(config.feed.timeout_secs)?;
    Ok(NeoFeedApi::new(Arc::new(http), config.feed.clone()))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let _log_guard = logging::init_logging();
    let metrics_handle = metrics::init_metrics();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch { range, stdout } => {
            let config = load_config(&range)?;
            let api = feed_api(&config)?;
            println!(
                "📡 Fetching NEO feed for {} to {}...",
                config.feed.start_date, config.feed.end_date
            );

            let outcome = Pipeline::fetch_records(&api).await?;
            if stdout {
                println!("{}", serde_json::to_string_pretty(&outcome.records)?);
            } else {
                let output_dir = &config.charts.output_dir;
                let path = Pipeline::persist_records(&outcome.records, output_dir, &api)?;
                println!("💾 Saved {} records to {}", outcome.records.len(), path.display());
                if let Some(handle) = metrics_handle {
                    metrics::write_snapshot(handle, output_dir)?;
                }
            }
            if !outcome.skipped.is_empty() {
                println!("⚠️  Skipped {} malformed objects", outcome.skipped.len());
            }
        }
        Commands::Run { range } => {
            let config = load_config(&range)?;
            let api = feed_api(&config)?;
            let builder = ChartBuilder::new(config.charts.clone());
            let renderer = HtmlChartWriter::new(&config.charts.output_dir);
            println!(
                "🚀 Running NEO pipeline for {} to {}...",
                config.feed.start_date, config.feed.end_date
            );

            match Pipeline::run(&api, &builder, &renderer).await {
                Ok(result) => {
                    info!("Pipeline finished");
                    println!("\n📊 Pipeline Results:");
                    println!("   Objects in feed: {}", result.total_objects);
                    println!("   Records: {}", result.records.len());
                    println!("   Skipped: {}", result.skipped.len());
                    println!("   Charts: {}", result.charts.len());
                    for chart in &result.charts {
                        println!("   - {}", chart.display());
                    }

                    if !result.errors.is_empty() {
                        warn!("{} errors encountered during pipeline run", result.errors.len());
                        println!("\n⚠️  Errors encountered:");
                        for error in &result.errors {
                            println!("   - {}", error);
                        }
                    }
                }
                Err(e) => {
                    error!("Pipeline failed: {}", e);
                    return Err(e.into());
                }
            }

            if let Some(handle) = metrics_handle {
                let path = metrics::write_snapshot(handle, &config.charts.output_dir)?;
                println!("📈 Metrics written to {}", path.display());
            }
        }
    }
    Ok(())
}
