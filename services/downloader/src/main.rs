//! CMIP6 HighResMIP downloader.
//!
//! Converts the daily archives of one climate model into yearly Zarr series
//! with one time-major series per location:
//! - Archives are fetched from ESGF mirrors, falling back on 404
//! - Completed (variable, year) outputs are skipped, so reruns resume
//! - The process exits non-zero when any task failed

mod config;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use config::Args;
use ingestion::{ConversionPipeline, MirroredFetcher};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args);

    netcdf_parser::silence_hdf5_errors();

    let pipeline_config = args.pipeline_config()?;
    let fetch_config = args.fetch_config()?;
    info!(
        model = %args.model,
        start_year = pipeline_config.start_year,
        end_year = pipeline_config.end_year,
        data_dir = %pipeline_config.data_dir.display(),
        mirrors = fetch_config.mirrors.len(),
        "Starting CMIP6 downloader"
    );

    let fetcher = Arc::new(MirroredFetcher::new(&fetch_config)?);
    let pipeline = ConversionPipeline::new(fetcher, pipeline_config);
    let report = pipeline.run(args.model).await?;

    info!(
        converted = report.converted.len(),
        skipped = report.skipped.len(),
        unsupported = report.unsupported.len(),
        failed = report.failed.len(),
        "Run complete"
    );

    if let Some(path) = &args.summary {
        let file = std::fs::File::create(path)
            .with_context(|| format!("failed to create summary {}", path.display()))?;
        serde_json::to_writer_pretty(file, &report)?;
    }

    if report.has_failures() {
        for (task, message) in &report.failed {
            error!(task = %task, error = %message, "Task did not complete");
        }
        bail!("{} of {} tasks failed", report.failed.len(), report.total());
    }
    Ok(())
}

fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let builder = fmt().with_env_filter(filter).with_target(true).with_thread_ids(true);
    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}
