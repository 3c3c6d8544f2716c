//! Command line arguments and their mapping onto pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cmip_catalog::{Model, Variable};
use ingestion::{FetchConfig, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "cmip-downloader")]
#[command(about = "Convert CMIP6 HighResMIP daily archives into yearly per-location series")]
pub struct Args {
    /// Model to convert, e.g. MRI_AGCM3_2_S
    #[arg(value_parser = parse_model)]
    pub model: Model,

    /// First year to convert
    #[arg(long, env = "CMIP_START_YEAR", default_value = "1950")]
    pub start_year: i32,

    /// Last year to convert (inclusive)
    #[arg(long, env = "CMIP_END_YEAR", default_value = "2050")]
    pub end_year: i32,

    /// Root directory for downloads and converted series
    #[arg(long, env = "CMIP_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Keep downloaded archives and monthly scratch arrays
    #[arg(long)]
    pub keep_intermediates: bool,

    /// Only convert these variables (repeatable)
    #[arg(long = "variable", value_parser = parse_variable)]
    pub variables: Vec<Variable>,

    /// Maximum (variable, year) tasks converted at once
    #[arg(long, env = "CMIP_MAX_CONCURRENT_TASKS", default_value = "1")]
    pub max_concurrent: usize,

    /// Locations assembled per batch when stitching monthly archives
    #[arg(long, env = "CMIP_LOCATIONS_PER_BATCH", default_value = "6000")]
    pub locations_per_batch: usize,

    /// Mirror base URL, tried in the order given (repeatable)
    #[arg(long = "mirror", env = "CMIP_MIRRORS", value_delimiter = ',')]
    pub mirrors: Vec<String>,

    /// Request timeout in seconds
    #[arg(long, env = "CMIP_REQUEST_TIMEOUT_SECS")]
    pub request_timeout: Option<u64>,

    /// Write the run report as JSON to this file
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,
}

fn parse_model(s: &str) -> Result<Model, String> {
    s.parse().map_err(|e| format!("{e}"))
}

fn parse_variable(s: &str) -> Result<Variable, String> {
    s.parse().map_err(|e| format!("{e}"))
}

impl Args {
    /// Pipeline settings: environment defaults overridden by the flags.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        self.overlay(PipelineConfig::from_env())
    }

    /// Apply the flags on top of `base`. Without `--keep-intermediates`
    /// the base decides whether intermediates are deleted.
    fn overlay(&self, base: PipelineConfig) -> Result<PipelineConfig> {
        let config = PipelineConfig {
            data_dir: self.data_dir.clone(),
            start_year: self.start_year,
            end_year: self.end_year,
            delete_intermediates: base.delete_intermediates && !self.keep_intermediates,
            locations_per_batch: self.locations_per_batch,
            max_concurrent_tasks: self.max_concurrent,
            variables: (!self.variables.is_empty()).then(|| self.variables.clone()),
            ..base
        };
        if let Err(e) = config.validate() {
            bail!("invalid pipeline configuration: {e}");
        }
        Ok(config)
    }

    pub fn fetch_config(&self) -> Result<FetchConfig> {
        let mut config = FetchConfig::default();
        if !self.mirrors.is_empty() {
            config.mirrors = self.mirrors.clone();
        }
        if let Some(secs) = self.request_timeout {
            config.request_timeout = Duration::from_secs(secs);
        }
        config
            .validate()
            .map_err(anyhow::Error::msg)
            .context("invalid fetch configuration")?;
        Ok(config)
    }
}
