//! Conversion of daily climate-model archives into yearly Zarr series.
//!
//! Provides the pieces the `cmip-downloader` service drives:
//!
//! - Mirrored fetching of archives with resumable `.partial` downloads
//! - Decoding through [`netcdf_parser`] into canonical space-major arrays
//! - Stitching of monthly archives into a year, one location batch at a time
//! - Derivation of relative humidity for models that publish only specific
//!   humidity, using a per-model surface elevation
//! - Storage of one time-major series per (variable, year) via [`series_store`]
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cmip_catalog::Model;
//! use ingestion::{ConversionPipeline, FetchConfig, MirroredFetcher, PipelineConfig};
//!
//! # async fn run() -> ingestion::Result<()> {
//! let fetcher = MirroredFetcher::new(&FetchConfig::default())?;
//! let pipeline = ConversionPipeline::new(Arc::new(fetcher), PipelineConfig::default());
//! let report = pipeline.run(Model::MRI_AGCM3_2_S).await?;
//! assert!(!report.has_failures());
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod config;
pub mod derived;
pub mod elevation;
pub mod error;
pub mod fetch;
pub mod pipeline;

pub use assembler::{AssembledBatches, TimeSeriesAssembler};
pub use config::{FetchConfig, ModelPaths, PipelineConfig};
pub use derived::{relative_humidity, RelativeHumidityInputs};
pub use elevation::{write_elevation, ElevationRegistry, OCEAN_ELEVATION};
pub use error::{FetchError, IngestionError, Result};
pub use fetch::{ArchiveFetcher, FetchOutcome, MirroredFetcher};
pub use pipeline::{ConversionPipeline, PipelineReport, Task, TaskOutcome};
