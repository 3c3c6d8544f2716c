//! Conversion of (model, variable, year) tasks into yearly series.
//!
//! A task is skipped when its output already exists, so an interrupted run
//! resumes where it stopped. Otherwise the variable is converted with the
//! strategy the catalog assigns to the model:
//!
//! - **monthly**: twelve monthly archives are each decoded into a time-major
//!   scratch array, then assembled location-batch by location-batch into the
//!   yearly series.
//! - **yearly**: one archive (or the three inputs of a derived variable) is
//!   decoded and written in one go.
//!
//! Decoding, derivation and storage run on the blocking pool; only fetches
//! are awaited on the runtime.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cmip_catalog::{
    days_in_year_truncated, is_future, month_lengths, month_period, year_period, ArchiveUri,
    DerivedSource, Experiment, Model, TemporalResolution, Variable,
};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use netcdf_parser::{ArchiveIngestor, NetCdfError};
use series_store::{SeriesSpec, SeriesWriteResult, StoreConfig, TimeSeriesReader, TimeSeriesWriter};
use tracing::{debug, error, info, instrument, warn};

use crate::assembler::TimeSeriesAssembler;
use crate::config::{ModelPaths, PipelineConfig};
use crate::derived::{relative_humidity, RelativeHumidityInputs};
use crate::elevation::{write_elevation, ElevationRegistry};
use crate::error::Result;
use crate::fetch::{ArchiveFetcher, FetchOutcome};

/// One unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Task {
    pub model: Model,
    pub variable: Variable,
    pub year: i32,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.model, self.variable.as_str(), self.year)
    }
}

/// How a task ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Converted,
    /// The yearly output already existed.
    Skipped,
    /// The model does not publish the variable.
    Unsupported,
}

/// Summary of a pipeline run over one model.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub converted: Vec<Task>,
    pub skipped: Vec<Task>,
    pub unsupported: Vec<Task>,
    /// Failed tasks with the rendered error.
    pub failed: Vec<(Task, String)>,
}

impl PipelineReport {
    fn record(&mut self, task: Task, result: Result<TaskOutcome>) {
        match result {
            Ok(TaskOutcome::Converted) => self.converted.push(task),
            Ok(TaskOutcome::Skipped) => self.skipped.push(task),
            Ok(TaskOutcome::Unsupported) => self.unsupported.push(task),
            Err(e) => {
                error!(task = %task, error = %e, "Task failed");
                self.failed.push((task, e.to_string()));
            }
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.converted.len() + self.skipped.len() + self.unsupported.len() + self.failed.len()
    }
}

/// Drives fetching, decoding and storage for every selected task of a model.
pub struct ConversionPipeline {
    fetcher: Arc<dyn ArchiveFetcher>,
    config: PipelineConfig,
    elevation: ElevationRegistry,
}

impl ConversionPipeline {
    pub fn new(fetcher: Arc<dyn ArchiveFetcher>, config: PipelineConfig) -> Self {
        let mut elevation = ElevationRegistry::new();
        for model in Model::ALL {
            if model.orography_versions().is_some() {
                elevation.register(model, config.paths(model).elevation());
            }
        }
        Self {
            fetcher,
            config,
            elevation,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn elevation(&self) -> &ElevationRegistry {
        &self.elevation
    }

    /// Tasks of `model` in execution order: variable-major, years ascending.
    pub fn tasks(&self, model: Model) -> Vec<Task> {
        self.config
            .selected_variables()
            .into_iter()
            .flat_map(|variable| {
                self.config.years().map(move |year| Task {
                    model,
                    variable,
                    year,
                })
            })
            .collect()
    }

    /// Convert every selected (variable, year) of `model`.
    ///
    /// Individual task failures are collected in the report. Only setup
    /// failures (directories, elevation bootstrap) abort the run.
    #[instrument(skip_all, fields(model = %model))]
    pub async fn run(&self, model: Model) -> Result<PipelineReport> {
        let paths = self.config.paths(model);
        paths.create_all()?;
        self.ensure_elevation(model, &paths).await?;

        let tasks = self.tasks(model);
        info!(tasks = tasks.len(), concurrency = self.config.max_concurrent_tasks, "Starting conversion");

        let results: Vec<(Task, Result<TaskOutcome>)> = stream::iter(tasks)
            .map(|task| async move { (task, self.run_task(task).await) })
            .buffer_unordered(self.config.max_concurrent_tasks.max(1))
            .collect()
            .await;

        let mut report = PipelineReport::default();
        for (task, result) in results {
            report.record(task, result);
        }
        self.elevation.close(model).await;

        info!(
            converted = report.converted.len(),
            skipped = report.skipped.len(),
            unsupported = report.unsupported.len(),
            failed = report.failed.len(),
            "Conversion finished"
        );
        Ok(report)
    }

    /// Convert one task.
    #[instrument(skip_all, fields(task = %task))]
    pub async fn run_task(&self, task: Task) -> Result<TaskOutcome> {
        let paths = self.config.paths(task.model);
        let output = paths.yearly_output(task.variable, task.year);
        if output.exists() {
            debug!(path = %output.display(), "Output exists, skipping");
            return Ok(TaskOutcome::Skipped);
        }

        let result = match task.variable.temporal_resolution(task.model) {
            TemporalResolution::Unsupported => {
                debug!("Variable not published by model");
                return Ok(TaskOutcome::Unsupported);
            }
            TemporalResolution::Monthly => self.stitch_monthly(task, &paths, &output).await?,
            TemporalResolution::Yearly => self.convert_yearly(task, &paths, &output).await?,
        };

        info!(
            path = %result.path.display(),
            locations = result.shape[0],
            steps = result.shape[1],
            "Task converted"
        );
        Ok(TaskOutcome::Converted)
    }

    /// Make sure the model's elevation artifact exists.
    async fn ensure_elevation(&self, model: Model, paths: &ModelPaths) -> Result<()> {
        let Some(versions) = model.orography_versions() else {
            debug!("Model publishes no orography");
            return Ok(());
        };
        let output = paths.elevation();
        if output.exists() {
            return Ok(());
        }

        let altitude_path = paths.static_archive("orog");
        let land_path = paths.static_archive("sftlf");
        self.fetch(ArchiveUri::fixed(model, "orog", versions.altitude), &altitude_path)
            .await?;
        self.fetch(ArchiveUri::fixed(model, "sftlf", versions.land_mask), &land_path)
            .await?;

        let store = self.config.store.clone();
        let archives = [altitude_path, land_path];
        let inputs = archives.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let (altitude, shape) = ArchiveIngestor::read_with_shape(&inputs[0], "orog", None)?;
            let land = ArchiveIngestor::read(&inputs[1], "sftlf", None)?;
            write_elevation(&output, &store, model, shape, altitude, &land)
        })
        .await??;

        if self.config.delete_intermediates {
            remove_files(&archives).await;
        }
        Ok(())
    }

    /// Convert from twelve monthly archives.
    async fn stitch_monthly(
        &self,
        task: Task,
        paths: &ModelPaths,
        output: &Path,
    ) -> Result<SeriesWriteResult> {
        let short_name = task.variable.short_name();
        let version = task.variable.version(task.model, is_future(task.year));
        let experiment = Experiment::for_year(task.year);

        let mut intermediates = Vec::with_capacity(12);
        for (month, expected_steps) in (1..=12u32).zip(month_lengths(task.year)) {
            let intermediate = paths.monthly_intermediate(task.variable, task.year, month);
            intermediates.push(intermediate.clone());
            if intermediate.exists() {
                debug!(month, "Monthly intermediate exists");
                continue;
            }

            let archive = paths.monthly_archive(task.variable, task.year, month);
            let uri = ArchiveUri::daily(
                task.model,
                experiment,
                short_name,
                version,
                month_period(task.year, month)?,
            );
            self.fetch(uri, &archive).await?;

            let variable = task.variable;
            let store = self.config.store.clone();
            let locations_per_chunk = self.config.locations_per_batch;
            let delete_archive = self.config.delete_intermediates;
            tokio::task::spawn_blocking(move || {
                convert_month(
                    &store,
                    &archive,
                    variable,
                    expected_steps,
                    &intermediate,
                    locations_per_chunk,
                    delete_archive,
                )
            })
            .await??;
        }

        let total_steps = days_in_year_truncated(task.year);
        let store = self.config.store.clone();
        let batch_locations = self.config.locations_per_batch;
        let output = output.to_path_buf();
        let sources = intermediates.clone();
        let result = tokio::task::spawn_blocking(move || -> Result<SeriesWriteResult> {
            let readers = sources
                .iter()
                .map(|path| TimeSeriesReader::open(path))
                .collect::<series_store::Result<Vec<_>>>()?;
            let assembler = TimeSeriesAssembler::new(&readers, total_steps, batch_locations)?;
            let spec = output_spec(&store, task, assembler.n_locations(), total_steps);
            let writer = TimeSeriesWriter::new(store);
            Ok(writer.create(&output, spec)?.write_batches(assembler.batches())?)
        })
        .await??;

        if self.config.delete_intermediates {
            for path in &intermediates {
                if let Err(e) = tokio::fs::remove_dir_all(path).await {
                    warn!(path = %path.display(), error = %e, "Failed to remove intermediate");
                }
            }
        }
        Ok(result)
    }

    /// Convert from a single yearly archive, or derive from several.
    async fn convert_yearly(
        &self,
        task: Task,
        paths: &ModelPaths,
        output: &Path,
    ) -> Result<SeriesWriteResult> {
        let future = is_future(task.year);
        let experiment = Experiment::for_year(task.year);
        let period = year_period(task.year, task.model.last_day_of_year());
        let store = self.config.store.clone();
        let output = output.to_path_buf();

        let (archives, result) = match task.variable.derived_source(task.model) {
            None => {
                let short_name = task.variable.short_name();
                let archive = paths.yearly_archive(task.variable, task.year, short_name);
                let version = task.variable.version(task.model, future);
                self.fetch(
                    ArchiveUri::daily(task.model, experiment, short_name, version, period),
                    &archive,
                )
                .await?;

                let source = archive.clone();
                let result = tokio::task::spawn_blocking(move || -> Result<SeriesWriteResult> {
                    let array = ArchiveIngestor::read(
                        &source,
                        task.variable.short_name(),
                        task.variable.multiply_add(),
                    )?;
                    let series = array.transpose();
                    let spec = output_spec(&store, task, series.n_locations, series.n_time);
                    Ok(TimeSeriesWriter::new(store)
                        .create(&output, spec)?
                        .write_all(series.data)?)
                })
                .await??;
                (vec![archive], result)
            }
            Some(source) => {
                let mut archives = Vec::with_capacity(3);
                for input in source.inputs() {
                    let archive = paths.yearly_archive(task.variable, task.year, input.short_name);
                    let version = input.version_of.version(task.model, future);
                    self.fetch(
                        ArchiveUri::daily(
                            task.model,
                            experiment,
                            input.short_name,
                            version,
                            period.clone(),
                        ),
                        &archive,
                    )
                    .await?;
                    archives.push(archive);
                }
                let elevation = self.elevation.get(task.model).await?;

                let sources = archives.clone();
                let result = tokio::task::spawn_blocking(move || -> Result<SeriesWriteResult> {
                    let derived = derive(source, &sources, &elevation)?;
                    let series = derived.transpose();
                    let spec = output_spec(&store, task, series.n_locations, series.n_time);
                    Ok(TimeSeriesWriter::new(store)
                        .create(&output, spec)?
                        .write_all(series.data)?)
                })
                .await??;
                (archives, result)
            }
        };

        if self.config.delete_intermediates {
            remove_files(&archives).await;
        }
        Ok(result)
    }

    async fn fetch(&self, uri: ArchiveUri, dest: &Path) -> Result<()> {
        let uri = uri.to_string();
        match self.fetcher.fetch(&uri, dest).await? {
            FetchOutcome::AlreadyPresent => debug!(uri = %uri, "Archive already present"),
            FetchOutcome::Downloaded {
                mirror,
                bytes,
                attempts,
            } => debug!(uri = %uri, mirror = %mirror, bytes, attempts, "Archive fetched"),
        }
        Ok(())
    }
}

/// Decode one monthly archive into a time-major scratch array.
fn convert_month(
    store: &StoreConfig,
    archive: &Path,
    variable: Variable,
    expected_steps: usize,
    intermediate: &Path,
    locations_per_chunk: usize,
    delete_archive: bool,
) -> Result<()> {
    let short_name = variable.short_name();
    let mut array = ArchiveIngestor::read(archive, short_name, variable.multiply_add())?;
    if array.n_time < expected_steps {
        return Err(NetCdfError::UnexpectedDimensionality {
            path: archive.to_path_buf(),
            field: short_name.to_string(),
            dims: vec![array.n_time, array.n_locations],
        }
        .into());
    }
    // leap days are dropped
    array.truncate_time(expected_steps);

    let series = array.transpose();
    let spec = SeriesSpec::intermediate(
        series.n_locations,
        series.n_time,
        locations_per_chunk,
        variable.scale_factor(),
    );
    TimeSeriesWriter::new(store.clone())
        .create(intermediate, spec)?
        .write_all(series.data)?;

    if delete_archive {
        std::fs::remove_file(archive)?;
    }
    Ok(())
}

/// Decode the inputs of a derived variable and compute it.
fn derive(
    source: DerivedSource,
    archives: &[PathBuf],
    elevation: &[f32],
) -> Result<series_store::SpaceMajorArray> {
    match source {
        DerivedSource::RelativeHumidityFromSpecific => {
            let [huss, tas, psl] = source.inputs();
            let read = |index: usize, input: cmip_catalog::DerivedInput| {
                ArchiveIngestor::read(&archives[index], input.short_name, Some(input.transform))
            };
            let specific_humidity = read(0, huss)?;
            let temperature = read(1, tas)?;
            let sea_level_pressure = read(2, psl)?;
            relative_humidity(RelativeHumidityInputs {
                specific_humidity,
                temperature: &temperature,
                sea_level_pressure: &sea_level_pressure,
                elevation,
            })
        }
    }
}

fn output_spec(store: &StoreConfig, task: Task, n_locations: usize, n_time: usize) -> SeriesSpec {
    SeriesSpec::time_series(store, n_locations, n_time, task.variable.scale_factor())
        .attribute("model", task.model.as_str())
        .attribute("variable", task.variable.as_str())
        .attribute("units", task.variable.unit())
        .attribute("year", task.year)
        .attribute("dt_seconds", task.model.dt_seconds())
}

async fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove archive");
        }
    }
}
