//! Pipeline and fetch configuration, plus the on-disk layout derived from it.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cmip_catalog::{Model, Variable, DEFAULT_MIRRORS};
use series_store::StoreConfig;

/// Settings for one conversion run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root under which per-model directories are created.
    pub data_dir: PathBuf,
    pub start_year: i32,
    pub end_year: i32,
    /// Remove downloaded archives and per-month scratch arrays after use.
    pub delete_intermediates: bool,
    /// Locations assembled per batch when stitching monthly archives.
    pub locations_per_batch: usize,
    /// Upper bound on (variable, year) tasks in flight.
    pub max_concurrent_tasks: usize,
    /// Restrict the run to these variables.
    pub variables: Option<Vec<Variable>>,
    pub store: StoreConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            start_year: 1950,
            end_year: 2050,
            delete_intermediates: true,
            locations_per_batch: 6000,
            max_concurrent_tasks: 1,
            variables: None,
            store: StoreConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            store: StoreConfig::from_env(),
            ..Self::default()
        };

        if let Ok(val) = std::env::var("CMIP_DATA_DIR") {
            config.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("CMIP_DELETE_INTERMEDIATES") {
            config.delete_intermediates = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("CMIP_LOCATIONS_PER_BATCH") {
            if let Ok(n) = val.parse() {
                config.locations_per_batch = n;
            }
        }

        if let Ok(val) = std::env::var("CMIP_MAX_CONCURRENT_TASKS") {
            if let Ok(n) = val.parse() {
                config.max_concurrent_tasks = n;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.locations_per_batch == 0 {
            return Err("locations_per_batch must be > 0".to_string());
        }

        if self.max_concurrent_tasks == 0 {
            return Err("max_concurrent_tasks must be > 0".to_string());
        }

        if self.start_year > self.end_year {
            return Err(format!(
                "start year {} is after end year {}",
                self.start_year, self.end_year
            ));
        }

        self.store.validate()
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.start_year..=self.end_year
    }

    /// Variables selected for the run, in catalog order.
    pub fn selected_variables(&self) -> Vec<Variable> {
        match &self.variables {
            Some(selected) => Variable::ALL
                .into_iter()
                .filter(|v| selected.contains(v))
                .collect(),
            None => Variable::ALL.to_vec(),
        }
    }

    pub fn paths(&self, model: Model) -> ModelPaths {
        ModelPaths::new(&self.data_dir, model)
    }
}

/// Directory layout for one model.
///
/// ```text
/// {data}/download-{MODEL}/   fetched archives and per-month scratch arrays
/// {data}/archive-{MODEL}/    yearly series, one per (variable, year)
/// {data}/omfile-{MODEL}/     static fields (surface elevation)
/// ```
///
/// Scratch names carry the variable so concurrent tasks never share a path.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub download: PathBuf,
    pub archive: PathBuf,
    pub omfile: PathBuf,
}

impl ModelPaths {
    pub fn new(data_dir: &Path, model: Model) -> Self {
        Self {
            download: data_dir.join(format!("download-{}", model)),
            archive: data_dir.join(format!("archive-{}", model)),
            omfile: data_dir.join(format!("omfile-{}", model)),
        }
    }

    pub fn create_all(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.download)?;
        std::fs::create_dir_all(&self.archive)?;
        std::fs::create_dir_all(&self.omfile)
    }

    /// Final yearly series; its presence marks the task as done.
    pub fn yearly_output(&self, variable: Variable, year: i32) -> PathBuf {
        self.archive.join(format!("{}_{}.zarr", variable, year))
    }

    /// Static surface elevation, ocean masked.
    pub fn elevation(&self) -> PathBuf {
        self.omfile.join("HSURF.zarr")
    }

    /// Downloaded static field such as `orog` or `sftlf`.
    pub fn static_archive(&self, short_name: &str) -> PathBuf {
        self.download.join(format!("{}_fx.nc", short_name))
    }

    /// Downloaded full-year archive of `short_name` fetched for `variable`.
    pub fn yearly_archive(&self, variable: Variable, year: i32, short_name: &str) -> PathBuf {
        self.download
            .join(format!("{}_{}_{}.nc", variable, year, short_name))
    }

    pub fn monthly_archive(&self, variable: Variable, year: i32, month: u32) -> PathBuf {
        self.download
            .join(format!("{}_{}_{:02}.nc", variable, year, month))
    }

    /// Normalised, time-major month written before stitching.
    pub fn monthly_intermediate(&self, variable: Variable, year: i32, month: u32) -> PathBuf {
        self.download
            .join(format!("{}_{}_{:02}.zarr", variable, year, month))
    }
}

/// HTTP settings for mirrored fetching.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Mirror base URLs, tried in order.
    pub mirrors: Vec<String>,
    /// Whole-request timeout; yearly archives run to several gigabytes.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            mirrors: DEFAULT_MIRRORS.iter().map(|m| m.to_string()).collect(),
            request_timeout: Duration::from_secs(3 * 3600),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl FetchConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("CMIP_MIRRORS") {
            let mirrors: Vec<String> = val
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(String::from)
                .collect();
            if !mirrors.is_empty() {
                config.mirrors = mirrors;
            }
        }

        if let Ok(val) = std::env::var("CMIP_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.request_timeout = Duration::from_secs(secs);
            }
        }

        config
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.mirrors.is_empty() {
            return Err("at least one mirror is required".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.years().count(), 101);
        assert_eq!(config.selected_variables().len(), Variable::ALL.len());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let inverted = PipelineConfig {
            start_year: 2000,
            end_year: 1999,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let zero_batch = PipelineConfig {
            locations_per_batch: 0,
            ..Default::default()
        };
        assert!(zero_batch.validate().is_err());
    }

    #[test]
    fn test_variable_filter_keeps_catalog_order() {
        let config = PipelineConfig {
            variables: Some(vec![Variable::Windspeed10mMax, Variable::PressureMsl]),
            ..Default::default()
        };
        assert_eq!(
            config.selected_variables(),
            vec![Variable::PressureMsl, Variable::Windspeed10mMax]
        );
    }

    #[test]
    fn test_paths_are_task_scoped() {
        let paths = PipelineConfig::default().paths(Model::FGOALS_f3_H);
        assert!(paths.download.ends_with("download-FGOALS_f3_H"));
        assert_eq!(
            paths.yearly_output(Variable::PressureMsl, 1990).file_name().unwrap(),
            "pressure_msl_1990.zarr"
        );
        assert_eq!(
            paths
                .yearly_archive(Variable::RelativeHumidity2mMean, 1990, "tas")
                .file_name()
                .unwrap(),
            "relative_humidity_2m_mean_1990_tas.nc"
        );
        assert_eq!(
            paths
                .monthly_intermediate(Variable::Windspeed10mMax, 2020, 3)
                .file_name()
                .unwrap(),
            "windspeed_10m_max_2020_03.zarr"
        );
    }

    #[test]
    fn test_fetch_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.mirrors.len(), 6);
        assert_eq!(config.request_timeout, Duration::from_secs(10_800));
    }
}
