//! Archive paths on the ESGF THREDDS file servers.

use std::fmt;

use crate::model::Model;

/// ESGF mirrors, fastest first. Each base is joined with an [`ArchiveUri`].
pub const DEFAULT_MIRRORS: [&str; 6] = [
    "https://esgf3.dkrz.de/thredds/fileServer/cmip6/",
    "https://esgf.ceda.ac.uk/thredds/fileServer/esg_cmip6/CMIP6/",
    "https://esgf-data1.llnl.gov/thredds/fileServer/css03_data/CMIP6/",
    "https://esgf-data04.diasjp.net/thredds/fileServer/esg_dataroot/CMIP6/",
    "https://esgf-data03.diasjp.net/thredds/fileServer/esg_dataroot/CMIP6/",
    "https://esg.lasg.ac.cn/thredds/fileServer/esg_dataroot/CMIP6/",
];

/// MIP activity all archives belong to.
pub const ACTIVITY: &str = "HighResMIP";

/// Ensemble member.
pub const VARIANT: &str = "r1i1p1f1";

/// First year served by the future-scenario experiment.
pub const FUTURE_CUTOVER_YEAR: i32 = 2015;

/// Experiment id selecting historical or scenario runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Experiment {
    HighresSstPresent,
    HighresSstFuture,
    Hist1950,
}

impl Experiment {
    /// Experiment serving daily data of `year`.
    pub fn for_year(year: i32) -> Self {
        if year >= FUTURE_CUTOVER_YEAR {
            Experiment::HighresSstFuture
        } else {
            Experiment::HighresSstPresent
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Experiment::HighresSstPresent => "highresSST-present",
            Experiment::HighresSstFuture => "highresSST-future",
            Experiment::Hist1950 => "hist-1950",
        }
    }
}

/// Output frequency of an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    /// Daily aggregates
    Day,
    /// Static fields
    Fx,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Day => "day",
            Frequency::Fx => "fx",
        }
    }
}

/// Path of one archive relative to a mirror base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveUri {
    pub model: Model,
    pub experiment: Experiment,
    pub frequency: Frequency,
    pub short_name: String,
    pub version: String,
    /// `start-end` period, absent for static fields.
    pub period: Option<String>,
}

impl ArchiveUri {
    /// Daily archive of `short_name` covering `period`.
    pub fn daily(
        model: Model,
        experiment: Experiment,
        short_name: &str,
        version: &str,
        period: String,
    ) -> Self {
        Self {
            model,
            experiment,
            frequency: Frequency::Day,
            short_name: short_name.to_string(),
            version: version.to_string(),
            period: Some(period),
        }
    }

    /// Static field such as `orog` or `sftlf`.
    pub fn fixed(model: Model, short_name: &str, version: &str) -> Self {
        Self {
            model,
            experiment: model.static_experiment(),
            frequency: Frequency::Fx,
            short_name: short_name.to_string(),
            version: version.to_string(),
            period: None,
        }
    }

    /// File name component of the path.
    pub fn file_name(&self) -> String {
        let mut name = format!(
            "{short}_{freq}_{source}_{experiment}_{VARIANT}_{grid}",
            short = self.short_name,
            freq = self.frequency.as_str(),
            source = self.model.source_name(),
            experiment = self.experiment.as_str(),
            grid = self.model.grid_label(),
        );
        if let Some(period) = &self.period {
            name.push('_');
            name.push_str(period);
        }
        name.push_str(".nc");
        name
    }
}

impl fmt::Display for ArchiveUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{ACTIVITY}/{institute}/{source}/{experiment}/{VARIANT}/{freq}/{short}/{grid}/v{version}/{file}",
            institute = self.model.institute(),
            source = self.model.source_name(),
            experiment = self.experiment.as_str(),
            freq = self.frequency.as_str(),
            short = self.short_name,
            grid = self.model.grid_label(),
            version = self.version,
            file = self.file_name(),
        )
    }
}
