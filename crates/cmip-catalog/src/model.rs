//! HighResMIP models and their per-model attributes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::grid::RegularGrid;
use crate::uri::Experiment;

/// Source versions of the static orography fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrographyVersions {
    /// Version of the `orog` (surface altitude) archive
    pub altitude: &'static str,
    /// Version of the `sftlf` (land fraction) archive
    pub land_mask: &'static str,
}

/// A climate model publishing daily archives on the ESGF mirrors.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Model {
    CMCC_CM2_VHR4,
    FGOALS_f3_H,
    HiRAM_SIT_HR,
    MRI_AGCM3_2_S,
    /// https://gmd.copernicus.org/articles/12/4999/2019/gmd-12-4999-2019.pdf
    HadGEM3_GC31_HM,
}

impl Model {
    pub const ALL: [Model; 5] = [
        Model::CMCC_CM2_VHR4,
        Model::FGOALS_f3_H,
        Model::HiRAM_SIT_HR,
        Model::MRI_AGCM3_2_S,
        Model::HadGEM3_GC31_HM,
    ];

    /// Identifier used for local directories and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::CMCC_CM2_VHR4 => "CMCC_CM2_VHR4",
            Model::FGOALS_f3_H => "FGOALS_f3_H",
            Model::HiRAM_SIT_HR => "HiRAM_SIT_HR",
            Model::MRI_AGCM3_2_S => "MRI_AGCM3_2_S",
            Model::HadGEM3_GC31_HM => "HadGEM3_GC31_HM",
        }
    }

    /// Source id as published in archive paths.
    pub fn source_name(&self) -> &'static str {
        match self {
            Model::CMCC_CM2_VHR4 => "CMCC-CM2-VHR4",
            Model::FGOALS_f3_H => "FGOALS-f3-H",
            Model::HiRAM_SIT_HR => "HiRAM-SIT-HR",
            Model::MRI_AGCM3_2_S => "MRI-AGCM3-2-S",
            Model::HadGEM3_GC31_HM => "HadGEM3-GC31-HM",
        }
    }

    /// Grid label (`gn` native, `gr` regridded).
    pub fn grid_label(&self) -> &'static str {
        match self {
            Model::FGOALS_f3_H => "gr",
            Model::CMCC_CM2_VHR4
            | Model::HiRAM_SIT_HR
            | Model::MRI_AGCM3_2_S
            | Model::HadGEM3_GC31_HM => "gn",
        }
    }

    pub fn institute(&self) -> &'static str {
        match self {
            Model::CMCC_CM2_VHR4 => "CMCC",
            Model::FGOALS_f3_H => "CAS",
            Model::HiRAM_SIT_HR => "AS-RCEC",
            Model::MRI_AGCM3_2_S => "MRI",
            Model::HadGEM3_GC31_HM => "MOHC",
        }
    }

    /// Canonical grid after longitude rewrap to -180°..180°.
    pub fn grid(&self) -> RegularGrid {
        match self {
            Model::CMCC_CM2_VHR4 => {
                RegularGrid::new(1152, 768, -90.0, -180.0, 0.3125, 180.0 / 768.0)
            }
            Model::FGOALS_f3_H => RegularGrid::new(1440, 720, -90.0, -180.0, 0.25, 0.25),
            Model::HiRAM_SIT_HR => {
                RegularGrid::new(1536, 768, -90.0, -180.0, 360.0 / 1536.0, 180.0 / 768.0)
            }
            Model::MRI_AGCM3_2_S => RegularGrid::new(1920, 960, -90.0, -180.0, 0.1875, 0.1875),
            Model::HadGEM3_GC31_HM => {
                RegularGrid::new(1024, 768, -90.0, -180.0, 360.0 / 1024.0, 180.0 / 768.0)
            }
        }
    }

    /// Versions of the static orography fields, if the model publishes them.
    pub fn orography_versions(&self) -> Option<OrographyVersions> {
        let (altitude, land_mask) = match self {
            Model::CMCC_CM2_VHR4 => ("20210330", "20210330"),
            Model::FGOALS_f3_H => ("20201204", "20210121"),
            Model::HiRAM_SIT_HR => return None,
            Model::MRI_AGCM3_2_S => ("20200305", "20200305"),
            Model::HadGEM3_GC31_HM => ("20200910", "20200910"),
        };
        Some(OrographyVersions {
            altitude,
            land_mask,
        })
    }

    /// Experiment that carries the static `fx` fields.
    pub fn static_experiment(&self) -> Experiment {
        match self {
            Model::HadGEM3_GC31_HM => Experiment::Hist1950,
            _ => Experiment::HighresSstPresent,
        }
    }

    /// `MMDD` of the last day in a yearly archive.
    ///
    /// The Met Office model runs a 360-day calendar ending on 30 December.
    pub fn last_day_of_year(&self) -> &'static str {
        match self {
            Model::HadGEM3_GC31_HM => "1230",
            _ => "1231",
        }
    }

    /// Time step of the archived series in seconds.
    pub fn dt_seconds(&self) -> u32 {
        24 * 3600
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Model::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s) || m.source_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| CatalogError::UnknownModel(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raw_and_source_names() {
        assert_eq!("FGOALS_f3_H".parse::<Model>(), Ok(Model::FGOALS_f3_H));
        assert_eq!("HadGEM3-GC31-HM".parse::<Model>(), Ok(Model::HadGEM3_GC31_HM));
        assert_eq!("mri_agcm3_2_s".parse::<Model>(), Ok(Model::MRI_AGCM3_2_S));
        assert!("ECMWF".parse::<Model>().is_err());
    }

    #[test]
    fn test_grid_counts() {
        for model in Model::ALL {
            let grid = model.grid();
            assert_eq!(grid.count(), grid.nx * grid.ny);
            // every grid spans the full globe in longitude
            assert!((grid.nx as f32 * grid.dx - 360.0).abs() < 1e-3, "{model}");
        }
    }

    #[test]
    fn test_hiram_has_no_orography() {
        assert!(Model::HiRAM_SIT_HR.orography_versions().is_none());
        assert_eq!(
            Model::FGOALS_f3_H.orography_versions().map(|v| v.land_mask),
            Some("20210121")
        );
    }
}
