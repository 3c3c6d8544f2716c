//! Output variables and how each model publishes them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::model::Model;

/// How a model publishes a variable at daily resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalResolution {
    /// One archive per month; twelve are stitched into a yearly series.
    Monthly,
    /// One archive per year.
    Yearly,
    /// Not producible for this model.
    Unsupported,
}

/// Affine unit transform applied while decoding: `value * multiply + add`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiplyAdd {
    pub multiply: f32,
    pub add: f32,
}

impl MultiplyAdd {
    pub const fn new(multiply: f32, add: f32) -> Self {
        Self { multiply, add }
    }

    /// Kelvin to degrees Celsius.
    pub const KELVIN_TO_CELSIUS: MultiplyAdd = MultiplyAdd::new(1.0, -273.15);
    /// Pascal to hectopascal.
    pub const PASCAL_TO_HECTOPASCAL: MultiplyAdd = MultiplyAdd::new(0.01, 0.0);
    /// kg/kg to g/kg.
    pub const KG_TO_G: MultiplyAdd = MultiplyAdd::new(1000.0, 0.0);

    #[inline]
    pub fn apply(&self, value: f32) -> f32 {
        value * self.multiply + self.add
    }
}

/// Inputs needed to compute a variable a model does not publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedSource {
    /// Relative humidity from specific humidity (`huss`), 2 m temperature
    /// (`tas`), sea level pressure (`psl`) and the static surface elevation.
    RelativeHumidityFromSpecific,
}

/// One archive consumed by a derivation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedInput {
    pub short_name: &'static str,
    /// Unit conversion into the units the derivation expects.
    pub transform: MultiplyAdd,
    /// Variable whose source versions apply to this archive.
    pub version_of: Variable,
}

impl DerivedSource {
    /// Archives that must be fetched, in the order the derivation consumes them.
    pub fn inputs(&self) -> [DerivedInput; 3] {
        match self {
            DerivedSource::RelativeHumidityFromSpecific => [
                DerivedInput {
                    short_name: "huss",
                    transform: MultiplyAdd::KG_TO_G,
                    version_of: Variable::RelativeHumidity2mMean,
                },
                DerivedInput {
                    short_name: "tas",
                    transform: MultiplyAdd::KELVIN_TO_CELSIUS,
                    version_of: Variable::Temperature2mMean,
                },
                DerivedInput {
                    short_name: "psl",
                    transform: MultiplyAdd::PASCAL_TO_HECTOPASCAL,
                    version_of: Variable::PressureMsl,
                },
            ],
        }
    }
}

/// A daily output variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Variable {
    #[serde(rename = "pressure_msl")]
    PressureMsl,
    #[serde(rename = "temperature_2m_min")]
    Temperature2mMin,
    #[serde(rename = "temperature_2m_max")]
    Temperature2mMax,
    #[serde(rename = "temperature_2m_mean")]
    Temperature2mMean,
    #[serde(rename = "cloudcover_mean")]
    CloudcoverMean,
    #[serde(rename = "precipitation_sum")]
    PrecipitationSum,
    #[serde(rename = "snowfall_water_equivalent_sum")]
    SnowfallWaterEquivalentSum,
    #[serde(rename = "relative_humidity_2m_min")]
    RelativeHumidity2mMin,
    #[serde(rename = "relative_humidity_2m_max")]
    RelativeHumidity2mMax,
    #[serde(rename = "relative_humidity_2m_mean")]
    RelativeHumidity2mMean,
    #[serde(rename = "windspeed_10m_mean")]
    Windspeed10mMean,
    #[serde(rename = "windspeed_10m_max")]
    Windspeed10mMax,
    /// Moisture in upper portion of soil column
    #[serde(rename = "soil_moisture_0_to_10cm")]
    SoilMoisture0To10cm,
    #[serde(rename = "shortwave_radiation_sum")]
    ShortwaveRadiationSum,
}

impl Variable {
    pub const ALL: [Variable; 14] = [
        Variable::PressureMsl,
        Variable::Temperature2mMin,
        Variable::Temperature2mMax,
        Variable::Temperature2mMean,
        Variable::CloudcoverMean,
        Variable::PrecipitationSum,
        Variable::SnowfallWaterEquivalentSum,
        Variable::RelativeHumidity2mMin,
        Variable::RelativeHumidity2mMax,
        Variable::RelativeHumidity2mMean,
        Variable::Windspeed10mMean,
        Variable::Windspeed10mMax,
        Variable::SoilMoisture0To10cm,
        Variable::ShortwaveRadiationSum,
    ];

    /// Name used for output files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Variable::PressureMsl => "pressure_msl",
            Variable::Temperature2mMin => "temperature_2m_min",
            Variable::Temperature2mMax => "temperature_2m_max",
            Variable::Temperature2mMean => "temperature_2m_mean",
            Variable::CloudcoverMean => "cloudcover_mean",
            Variable::PrecipitationSum => "precipitation_sum",
            Variable::SnowfallWaterEquivalentSum => "snowfall_water_equivalent_sum",
            Variable::RelativeHumidity2mMin => "relative_humidity_2m_min",
            Variable::RelativeHumidity2mMax => "relative_humidity_2m_max",
            Variable::RelativeHumidity2mMean => "relative_humidity_2m_mean",
            Variable::Windspeed10mMean => "windspeed_10m_mean",
            Variable::Windspeed10mMax => "windspeed_10m_max",
            Variable::SoilMoisture0To10cm => "soil_moisture_0_to_10cm",
            Variable::ShortwaveRadiationSum => "shortwave_radiation_sum",
        }
    }

    /// CMIP6 short name of the daily archive.
    pub fn short_name(&self) -> &'static str {
        match self {
            Variable::PressureMsl => "psl",
            Variable::Temperature2mMin => "tasmin",
            Variable::Temperature2mMax => "tasmax",
            Variable::Temperature2mMean => "tas",
            Variable::CloudcoverMean => "clt",
            Variable::PrecipitationSum => "pr",
            Variable::SnowfallWaterEquivalentSum => "prsn",
            Variable::RelativeHumidity2mMin => "hursmin",
            Variable::RelativeHumidity2mMax => "hursmax",
            Variable::RelativeHumidity2mMean => "hurs",
            Variable::Windspeed10mMean => "sfcWind",
            Variable::Windspeed10mMax => "sfcWindmax",
            Variable::SoilMoisture0To10cm => "mrsos",
            Variable::ShortwaveRadiationSum => "rsds",
        }
    }

    /// Physical unit after the unit transform.
    pub fn unit(&self) -> &'static str {
        match self {
            Variable::PressureMsl => "hPa",
            Variable::Temperature2mMin | Variable::Temperature2mMax | Variable::Temperature2mMean => {
                "°C"
            }
            Variable::CloudcoverMean
            | Variable::RelativeHumidity2mMin
            | Variable::RelativeHumidity2mMax
            | Variable::RelativeHumidity2mMean => "%",
            Variable::PrecipitationSum | Variable::SnowfallWaterEquivalentSum => "mm",
            Variable::Windspeed10mMean | Variable::Windspeed10mMax => "m/s",
            Variable::SoilMoisture0To10cm => "g/kg",
            Variable::ShortwaveRadiationSum => "MJ/m²",
        }
    }

    /// Quantisation factor used by the compressed store.
    pub fn scale_factor(&self) -> f32 {
        match self {
            Variable::PressureMsl => 10.0,
            Variable::Temperature2mMin | Variable::Temperature2mMax | Variable::Temperature2mMean => {
                20.0
            }
            Variable::CloudcoverMean => 1.0,
            Variable::PrecipitationSum | Variable::SnowfallWaterEquivalentSum => 10.0,
            Variable::RelativeHumidity2mMin
            | Variable::RelativeHumidity2mMax
            | Variable::RelativeHumidity2mMean => 1.0,
            Variable::Windspeed10mMean | Variable::Windspeed10mMax => 10.0,
            Variable::SoilMoisture0To10cm => 1000.0,
            Variable::ShortwaveRadiationSum => 10.0,
        }
    }

    /// Unit transform from the archive unit to [`Variable::unit`].
    pub fn multiply_add(&self) -> Option<MultiplyAdd> {
        match self {
            Variable::Temperature2mMin | Variable::Temperature2mMax | Variable::Temperature2mMean => {
                Some(MultiplyAdd::KELVIN_TO_CELSIUS)
            }
            Variable::PressureMsl => Some(MultiplyAdd::PASCAL_TO_HECTOPASCAL),
            // kg m-2 s-1 to mm per day
            Variable::PrecipitationSum | Variable::SnowfallWaterEquivalentSum => {
                Some(MultiplyAdd::new(3600.0 * 24.0, 0.0))
            }
            // mean W/m² to MJ/m² daily sum
            Variable::ShortwaveRadiationSum => Some(MultiplyAdd::new(24.0 * 0.0036, 0.0)),
            _ => None,
        }
    }

    /// Source version directory for a model.
    pub fn version(&self, model: Model, is_future: bool) -> &'static str {
        match model {
            Model::CMCC_CM2_VHR4 => {
                if *self == Variable::PrecipitationSum {
                    return "20210308";
                }
                if is_future {
                    "20190725"
                } else {
                    "20170927"
                }
            }
            Model::FGOALS_f3_H => "20190817",
            Model::HiRAM_SIT_HR => {
                if is_future {
                    "20210707"
                } else {
                    "20210713"
                }
            }
            Model::MRI_AGCM3_2_S => {
                if is_future {
                    "20200619"
                } else {
                    "20190711"
                }
            }
            Model::HadGEM3_GC31_HM => {
                if is_future {
                    "20190315"
                } else {
                    "20170831"
                }
            }
        }
    }

    /// Which archive granularity a model publishes this variable at.
    pub fn temporal_resolution(&self, model: Model) -> TemporalResolution {
        use TemporalResolution::*;
        use Variable::*;

        match model {
            Model::MRI_AGCM3_2_S | Model::HadGEM3_GC31_HM => Yearly,
            // no near surface RH or temperature, only wind is daily per month
            Model::CMCC_CM2_VHR4 => match self {
                PrecipitationSum => Yearly,
                Windspeed10mMean | Windspeed10mMax => Monthly,
                _ => Unsupported,
            },
            // min/max only at 3-hourly resolution
            Model::FGOALS_f3_H => match self {
                RelativeHumidity2mMean
                | CloudcoverMean
                | Temperature2mMean
                | PressureMsl
                | SnowfallWaterEquivalentSum
                | ShortwaveRadiationSum
                | Windspeed10mMean
                | Windspeed10mMax
                | PrecipitationSum => Yearly,
                _ => Unsupported,
            },
            // no near surface wind components, no daily RH min/max
            Model::HiRAM_SIT_HR => match self {
                Temperature2mMean
                | Temperature2mMax
                | Temperature2mMin
                | CloudcoverMean
                | PrecipitationSum
                | SnowfallWaterEquivalentSum
                | RelativeHumidity2mMean
                | ShortwaveRadiationSum
                | Windspeed10mMean => Yearly,
                _ => Unsupported,
            },
        }
    }

    /// Derivation required when the model omits this variable.
    pub fn derived_source(&self, model: Model) -> Option<DerivedSource> {
        match (model, self) {
            (Model::FGOALS_f3_H, Variable::RelativeHumidity2mMean) => {
                Some(DerivedSource::RelativeHumidityFromSpecific)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variable {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variable::ALL
            .into_iter()
            .find(|v| v.as_str() == s || v.short_name() == s)
            .ok_or_else(|| CatalogError::UnknownVariable(s.to_string()))
    }
}
