//! Variables computed from other archives.

use rayon::prelude::*;
use series_store::SpaceMajorArray;

use crate::error::{IngestionError, Result};

/// Sea level pressure reduced to the surface at `elevation` metres.
///
/// Barometric formula with a standard lapse rate of 6.5 K/km. `temperature`
/// is the 2 m air temperature in °C; pressures are in hPa.
pub fn surface_pressure(sea_level_pressure: f32, temperature: f32, elevation: f32) -> f32 {
    let lapse = 0.0065 * elevation;
    sea_level_pressure * (1.0 - lapse / (temperature + lapse + 273.15)).powf(5.257)
}

/// Saturation vapour pressure over water in hPa (Magnus formula), `temperature` in °C.
pub fn saturation_vapour_pressure(temperature: f32) -> f32 {
    6.112 * ((17.67 * temperature) / (temperature + 243.5)).exp()
}

/// Relative humidity in percent from specific humidity (g/kg), temperature
/// (°C) and air pressure (hPa).
///
/// Not clamped: supersaturated inputs yield values above 100.
pub fn specific_to_relative_humidity(specific_humidity: f32, temperature: f32, pressure: f32) -> f32 {
    let q = specific_humidity / 1000.0;
    let vapour_pressure = q * pressure / (0.622 + 0.378 * q);
    100.0 * vapour_pressure / saturation_vapour_pressure(temperature)
}

/// Inputs for deriving 2 m relative humidity.
pub struct RelativeHumidityInputs<'a> {
    /// Specific humidity in g/kg.
    pub specific_humidity: SpaceMajorArray,
    /// 2 m temperature in °C.
    pub temperature: &'a SpaceMajorArray,
    /// Sea level pressure in hPa.
    pub sea_level_pressure: &'a SpaceMajorArray,
    /// Surface elevation per location, ocean masked with
    /// [`OCEAN_ELEVATION`](crate::elevation::OCEAN_ELEVATION).
    pub elevation: &'a [f32],
}

/// Compute relative humidity, reusing the specific humidity buffer.
///
/// Ocean cells carry the mask sentinel instead of an elevation. The sentinel
/// is fed to the pressure reduction as a height of -999 m, which keeps their
/// values apart from land cells at sea level.
pub fn relative_humidity(inputs: RelativeHumidityInputs<'_>) -> Result<SpaceMajorArray> {
    let RelativeHumidityInputs {
        mut specific_humidity,
        temperature,
        sea_level_pressure,
        elevation,
    } = inputs;

    let shape = (specific_humidity.n_locations, specific_humidity.n_time);
    for (name, other) in [("temperature", temperature), ("sea level pressure", sea_level_pressure)] {
        if (other.n_locations, other.n_time) != shape {
            return Err(IngestionError::InputMismatch(format!(
                "{} has {} locations x {} steps, specific humidity has {} x {}",
                name, other.n_locations, other.n_time, shape.0, shape.1
            )));
        }
    }
    if elevation.len() != shape.0 {
        return Err(IngestionError::InputMismatch(format!(
            "elevation has {} locations, specific humidity has {}",
            elevation.len(),
            shape.0
        )));
    }

    let n_locations = shape.0;
    specific_humidity
        .data
        .par_chunks_mut(n_locations)
        .enumerate()
        .for_each(|(t, row)| {
            let temps = temperature.time_step(t);
            let slps = sea_level_pressure.time_step(t);
            for (l, value) in row.iter_mut().enumerate() {
                let pressure = surface_pressure(slps[l], temps[l], elevation[l]);
                *value = specific_to_relative_humidity(*value, temps[l], pressure);
            }
        });

    Ok(specific_humidity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevation::OCEAN_ELEVATION;

    fn field(values: &[f32]) -> SpaceMajorArray {
        SpaceMajorArray::new(values.to_vec(), values.len(), 1).unwrap()
    }

    #[test]
    fn test_surface_pressure_at_sea_level() {
        assert!((surface_pressure(1013.25, 15.0, 0.0) - 1013.25).abs() < 1e-3);
        // roughly 850 hPa at 1500 m
        let p = surface_pressure(1013.25, 15.0, 1500.0);
        assert!((830.0..870.0).contains(&p), "{p}");
    }

    #[test]
    fn test_saturated_air_is_near_100_percent() {
        // saturation specific humidity at 20 °C and 1000 hPa is about 14.7 g/kg
        let es = saturation_vapour_pressure(20.0);
        let q = 622.0 * es / (1000.0 - 0.378 * es);
        let rh = specific_to_relative_humidity(q, 20.0, 1000.0);
        assert!((rh - 100.0).abs() < 0.5, "{rh}");
    }

    #[test]
    fn test_ocean_cells_distinguishable_from_land() {
        let rh = relative_humidity(RelativeHumidityInputs {
            specific_humidity: field(&[8.0, 8.0]),
            temperature: &field(&[15.0, 15.0]),
            sea_level_pressure: &field(&[1013.0, 1013.0]),
            elevation: &[OCEAN_ELEVATION, 0.0],
        })
        .unwrap();

        let (ocean, land) = (rh.data[0], rh.data[1]);
        assert!(ocean.is_finite() && land.is_finite());
        assert!(ocean - land > 5.0, "ocean {ocean} vs land {land}");
        // land at 0 m sees the sea level pressure unchanged
        let expected = specific_to_relative_humidity(8.0, 15.0, 1013.0);
        assert!((land - expected).abs() < 1e-3);
    }

    #[test]
    fn test_mismatched_time_axis() {
        let q = SpaceMajorArray::filled(8.0, 2, 3);
        let t = SpaceMajorArray::filled(15.0, 2, 2);
        let p = SpaceMajorArray::filled(1013.0, 2, 3);
        let err = relative_humidity(RelativeHumidityInputs {
            specific_humidity: q,
            temperature: &t,
            sea_level_pressure: &p,
            elevation: &[0.0, 0.0],
        })
        .unwrap_err();
        assert!(matches!(err, IngestionError::InputMismatch(_)));
    }

    #[test]
    fn test_mismatched_elevation() {
        let err = relative_humidity(RelativeHumidityInputs {
            specific_humidity: field(&[8.0]),
            temperature: &field(&[15.0]),
            sea_level_pressure: &field(&[1013.0]),
            elevation: &[0.0, 0.0],
        })
        .unwrap_err();
        assert!(matches!(err, IngestionError::InputMismatch(_)));
    }
}
