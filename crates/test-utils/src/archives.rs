//! Synthetic NetCDF archives.
//!
//! Files mirror the structure of the published daily archives: one float
//! variable over `(time, lat, lon)`, or `(lat, lon)` for static fields, with
//! an optional `_FillValue`.

use std::path::Path;

/// Fill value used by the published archives.
pub const ARCHIVE_FILL_VALUE: f32 = 1.0e20;

/// Writes a `(time, lat, lon)` archive holding `data` for `field`.
pub fn write_series_archive(path: &Path, field: &str, nt: usize, ny: usize, nx: usize, data: &[f32]) {
    write_archive(path, field, Some(nt), ny, nx, data, None);
}

/// Writes a `(lat, lon)` archive for a static field.
pub fn write_static_archive(path: &Path, field: &str, ny: usize, nx: usize, data: &[f32]) {
    write_archive(path, field, None, ny, nx, data, None);
}

/// Writes an archive with any shape and an optional fill value.
pub fn write_archive(
    path: &Path,
    field: &str,
    nt: Option<usize>,
    ny: usize,
    nx: usize,
    data: &[f32],
    fill_value: Option<f32>,
) {
    assert_eq!(data.len(), nt.unwrap_or(1) * ny * nx, "data does not match archive shape");

    let mut file = netcdf::create(path).expect("Failed to create NetCDF file");
    let mut dims = Vec::with_capacity(3);
    if let Some(nt) = nt {
        file.add_dimension("time", nt).expect("Failed to add time dimension");
        dims.push("time");
    }
    file.add_dimension("lat", ny).expect("Failed to add lat dimension");
    file.add_dimension("lon", nx).expect("Failed to add lon dimension");
    dims.extend(["lat", "lon"]);

    let mut var = file
        .add_variable::<f32>(field, &dims)
        .expect("Failed to add variable");
    if let Some(fill) = fill_value {
        var.set_fill_value(fill).expect("Failed to set fill value");
    }
    var.put_values(data, ..).expect("Failed to write values");
}

/// Bytes of a `(time, lat, lon)` archive, for serving from a test mirror.
pub fn series_archive_bytes(field: &str, nt: usize, ny: usize, nx: usize, data: &[f32]) -> Vec<u8> {
    let dir = crate::temp_test_dir();
    let path = dir.path().join(format!("{field}.nc"));
    write_series_archive(&path, field, nt, ny, nx, data);
    std::fs::read(&path).expect("Failed to read archive back")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_archive_is_netcdf() {
        let bytes = series_archive_bytes("tas", 2, 3, 4, &[280.0; 24]);
        // NetCDF-4 files are HDF5 containers
        assert!(bytes.starts_with(b"\x89HDF") || bytes.starts_with(b"CDF"));
    }
}
