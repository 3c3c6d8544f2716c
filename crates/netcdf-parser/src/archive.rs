//! Native NetCDF reading using the netcdf library.

use std::path::{Path, PathBuf};
use std::sync::Once;

use cmip_catalog::MultiplyAdd;
use series_store::SpaceMajorArray;
use tracing::{debug, instrument};

use crate::error::{NetCdfError, NetCdfResult};
use crate::normalize::{normalize, FieldShape};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints diagnostics even for conditions the Rust side
/// handles, such as probing for optional attributes. Safe to call more than
/// once; only the first call has an effect.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 with null handlers disables automatic error
        // printing, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Name and dimension lengths of a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub dims: Vec<usize>,
}

/// An open archive file.
pub struct Archive {
    file: netcdf::File,
    path: PathBuf,
}

impl Archive {
    pub fn open(path: &Path) -> NetCdfResult<Self> {
        silence_hdf5_errors();
        let file = netcdf::open(path).map_err(|e| NetCdfError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn variable(&self, field: &str) -> NetCdfResult<netcdf::Variable<'_>> {
        self.file
            .variable(field)
            .ok_or_else(|| NetCdfError::FieldNotFound {
                path: self.path.clone(),
                field: field.to_string(),
            })
    }

    /// Dimension lengths of `field`.
    pub fn field(&self, field: &str) -> NetCdfResult<FieldInfo> {
        let var = self.variable(field)?;
        Ok(FieldInfo {
            name: field.to_string(),
            dims: var.dimensions().iter().map(|d| d.len()).collect(),
        })
    }

    /// All values of `field` in file order as f32.
    ///
    /// Fill and missing values become NaN; packed variables are unpacked
    /// with their `scale_factor`/`add_offset`.
    pub fn read(&self, field: &str) -> NetCdfResult<Vec<f32>> {
        let var = self.variable(field)?;
        let mut data: Vec<f32> = var.get_values(..).map_err(|e| NetCdfError::Read {
            path: self.path.clone(),
            field: field.to_string(),
            message: e.to_string(),
        })?;

        let fill_values: Vec<f32> = ["_FillValue", "missing_value"]
            .iter()
            .filter_map(|name| get_f32_attr(&var, name))
            .collect();
        let scale = get_f32_attr(&var, "scale_factor").unwrap_or(1.0);
        let offset = get_f32_attr(&var, "add_offset").unwrap_or(0.0);
        let packed = scale != 1.0 || offset != 0.0;

        for v in data.iter_mut() {
            if fill_values.contains(v) {
                *v = f32::NAN;
            } else if packed {
                *v = *v * scale + offset;
            }
        }
        Ok(data)
    }
}

/// Reads a named field into the canonical `[time][location]` layout.
pub struct ArchiveIngestor;

impl ArchiveIngestor {
    /// Decode `field` from the archive at `path`.
    ///
    /// Longitudes are rewrapped to -180°..180° and `transform` is applied
    /// to every value. The returned array carries the time-step and location
    /// counts.
    pub fn read(
        path: &Path,
        field: &str,
        transform: Option<MultiplyAdd>,
    ) -> NetCdfResult<SpaceMajorArray> {
        Self::read_with_shape(path, field, transform).map(|(array, _)| array)
    }

    /// Like [`read`](Self::read), also returning the `(nt, ny, nx)` shape.
    #[instrument(skip(path, transform), fields(path = %path.display()))]
    pub fn read_with_shape(
        path: &Path,
        field: &str,
        transform: Option<MultiplyAdd>,
    ) -> NetCdfResult<(SpaceMajorArray, FieldShape)> {
        let archive = Archive::open(path)?;
        let info = archive.field(field)?;
        let shape = FieldShape::from_dims(&info.dims).ok_or_else(|| {
            NetCdfError::UnexpectedDimensionality {
                path: path.to_path_buf(),
                field: field.to_string(),
                dims: info.dims.clone(),
            }
        })?;

        let data = archive.read(field)?;
        debug!(nt = shape.nt, ny = shape.ny, nx = shape.nx, "Decoded field");

        let array = normalize(shape, data, transform).map_err(|_| {
            NetCdfError::UnexpectedDimensionality {
                path: path.to_path_buf(),
                field: field.to_string(),
                dims: info.dims,
            }
        })?;
        Ok((array, shape))
    }
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f32_attr(var: &netcdf::Variable, name: &str) -> Option<f32> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f32::try_from(attr_value).ok()
}
