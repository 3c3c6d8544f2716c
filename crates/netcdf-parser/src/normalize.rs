//! Conversion of raw archive buffers into the canonical layout.

use cmip_catalog::MultiplyAdd;
use rayon::prelude::*;
use series_store::SpaceMajorArray;

/// Shape of a decoded field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldShape {
    pub nt: usize,
    pub ny: usize,
    pub nx: usize,
}

impl FieldShape {
    /// Interpret NetCDF dimension lengths.
    ///
    /// Two dimensions are one time step of `(lat, lon)`; three are
    /// `(time, lat, lon)`. Anything else is rejected.
    pub fn from_dims(dims: &[usize]) -> Option<Self> {
        match *dims {
            [ny, nx] => Some(Self { nt: 1, ny, nx }),
            [nt, ny, nx] => Some(Self { nt, ny, nx }),
            _ => None,
        }
    }

    pub fn n_locations(&self) -> usize {
        self.ny * self.nx
    }

    pub fn len(&self) -> usize {
        self.nt * self.n_locations()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cyclically shift every row of `nx` values by half its width.
///
/// Moves a 0°..360° longitude axis onto -180°..180°. For an even `nx`
/// applying it twice is the identity.
pub fn rewrap_longitude(data: &mut [f32], nx: usize) {
    if nx < 2 {
        return;
    }
    let half = nx / 2;
    data.par_chunks_mut(nx).for_each(|row| row.rotate_left(half));
}

/// `value * multiply + add` for every value.
pub fn apply_multiply_add(data: &mut [f32], transform: MultiplyAdd) {
    data.par_iter_mut().for_each(|v| *v = transform.apply(*v));
}

/// Rewrap longitudes, convert units and wrap the buffer as `[time][location]`.
///
/// `data` must hold `shape.len()` values in archive order.
pub fn normalize(
    shape: FieldShape,
    mut data: Vec<f32>,
    transform: Option<MultiplyAdd>,
) -> series_store::Result<SpaceMajorArray> {
    rewrap_longitude(&mut data, shape.nx);
    if let Some(transform) = transform {
        apply_multiply_add(&mut data, transform);
    }
    SpaceMajorArray::new(data, shape.n_locations(), shape.nt)
}
