//! Reading stored series back, and the range-reader abstraction used when
//! stitching several sources into one series.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tracing::warn;
use zarrs::array::Array;
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

use crate::error::{Result, StoreError};
use crate::types::{Layout, SpaceMajorArray, TimeMajorArray};

/// Source of values for contiguous location ranges over its full time axis.
pub trait LocationRangeReader {
    fn n_locations(&self) -> usize;

    fn n_time(&self) -> usize;

    /// Order of the buffers returned by [`read_locations`](Self::read_locations).
    fn layout(&self) -> Layout;

    /// Values for `locations` across every time step.
    ///
    /// The buffer is `[time][location]` for [`Layout::SpaceMajor`] and
    /// `[location][time]` for [`Layout::TimeMajor`].
    fn read_locations(&self, locations: Range<usize>) -> Result<Vec<f32>>;

    /// Hint that `locations` will be read soon.
    fn prefetch(&self, _locations: Range<usize>) {}
}

fn check_range(range: &Range<usize>, length: usize, dimension: &'static str) -> Result<()> {
    if range.start > range.end || range.end > length {
        return Err(StoreError::OutOfBounds {
            dimension,
            requested: format!("{:?}", range),
            length,
        });
    }
    Ok(())
}

impl LocationRangeReader for SpaceMajorArray {
    fn n_locations(&self) -> usize {
        self.n_locations
    }

    fn n_time(&self) -> usize {
        self.n_time
    }

    fn layout(&self) -> Layout {
        Layout::SpaceMajor
    }

    fn read_locations(&self, locations: Range<usize>) -> Result<Vec<f32>> {
        check_range(&locations, self.n_locations, "locations")?;
        let mut out = Vec::with_capacity(locations.len() * self.n_time);
        for t in 0..self.n_time {
            out.extend_from_slice(&self.time_step(t)[locations.clone()]);
        }
        Ok(out)
    }
}

impl LocationRangeReader for TimeMajorArray {
    fn n_locations(&self) -> usize {
        self.n_locations
    }

    fn n_time(&self) -> usize {
        self.n_time
    }

    fn layout(&self) -> Layout {
        Layout::TimeMajor
    }

    fn read_locations(&self, locations: Range<usize>) -> Result<Vec<f32>> {
        check_range(&locations, self.n_locations, "locations")?;
        Ok(self.locations(locations).to_vec())
    }
}

/// Block kept by the last `prefetch` call.
struct Prefetched {
    locations: Range<usize>,
    data: Vec<f32>,
}

/// Reader for a series array written by [`TimeSeriesWriter`](crate::TimeSeriesWriter).
pub struct TimeSeriesReader {
    array: Array<FilesystemStore>,
    path: PathBuf,
    shape: [usize; 2],
    layout: Layout,
    prefetched: Mutex<Option<Prefetched>>,
}

impl TimeSeriesReader {
    /// Open an existing array.
    pub fn open(path: &Path) -> Result<Self> {
        let store = FilesystemStore::new(path).map_err(|e| StoreError::open_failed(e.to_string()))?;
        let array = Array::open(Arc::new(store), "/")
            .map_err(|e| StoreError::open_failed(format!("{}: {}", path.display(), e)))?;

        let shape = match array.shape() {
            [dim0, dim1] => [*dim0 as usize, *dim1 as usize],
            other => {
                return Err(StoreError::invalid_metadata(format!(
                    "expected 2 dimensions, found {}",
                    other.len()
                )))
            }
        };

        let layout = array
            .attributes()
            .get("layout")
            .and_then(|v| v.as_str())
            .and_then(Layout::from_attr)
            .unwrap_or(Layout::TimeMajor);

        Ok(Self {
            array,
            path: path.to_path_buf(),
            shape,
            layout,
            prefetched: Mutex::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `[dim0, dim1]` of the stored array.
    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        self.array.attributes()
    }

    /// `scale_factor` attribute, `1.0` if absent.
    pub fn scale_factor(&self) -> f32 {
        self.attributes()
            .get("scale_factor")
            .and_then(|v| v.as_f64())
            .map(|v| v as f32)
            .unwrap_or(1.0)
    }

    /// Values for a block of `[locations][time]`, row-major.
    pub fn read(&self, locations: Range<usize>, time: Range<usize>) -> Result<Vec<f32>> {
        check_range(&locations, self.shape[0], "locations")?;
        check_range(&time, self.shape[1], "time")?;

        if time == (0..self.shape[1]) {
            if let Some(data) = self.take_prefetched(&locations) {
                return Ok(data);
            }
        }

        let subset = ArraySubset::new_with_start_shape(
            vec![locations.start as u64, time.start as u64],
            vec![locations.len() as u64, time.len() as u64],
        )
        .map_err(|e| StoreError::read_failed(e.to_string()))?;

        self.array
            .retrieve_array_subset_elements::<f32>(&subset)
            .map_err(|e| StoreError::read_failed(e.to_string()))
    }

    /// Every value in the array.
    pub fn read_all(&self) -> Result<Vec<f32>> {
        self.read(0..self.shape[0], 0..self.shape[1])
    }

    fn take_prefetched(&self, locations: &Range<usize>) -> Option<Vec<f32>> {
        let mut guard = self.prefetched.lock().ok()?;
        let block = guard.as_ref()?;
        if block.locations == *locations {
            return guard.take().map(|block| block.data);
        }
        if block.locations.start > locations.start || block.locations.end < locations.end {
            return None;
        }
        let n_time = self.shape[1];
        let offset = (locations.start - block.locations.start) * n_time;
        Some(block.data[offset..offset + locations.len() * n_time].to_vec())
    }
}

impl LocationRangeReader for TimeSeriesReader {
    fn n_locations(&self) -> usize {
        self.shape[0]
    }

    fn n_time(&self) -> usize {
        self.shape[1]
    }

    fn layout(&self) -> Layout {
        self.layout
    }

    fn read_locations(&self, locations: Range<usize>) -> Result<Vec<f32>> {
        self.read(locations, 0..self.shape[1])
    }

    fn prefetch(&self, locations: Range<usize>) {
        let data = match self.read(locations.clone(), 0..self.shape[1]) {
            Ok(data) => data,
            Err(e) => {
                // errors resurface on the real read
                warn!(path = %self.path.display(), error = %e, "Failed to prefetch series block");
                return;
            }
        };
        if let Ok(mut guard) = self.prefetched.lock() {
            *guard = Some(Prefetched { locations, data });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_major_reads_time_rows() {
        let array = SpaceMajorArray::new((0..6).map(|v| v as f32).collect(), 3, 2).unwrap();
        // [t0: 0 1 2][t1: 3 4 5]
        assert_eq!(array.read_locations(1..3).unwrap(), vec![1.0, 2.0, 4.0, 5.0]);
        assert!(array.read_locations(2..4).is_err());
    }

    #[test]
    fn test_time_major_reads_series() {
        let array = TimeMajorArray::new((0..6).map(|v| v as f32).collect(), 3, 2).unwrap();
        assert_eq!(array.read_locations(1..2).unwrap(), vec![2.0, 3.0]);
        assert_eq!(array.layout(), Layout::TimeMajor);
    }
}
