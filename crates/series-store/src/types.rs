//! In-memory series buffers and their layouts.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::layout::transpose;

/// Memory order of a 2D series buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// `[time][location]`: one full field per time step.
    SpaceMajor,
    /// `[location][time]`: one full series per location.
    TimeMajor,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::SpaceMajor => "space_major",
            Layout::TimeMajor => "time_major",
        }
    }

    /// Parse the attribute value written by [`Layout::as_str`].
    pub fn from_attr(s: &str) -> Option<Self> {
        match s {
            "space_major" => Some(Layout::SpaceMajor),
            "time_major" => Some(Layout::TimeMajor),
            _ => None,
        }
    }
}

fn check_len(len: usize, n_locations: usize, n_time: usize) -> Result<()> {
    let expected = n_locations * n_time;
    if len != expected {
        return Err(StoreError::ShapeMismatch {
            expected,
            actual: len,
        });
    }
    Ok(())
}

/// Gridded field sequence as decoded from an archive, `[time][location]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceMajorArray {
    pub data: Vec<f32>,
    pub n_locations: usize,
    pub n_time: usize,
}

impl SpaceMajorArray {
    pub fn new(data: Vec<f32>, n_locations: usize, n_time: usize) -> Result<Self> {
        check_len(data.len(), n_locations, n_time)?;
        Ok(Self {
            data,
            n_locations,
            n_time,
        })
    }

    /// Array with every cell set to `value`.
    pub fn filled(value: f32, n_locations: usize, n_time: usize) -> Self {
        Self {
            data: vec![value; n_locations * n_time],
            n_locations,
            n_time,
        }
    }

    /// All locations of one time step.
    pub fn time_step(&self, t: usize) -> &[f32] {
        &self.data[t * self.n_locations..(t + 1) * self.n_locations]
    }

    /// Drop trailing time steps beyond `n_time`.
    pub fn truncate_time(&mut self, n_time: usize) {
        if n_time < self.n_time {
            self.data.truncate(n_time * self.n_locations);
            self.n_time = n_time;
        }
    }

    pub fn transpose(self) -> TimeMajorArray {
        let data = transpose(&self.data, self.n_time, self.n_locations);
        TimeMajorArray {
            data,
            n_locations: self.n_locations,
            n_time: self.n_time,
        }
    }
}

/// Per-location time series, `[location][time]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeMajorArray {
    pub data: Vec<f32>,
    pub n_locations: usize,
    pub n_time: usize,
}

impl TimeMajorArray {
    pub fn new(data: Vec<f32>, n_locations: usize, n_time: usize) -> Result<Self> {
        check_len(data.len(), n_locations, n_time)?;
        Ok(Self {
            data,
            n_locations,
            n_time,
        })
    }

    /// Full time series of one location.
    pub fn location(&self, l: usize) -> &[f32] {
        &self.data[l * self.n_time..(l + 1) * self.n_time]
    }

    /// Time series of a contiguous range of locations.
    pub fn locations(&self, range: Range<usize>) -> &[f32] {
        &self.data[range.start * self.n_time..range.end * self.n_time]
    }

    pub fn transpose(self) -> SpaceMajorArray {
        let data = transpose(&self.data, self.n_locations, self.n_time);
        SpaceMajorArray {
            data,
            n_locations: self.n_locations,
            n_time: self.n_time,
        }
    }
}

/// Time-major values for the locations `start..start + n_locations`.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationBatch {
    pub start: usize,
    pub n_locations: usize,
    pub n_time: usize,
    pub data: Vec<f32>,
}

impl LocationBatch {
    pub fn new(start: usize, n_locations: usize, n_time: usize, data: Vec<f32>) -> Result<Self> {
        check_len(data.len(), n_locations, n_time)?;
        Ok(Self {
            start,
            n_locations,
            n_time,
            data,
        })
    }

    pub fn locations(&self) -> Range<usize> {
        self.start..self.start + self.n_locations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SpaceMajorArray {
        // 3 time steps x 4 locations, value = 10 * t + l
        let data = (0..3)
            .flat_map(|t| (0..4).map(move |l| (10 * t + l) as f32))
            .collect();
        SpaceMajorArray::new(data, 4, 3).unwrap()
    }

    #[test]
    fn test_rejects_wrong_length() {
        let err = SpaceMajorArray::new(vec![0.0; 5], 2, 3).unwrap_err();
        assert!(matches!(
            err,
            StoreError::ShapeMismatch {
                expected: 6,
                actual: 5
            }
        ));
    }

    #[test]
    fn test_transpose_puts_series_contiguous() {
        let series = sample().transpose();
        assert_eq!(series.location(2), &[2.0, 12.0, 22.0]);
        assert_eq!(series.locations(0..2), &[0.0, 10.0, 20.0, 1.0, 11.0, 21.0]);
    }

    #[test]
    fn test_transpose_round_trip() {
        let original = sample();
        assert_eq!(original.clone().transpose().transpose(), original);
    }

    #[test]
    fn test_truncate_time() {
        let mut array = sample();
        array.truncate_time(2);
        assert_eq!(array.n_time, 2);
        assert_eq!(array.data.len(), 8);
        assert_eq!(array.time_step(1)[3], 13.0);

        // never grows
        array.truncate_time(5);
        assert_eq!(array.n_time, 2);
    }

    #[test]
    fn test_layout_attr() {
        for layout in [Layout::SpaceMajor, Layout::TimeMajor] {
            assert_eq!(Layout::from_attr(layout.as_str()), Some(layout));
        }
        assert_eq!(Layout::from_attr("diagonal"), None);
    }
}
