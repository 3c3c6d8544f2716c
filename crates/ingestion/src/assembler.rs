//! Stitching of consecutive sources into one per-location series.
//!
//! Each source covers a stretch of the time axis (a month, say) for every
//! location. The assembler walks the locations in fixed-size batches; for
//! each batch it reads that slice from every source in turn, lays it into a
//! NaN-filled time-major buffer at the source's time offset and yields the
//! buffer. Only one batch buffer is alive at a time.

use std::ops::Range;

use series_store::{transpose, Layout, LocationBatch, LocationRangeReader};
use tracing::debug;

use crate::error::{IngestionError, Result};

/// Stitches `readers` (in time order) into series of `total_time` steps.
pub struct TimeSeriesAssembler<'a, R> {
    readers: &'a [R],
    n_locations: usize,
    total_time: usize,
    batch_locations: usize,
}

impl<'a, R: LocationRangeReader> TimeSeriesAssembler<'a, R> {
    /// Check that the sources line up and build the assembler.
    ///
    /// All readers must cover the same locations and their time steps must
    /// add up to exactly `total_time`.
    pub fn new(readers: &'a [R], total_time: usize, batch_locations: usize) -> Result<Self> {
        let first = readers
            .first()
            .ok_or_else(|| IngestionError::InputMismatch("no sources to assemble".to_string()))?;
        if batch_locations == 0 {
            return Err(IngestionError::InvalidConfig(
                "batch size must be > 0".to_string(),
            ));
        }

        let n_locations = first.n_locations();
        if let Some((index, reader)) = readers
            .iter()
            .enumerate()
            .find(|(_, r)| r.n_locations() != n_locations)
        {
            return Err(IngestionError::InputMismatch(format!(
                "source {} has {} locations, source 0 has {}",
                index,
                reader.n_locations(),
                n_locations
            )));
        }

        let covered: usize = readers.iter().map(|r| r.n_time()).sum();
        if covered != total_time {
            return Err(IngestionError::TimeAxisMismatch {
                expected: total_time,
                actual: covered,
            });
        }

        Ok(Self {
            readers,
            n_locations,
            total_time,
            batch_locations,
        })
    }

    pub fn n_locations(&self) -> usize {
        self.n_locations
    }

    pub fn total_time(&self) -> usize {
        self.total_time
    }

    /// Assemble the series of one location range.
    pub fn assemble(&self, locations: Range<usize>) -> series_store::Result<LocationBatch> {
        let n = locations.len();
        let total = self.total_time;
        let mut buffer = vec![f32::NAN; n * total];

        let mut offset = 0;
        for reader in self.readers {
            let nt = reader.n_time();
            // at most one prefetched block alive next to the batch buffer
            reader.prefetch(locations.clone());
            let read = reader.read_locations(locations.clone())?;
            let series = match reader.layout() {
                Layout::TimeMajor => read,
                Layout::SpaceMajor => transpose(&read, nt, n),
            };
            for l in 0..n {
                buffer[l * total + offset..l * total + offset + nt]
                    .copy_from_slice(&series[l * nt..(l + 1) * nt]);
            }
            offset += nt;
        }

        LocationBatch::new(locations.start, n, total, buffer)
    }

    /// Single-pass sequence of batches covering every location in order.
    pub fn batches(&self) -> AssembledBatches<'_, 'a, R> {
        AssembledBatches {
            assembler: self,
            next: 0,
        }
    }
}

/// Iterator over assembled batches; see [`TimeSeriesAssembler::batches`].
pub struct AssembledBatches<'s, 'a, R> {
    assembler: &'s TimeSeriesAssembler<'a, R>,
    next: usize,
}

impl<R: LocationRangeReader> Iterator for AssembledBatches<'_, '_, R> {
    type Item = series_store::Result<LocationBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        let n_locations = self.assembler.n_locations;
        if self.next >= n_locations {
            return None;
        }
        let start = self.next;
        let end = (start + self.assembler.batch_locations).min(n_locations);
        self.next = end;

        debug!(start = start, end = end, total = n_locations, "Assembling batch");
        let batch = self.assembler.assemble(start..end);
        if batch.is_err() {
            // stop after the first failure
            self.next = n_locations;
        }
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .assembler
            .n_locations
            .saturating_sub(self.next)
            .div_ceil(self.assembler.batch_locations);
        (remaining, Some(remaining))
    }
}
