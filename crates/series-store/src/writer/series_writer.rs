//! Zarr V3 writer for per-location time series.
//!
//! Arrays are created under `<path>.tmp` and renamed onto `<path>` only once
//! every value is stored, so an interrupted run never leaves a file that
//! looks complete.

use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use zarrs::array::codec::array_to_bytes::sharding::{ShardingCodec, ShardingCodecBuilder};
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::codec::BytesToBytesCodecTraits;
use zarrs::array::{Array, ArrayBuilder, ChunkGrid, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

use crate::config::{StoreCompression, StoreConfig};
use crate::error::{Result, StoreError};
use crate::types::{Layout, LocationBatch};

/// Round every finite value to the resolution `1 / scale_factor`.
///
/// NaN passes through untouched; a non-positive scale factor leaves the
/// buffer as is.
pub fn quantize(data: &mut [f32], scale_factor: f32) {
    if scale_factor.is_nan() || scale_factor <= 0.0 {
        return;
    }
    data.par_iter_mut().for_each(|v| {
        if v.is_finite() {
            *v = (*v * scale_factor).round() / scale_factor;
        }
    });
}

/// Shape, chunking and attributes of an array to create.
#[derive(Debug, Clone)]
pub struct SeriesSpec {
    /// `[dim0, dim1]`; `[locations, time]` for time series.
    pub shape: [usize; 2],
    /// Inner chunk shape.
    pub chunks: [usize; 2],
    /// Number of dim0 entries per shard, if sharded.
    pub shard_dim0: Option<usize>,
    /// Layout tag stored as the `layout` attribute.
    pub layout: Option<Layout>,
    pub scale_factor: f32,
    /// Extra attributes (model, variable, units, ...).
    pub attributes: Map<String, Value>,
}

impl SeriesSpec {
    /// Final per-location series `[n_locations, n_time]` chunked per the config.
    pub fn time_series(
        config: &StoreConfig,
        n_locations: usize,
        n_time: usize,
        scale_factor: f32,
    ) -> Self {
        let shard_dim0 = (config.shard_locations > 0).then_some(config.shard_locations);
        Self {
            shape: [n_locations, n_time],
            chunks: [config.series_chunk_locations, config.series_chunk_time],
            shard_dim0,
            layout: Some(Layout::TimeMajor),
            scale_factor,
            attributes: Map::new(),
        }
    }

    /// Unsharded time-major scratch array with `locations_per_chunk` series per chunk.
    pub fn intermediate(
        n_locations: usize,
        n_time: usize,
        locations_per_chunk: usize,
        scale_factor: f32,
    ) -> Self {
        Self {
            shape: [n_locations, n_time],
            chunks: [locations_per_chunk.max(1), n_time.max(1)],
            shard_dim0: None,
            layout: Some(Layout::TimeMajor),
            scale_factor,
            attributes: Map::new(),
        }
    }

    /// Single 2D field `[ny, nx]` with square chunks.
    pub fn static_field(config: &StoreConfig, ny: usize, nx: usize, scale_factor: f32) -> Self {
        Self {
            shape: [ny, nx],
            chunks: [config.static_chunk_size, config.static_chunk_size],
            shard_dim0: None,
            layout: None,
            scale_factor,
            attributes: Map::new(),
        }
    }

    /// Add an attribute.
    pub fn attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    fn len(&self) -> usize {
        self.shape[0] * self.shape[1]
    }
}

/// Result of writing a series array.
#[derive(Debug, Clone)]
pub struct SeriesWriteResult {
    pub path: PathBuf,
    pub shape: [usize; 2],
    /// Uncompressed size of the stored values.
    pub bytes_written: u64,
}

/// Writer for creating Zarr V3 series arrays on the local filesystem.
pub struct TimeSeriesWriter {
    config: StoreConfig,
}

impl TimeSeriesWriter {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Create a new array at `<path>.tmp`, ready to receive values.
    ///
    /// A stale temporary directory from an earlier interrupted run is removed
    /// first.
    pub fn create(&self, path: &Path, spec: SeriesSpec) -> Result<PendingSeries> {
        if spec.shape.contains(&0) || spec.chunks.contains(&0) {
            return Err(StoreError::ConfigError(format!(
                "invalid series shape {:?} / chunks {:?}",
                spec.shape, spec.chunks
            )));
        }

        let tmp_path = temporary_path(path);
        if tmp_path.exists() {
            warn!(path = %tmp_path.display(), "Removing stale temporary series");
            std::fs::remove_dir_all(&tmp_path)?;
        }
        std::fs::create_dir_all(&tmp_path)?;

        let store = FilesystemStore::new(&tmp_path)
            .map_err(|e| StoreError::write_failed(e.to_string()))?;
        let array = self.build_array(Arc::new(store), &spec)?;
        array
            .store_metadata()
            .map_err(|e| StoreError::write_failed(e.to_string()))?;

        debug!(
            path = %path.display(),
            shape = ?spec.shape,
            chunks = ?spec.chunks,
            sharded = spec.shard_dim0.is_some(),
            "Created series array"
        );

        Ok(PendingSeries {
            array,
            tmp_path,
            final_path: path.to_path_buf(),
            spec,
            next_dim0: 0,
        })
    }

    fn build_array(
        &self,
        store: Arc<FilesystemStore>,
        spec: &SeriesSpec,
    ) -> Result<Array<FilesystemStore>> {
        let mut attrs = spec.attributes.clone();
        attrs.insert("scale_factor".to_string(), json!(spec.scale_factor));
        attrs.insert(
            "compression".to_string(),
            json!(self.config.compression.as_str()),
        );
        if let Some(layout) = spec.layout {
            attrs.insert("layout".to_string(), json!(layout.as_str()));
        }

        let shape: Vec<u64> = spec.shape.iter().map(|&d| d as u64).collect();

        let array = match spec.shard_dim0 {
            Some(shard_dim0) => {
                // Shards must hold a whole number of inner chunks.
                let shard_shape = vec![
                    round_up(shard_dim0.max(spec.chunks[0]), spec.chunks[0]) as u64,
                    round_up(spec.shape[1], spec.chunks[1]) as u64,
                ];
                let chunk_grid: ChunkGrid = shard_shape
                    .try_into()
                    .map_err(|e| StoreError::ConfigError(format!("{:?}", e)))?;
                let sharding_codec = self.build_sharding_codec(spec.chunks)?;

                let mut binding = ArrayBuilder::new(
                    shape,
                    DataType::Float32,
                    chunk_grid,
                    FillValue::from(f32::NAN),
                );
                binding
                    .array_to_bytes_codec(Arc::new(sharding_codec))
                    .attributes(attrs)
                    .build(store, "/")
                    .map_err(|e| StoreError::write_failed(e.to_string()))?
            }
            None => {
                let chunk_grid: ChunkGrid = vec![spec.chunks[0] as u64, spec.chunks[1] as u64]
                    .try_into()
                    .map_err(|e| StoreError::ConfigError(format!("{:?}", e)))?;

                let mut binding = ArrayBuilder::new(
                    shape,
                    DataType::Float32,
                    chunk_grid,
                    FillValue::from(f32::NAN),
                );
                let mut builder = binding.attributes(attrs);
                if self.config.compression != StoreCompression::None {
                    builder = builder.bytes_to_bytes_codecs(vec![self.create_compression_codec()?]);
                }
                builder
                    .build(store, "/")
                    .map_err(|e| StoreError::write_failed(e.to_string()))?
            }
        };

        Ok(array)
    }

    fn create_compression_codec(&self) -> Result<Arc<dyn BytesToBytesCodecTraits>> {
        let level = BloscCompressionLevel::try_from(self.config.compression_level)
            .map_err(|_| StoreError::ConfigError("invalid compression level".to_string()))?;

        let shuffle = if self.config.shuffle {
            BloscShuffleMode::Shuffle
        } else {
            BloscShuffleMode::NoShuffle
        };
        // typesize is required when shuffle is enabled
        let typesize = self.config.shuffle.then_some(std::mem::size_of::<f32>());

        let compressor = match self.config.compression {
            StoreCompression::None => {
                return Err(StoreError::ConfigError(
                    "no compression configured".to_string(),
                ))
            }
            StoreCompression::BloscLz4 => BloscCompressor::LZ4,
            StoreCompression::BloscZstd => BloscCompressor::Zstd,
        };

        let codec = BloscCodec::new(compressor, level, None, shuffle, typesize)
            .map_err(|e| StoreError::ConfigError(e.to_string()))?;

        Ok(Arc::new(codec))
    }

    fn build_sharding_codec(&self, chunks: [usize; 2]) -> Result<ShardingCodec> {
        let inner_chunk_shape = chunks
            .iter()
            .map(|&c| {
                NonZeroU64::new(c as u64)
                    .ok_or_else(|| StoreError::ConfigError("zero inner chunk size".to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let codec = if self.config.compression != StoreCompression::None {
            ShardingCodecBuilder::new(inner_chunk_shape.into())
                .bytes_to_bytes_codecs(vec![self.create_compression_codec()?])
                .build()
        } else {
            ShardingCodecBuilder::new(inner_chunk_shape.into()).build()
        };

        Ok(codec)
    }
}

/// An array under construction at its temporary path.
///
/// Dropping it without calling one of the `write_*` methods to completion
/// leaves the temporary directory behind; the next `create` for the same
/// path clears it.
pub struct PendingSeries {
    array: Array<FilesystemStore>,
    tmp_path: PathBuf,
    final_path: PathBuf,
    spec: SeriesSpec,
    next_dim0: usize,
}

impl PendingSeries {
    pub fn spec(&self) -> &SeriesSpec {
        &self.spec
    }

    /// Store the whole array in one call and finalise it.
    pub fn write_all(mut self, mut data: Vec<f32>) -> Result<SeriesWriteResult> {
        if data.len() != self.spec.len() {
            return Err(StoreError::ShapeMismatch {
                expected: self.spec.len(),
                actual: data.len(),
            });
        }
        quantize(&mut data, self.spec.scale_factor);
        self.store_rows(0, self.spec.shape[0], &data)?;
        self.next_dim0 = self.spec.shape[0];
        self.finish()
    }

    /// Store contiguous location batches as they are produced and finalise.
    ///
    /// Batches must start at location 0, follow each other without gaps and
    /// together cover every location. Any error from the iterator aborts the
    /// write and leaves the final path untouched.
    pub fn write_batches<I>(mut self, batches: I) -> Result<SeriesWriteResult>
    where
        I: IntoIterator<Item = Result<LocationBatch>>,
    {
        for batch in batches {
            let mut batch = batch?;
            if batch.start != self.next_dim0 {
                return Err(StoreError::BatchSequence(format!(
                    "expected batch starting at {}, got {}",
                    self.next_dim0, batch.start
                )));
            }
            if batch.n_time != self.spec.shape[1] {
                return Err(StoreError::BatchSequence(format!(
                    "batch has {} time steps, array has {}",
                    batch.n_time, self.spec.shape[1]
                )));
            }
            if batch.start + batch.n_locations > self.spec.shape[0] {
                return Err(StoreError::OutOfBounds {
                    dimension: "locations",
                    requested: format!("{:?}", batch.locations()),
                    length: self.spec.shape[0],
                });
            }

            quantize(&mut batch.data, self.spec.scale_factor);
            self.store_rows(batch.start, batch.n_locations, &batch.data)?;
            self.next_dim0 += batch.n_locations;
        }

        if self.next_dim0 != self.spec.shape[0] {
            return Err(StoreError::BatchSequence(format!(
                "batches covered {} of {} locations",
                self.next_dim0, self.spec.shape[0]
            )));
        }
        self.finish()
    }

    fn store_rows(&self, start: usize, rows: usize, data: &[f32]) -> Result<()> {
        let subset = ArraySubset::new_with_start_shape(
            vec![start as u64, 0],
            vec![rows as u64, self.spec.shape[1] as u64],
        )
        .map_err(|e| StoreError::write_failed(e.to_string()))?;

        self.array
            .store_array_subset_elements(&subset, data)
            .map_err(|e| StoreError::write_failed(e.to_string()))
    }

    fn finish(self) -> Result<SeriesWriteResult> {
        if self.final_path.exists() {
            warn!(path = %self.final_path.display(), "Replacing existing series");
            std::fs::remove_dir_all(&self.final_path)?;
        }
        if let Some(parent) = self.final_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::rename(&self.tmp_path, &self.final_path)?;

        let bytes_written = (self.spec.len() * std::mem::size_of::<f32>()) as u64;
        info!(
            path = %self.final_path.display(),
            locations = self.spec.shape[0],
            time_steps = self.spec.shape[1],
            bytes = bytes_written,
            "Series written"
        );

        Ok(SeriesWriteResult {
            path: self.final_path,
            shape: self.spec.shape,
            bytes_written,
        })
    }
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn round_up(value: usize, multiple: usize) -> usize {
    value.div_ceil(multiple) * multiple
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_keeps_nan() {
        let mut data = vec![1.234, f32::NAN, -0.06];
        quantize(&mut data, 10.0);
        assert!((data[0] - 1.2).abs() < 1e-6);
        assert!(data[1].is_nan());
        assert!((data[2] + 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_quantize_zero_scale_is_noop() {
        let mut data = vec![1.234];
        quantize(&mut data, 0.0);
        assert_eq!(data, vec![1.234]);
    }

    #[test]
    fn test_temporary_path() {
        assert_eq!(
            temporary_path(Path::new("/data/out/t2m_1990.zarr")),
            PathBuf::from("/data/out/t2m_1990.zarr.tmp")
        );
    }

    #[test]
    fn test_round_up() {
        assert_eq!(round_up(6000, 6), 6000);
        assert_eq!(round_up(365, 183), 366);
    }

    #[test]
    fn test_rejects_zero_shape() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let writer = TimeSeriesWriter::new(StoreConfig::default());
        let spec = SeriesSpec::time_series(writer.config(), 0, 365, 1.0);
        assert!(writer
            .create(&temp_dir.path().join("empty.zarr"), spec)
            .is_err());
    }
}
