//! Time-series store with Zarr V3 backing.
//!
//! Gridded archives arrive space-major (`[time][location]`), while readers
//! want every time step of one location in a single contiguous chunk. This
//! crate provides both layouts, the transposer between them, and a chunked
//! Blosc-compressed store that can be filled either in one bulk write or
//! batch by batch from an iterator.
//!
//! # Architecture
//!
//! ```text
//! SpaceMajorArray ──transpose()──► TimeMajorArray ──write_all()──┐
//!                                                                ▼
//! Iterator<LocationBatch> ─────────────────write_batches()──► <path>.tmp ──rename──► <path>
//!                                                                           │
//!                                          TimeSeriesReader::read(loc, t) ◄─┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use series_store::{SeriesSpec, StoreConfig, TimeSeriesReader, TimeSeriesWriter};
//!
//! let writer = TimeSeriesWriter::new(StoreConfig::default());
//! let spec = SeriesSpec::time_series(writer.config(), n_locations, 365, 20.0);
//! writer.create(&path, spec)?.write_all(series.data)?;
//!
//! let reader = TimeSeriesReader::open(&path)?;
//! let one_location = reader.read(42..43, 0..365)?;
//! ```

pub mod config;
pub mod error;
pub mod layout;
pub mod reader;
pub mod types;
pub mod writer;

// Re-export commonly used types at crate root
pub use config::{StoreCompression, StoreConfig};
pub use error::{Result, StoreError};
pub use layout::transpose;
pub use reader::{LocationRangeReader, TimeSeriesReader};
pub use types::{Layout, LocationBatch, SpaceMajorArray, TimeMajorArray};
pub use writer::{quantize, PendingSeries, SeriesSpec, SeriesWriteResult, TimeSeriesWriter};
