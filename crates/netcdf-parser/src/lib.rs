//! Decoder for daily climate-model archives.
//!
//! Archives are NetCDF-4 files holding one variable laid out as
//! `(time, lat, lon)` (or `(lat, lon)` for static fields) on a 0°..360°
//! longitude axis. [`ArchiveIngestor`] turns such a variable into a
//! [`SpaceMajorArray`](series_store::SpaceMajorArray) on the canonical
//! -180°..180° grid, optionally converting units on the way.
//!
//! The pure parts of that work ([`normalize`], [`rewrap_longitude`],
//! [`apply_multiply_add`]) are exposed separately so they can be tested
//! without HDF5.

pub mod archive;
pub mod error;
pub mod normalize;

pub use archive::{silence_hdf5_errors, Archive, ArchiveIngestor, FieldInfo};
pub use error::{NetCdfError, NetCdfResult};
pub use normalize::{apply_multiply_add, normalize, rewrap_longitude, FieldShape};
