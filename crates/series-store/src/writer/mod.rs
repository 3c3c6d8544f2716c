//! Writers for the series store.

mod series_writer;

pub use series_writer::{quantize, PendingSeries, SeriesSpec, SeriesWriteResult, TimeSeriesWriter};
