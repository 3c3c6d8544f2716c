//! Static catalog for CMIP6 HighResMIP daily archives.
//!
//! Every table here is a closed lookup keyed by [`Model`] and [`Variable`]:
//! grid geometry, archive short names, source versions, unit transforms,
//! store scale factors and which temporal resolution a model publishes for
//! a variable. Nothing is loaded at runtime.
//!
//! # Example
//!
//! ```
//! use cmip_catalog::{Model, TemporalResolution, Variable};
//!
//! let model: Model = "MRI_AGCM3_2_S".parse().unwrap();
//! assert_eq!(model.grid().count(), 1920 * 960);
//! assert_eq!(
//!     Variable::PressureMsl.temporal_resolution(model),
//!     TemporalResolution::Yearly
//! );
//! ```

pub mod calendar;
pub mod error;
pub mod grid;
pub mod model;
pub mod uri;
pub mod variable;

pub use calendar::{days_in_year_truncated, is_future, month_lengths, month_period, year_period};
pub use error::{CatalogError, Result};
pub use grid::RegularGrid;
pub use model::{Model, OrographyVersions};
pub use uri::{
    ArchiveUri, Experiment, Frequency, ACTIVITY, DEFAULT_MIRRORS, FUTURE_CUTOVER_YEAR, VARIANT,
};
pub use variable::{DerivedInput, DerivedSource, MultiplyAdd, TemporalResolution, Variable};
