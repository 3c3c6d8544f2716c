//! Shared test utilities for the cmip-downloader workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic NetCDF archives shaped like the published daily files
//! - Field generators with predictable, checkable values
//! - Temporary directory helpers
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! ```ignore
//! use test_utils::{write_series_archive, create_constant_series};
//! ```

pub mod archives;
pub mod generators;
pub mod paths;

// Re-export commonly used items at the crate root
pub use archives::*;
pub use generators::*;
pub use paths::*;

/// Asserts that two floats differ by at most `epsilon`, compared as `f64`.
///
/// An optional trailing format string and arguments are added to the panic
/// message.
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(20.0001_f32, 20.0, 1e-3);
/// assert_approx_eq!(rh, expected, 0.5, "location {}", location);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr $(,)?) => {
        $crate::assert_approx_eq!($left, $right, $epsilon, "")
    };
    ($left:expr, $right:expr, $epsilon:expr, $($context:tt)+) => {{
        let (left, right, epsilon) = ($left as f64, $right as f64, $epsilon as f64);
        let diff = (left - right).abs();
        if !(diff <= epsilon) {
            panic!(
                "assertion failed: {} ≈ {} (diff {} > {}) {}",
                left,
                right,
                diff,
                epsilon,
                format_args!($($context)+)
            );
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(-273.15_f32, -273.15_f64, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    #[should_panic(expected = "step 3")]
    fn test_assert_approx_eq_context() {
        assert_approx_eq!(f32::NAN, 1.0, 0.5, "step {}", 3);
    }
}
