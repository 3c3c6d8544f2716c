//! Month and year bookkeeping for daily archives.
//!
//! Monthly archives are requested with February fixed at 28 days. The leap
//! day is dropped rather than detected, which matches models without leap
//! years and keeps every stitched year at 365 steps.

use chrono::NaiveDate;

use crate::error::{CatalogError, Result};

/// Number of days in each month of `year`, February truncated to 28.
pub fn month_lengths(year: i32) -> [usize; 12] {
    let mut lengths = [0; 12];
    for (i, length) in lengths.iter_mut().enumerate() {
        *length = days_in_month_truncated(year, i as u32 + 1);
    }
    lengths
}

/// Sum of [`month_lengths`], the time-step count of a stitched year.
pub fn days_in_year_truncated(year: i32) -> usize {
    month_lengths(year).iter().sum()
}

fn days_in_month_truncated(year: i32, month: u32) -> usize {
    if month == 2 {
        return 28;
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (first, next) {
        (Some(first), Some(next)) => (next - first).num_days() as usize,
        _ => 30,
    }
}

/// Period string `YYYYMM01-YYYYMMDD` of a monthly archive.
pub fn month_period(year: i32, month: u32) -> Result<String> {
    if !(1..=12).contains(&month) {
        return Err(CatalogError::InvalidMonth(month));
    }
    let last = days_in_month_truncated(year, month);
    Ok(format!("{year}{month:02}01-{year}{month:02}{last:02}"))
}

/// Period string `YYYY0101-YYYY{last_day}` of a yearly archive.
pub fn year_period(year: i32, last_day: &str) -> String {
    format!("{year}0101-{year}{last_day}")
}

/// Whether `year` falls in the future-scenario experiment.
pub fn is_future(year: i32) -> bool {
    year >= crate::uri::FUTURE_CUTOVER_YEAR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_lengths_sum_to_365() {
        for year in [1950, 2000, 2012, 2023] {
            assert_eq!(days_in_year_truncated(year), 365, "year {year}");
        }
    }

    #[test]
    fn test_february_is_truncated() {
        assert_eq!(month_lengths(2000)[1], 28);
        assert_eq!(month_lengths(2001)[1], 28);
        assert_eq!(month_lengths(2000)[0], 31);
        assert_eq!(month_lengths(2000)[3], 30);
    }

    #[test]
    fn test_month_period() {
        assert_eq!(month_period(2000, 2).unwrap(), "20000201-20000228");
        assert_eq!(month_period(1999, 12).unwrap(), "19991201-19991231");
        assert_eq!(month_period(1999, 13), Err(CatalogError::InvalidMonth(13)));
    }

    #[test]
    fn test_year_period() {
        assert_eq!(year_period(1960, "1230"), "19600101-19601230");
    }

    #[test]
    fn test_is_future() {
        assert!(!is_future(2014));
        assert!(is_future(2015));
    }
}
