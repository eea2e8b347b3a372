//! Utility functions shared by the pipeline and statistics.

use chrono::{DateTime, TimeZone};

/// Round to a fixed number of decimal places, halves going to the even
/// neighbour.
///
/// # Arguments
///
/// * `value` - Value to round
/// * `places` - Number of decimal places to keep
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}

/// Prefix a filename with a second-resolution timestamp.
///
/// Two uploads of the same name within one second produce the same result.
#[must_use]
pub fn timestamped_filename<Tz: TimeZone>(at: &DateTime<Tz>, filename: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}_{}", at.format("%Y%m%d_%H%M%S"), filename)
}
