use std::{fmt::Debug, fmt::Display, ops::RangeInclusive};

use crate::{FwfError, Result};

pub(crate) const LATITUDE_RANGE: RangeInclusive<f64> = (-90.)..=90.;
pub(crate) const LONGITUDE_RANGE: RangeInclusive<f64> = (-180.)..=180.;

pub(crate) fn check_range_inclusive<T: Debug + Display + PartialOrd>(
    expected: RangeInclusive<T>,
    actual: T,
    name: &str,
    context: &str,
) -> Result<()> {
    if !expected.contains(&actual) {
        Err(FwfError::InvalidCoordinate(format!(
            "{name} in {context}: got {actual}, expected {expected:?}"
        )))
    } else {
        Ok(())
    }
}

/// Validate a latitude/longitude pair in degrees
///
/// NaN never falls inside a range, so non-finite values are rejected too.
pub(crate) fn check_lat_lon(lat: f64, lon: f64, context: &str) -> Result<()> {
    check_range_inclusive(LATITUDE_RANGE, lat, "latitude", context)?;
    check_range_inclusive(LONGITUDE_RANGE, lon, "longitude", context)
}

#[cfg(test)]
pub(crate) fn is_equal_within_error(test_value: f64, true_value: f64, error: f64) -> bool {
    test_value >= true_value - error && test_value <= true_value + error
}

#[test]
fn test_check_lat_lon() {
    assert!(check_lat_lon(50., -100., "test").is_ok());
    assert!(check_lat_lon(-90., 180., "test").is_ok());
    assert!(check_lat_lon(90.5, 0., "test").is_err());
    assert!(check_lat_lon(0., -180.1, "test").is_err());
    assert!(check_lat_lon(f64::NAN, 0., "test").is_err());
}
