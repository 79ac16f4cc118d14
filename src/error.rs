use std::io;

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, FwfError>;

#[derive(Debug, Error)]
/// Indicates a lookup-specific failure or wraps a lower-level error
pub enum FwfError {
    /// The latitude and longitude arrays handed to the index builder differ in shape
    #[error("Latitude grid has shape {lat:?} but longitude grid has shape {lon:?}")]
    ShapeMismatch {
        lat: (usize, usize),
        lon: (usize, usize),
    },
    /// Tried to build an index over a grid with no cells
    #[error("Cannot build a spatial index over an empty grid")]
    EmptyGrid,
    /// No cached index exists for the given key
    ///
    /// This is the normal signal that the index has to be built and saved, not a failure.
    #[error("No cached index for '{0}'")]
    CacheMiss(String),
    /// A cached index exists but could not be decoded or belongs to something else
    #[error("Cached index for '{key}' is unusable: {reason}")]
    CorruptCache { key: String, reason: String },
    /// A grid source did not provide every cell exactly once
    #[error("Incomplete grid: {0}")]
    IncompleteGrid(String),
    /// A coordinate was outside its valid range or not a finite number
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),
    #[error("Unknown model domain '{0}': expected d02 or d03")]
    UnknownDomain(String),
    #[error("Unknown dataset product '{0}': expected hourly or daily")]
    UnknownProduct(String),
    /// Forecast dates are written as YYYYMMDDHH
    #[error("Invalid forecast date '{0}': expected YYYYMMDDHH")]
    InvalidForecastDate(String),
    /// Input or output format that this crate can't handle (or wasn't built to handle)
    #[error("{0}")]
    UnsupportedFormat(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to encode or decode index: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),
}

impl FwfError {
    /// True when the error only means "nothing cached yet"
    pub fn is_cache_miss(&self) -> bool {
        matches!(self, FwfError::CacheMiss(_))
    }
}
