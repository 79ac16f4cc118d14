use std::fmt::Display;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::{FwfError, Result};

/// Dimensions of a model domain, `(south_north, west_east)` in dataset terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    pub rows: usize,
    pub cols: usize,
}

impl GridShape {
    pub fn new(rows: usize, cols: usize) -> Self {
        GridShape { rows, cols }
    }

    /// Number of cells in the grid
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// Number of cells, or `None` if `rows * cols` overflows `usize`
    pub fn checked_len(&self) -> Option<usize> {
        self.rows.checked_mul(self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }
}

impl From<(usize, usize)> for GridShape {
    fn from((rows, cols): (usize, usize)) -> Self {
        GridShape { rows, cols }
    }
}

impl Display for GridShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(south_north: {}, west_east: {})", self.rows, self.cols)
    }
}

/// Latitude/longitude of one grid cell in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GridPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        GridPoint { lat, lon }
    }

    /// Coordinates in the order the spatial index stores them
    pub(crate) fn as_key(&self) -> [f64; 2] {
        [self.lat, self.lon]
    }
}

/// Convert a row-major flat index into `(row, col)`
///
/// `flat` must be smaller than `shape.len()`; `cols` must be non-zero.
pub fn unravel_index(flat: usize, shape: GridShape) -> (usize, usize) {
    (flat / shape.cols, flat % shape.cols)
}

/// Inverse of [`unravel_index`]
pub fn ravel_index(row: usize, col: usize, shape: GridShape) -> usize {
    row * shape.cols + col
}

/// The pair of 2D coordinate arrays (`XLAT`, `XLONG`) describing a curvilinear model grid
#[derive(Debug, Clone)]
pub struct LatLonGrid {
    lat: Array2<f64>,
    lon: Array2<f64>,
}

impl LatLonGrid {
    /// Pair up latitude and longitude arrays, failing if their shapes differ
    pub fn new(lat: Array2<f64>, lon: Array2<f64>) -> Result<Self> {
        if lat.dim() != lon.dim() {
            return Err(FwfError::ShapeMismatch {
                lat: lat.dim(),
                lon: lon.dim(),
            });
        }
        if lat.is_empty() {
            return Err(FwfError::EmptyGrid);
        }
        Ok(LatLonGrid { lat, lon })
    }

    pub fn shape(&self) -> GridShape {
        self.lat.dim().into()
    }

    pub fn lat(&self) -> &Array2<f64> {
        &self.lat
    }

    pub fn lon(&self) -> &Array2<f64> {
        &self.lon
    }

    /// Flatten both arrays in row-major order and zip them into points
    ///
    /// `ndarray` iterates in logical order regardless of memory layout, so the
    /// position in the returned `Vec` is always `ravel_index(row, col)`.
    pub fn flatten(&self) -> Vec<GridPoint> {
        self.lat
            .iter()
            .zip(self.lon.iter())
            .map(|(&lat, &lon)| GridPoint::new(lat, lon))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn unravel_ravel_round_trip() {
        for rows in 1..6 {
            for cols in 1..6 {
                let shape = GridShape::new(rows, cols);
                for flat in 0..shape.len() {
                    let (row, col) = unravel_index(flat, shape);
                    assert!(row < rows && col < cols);
                    assert_eq!(ravel_index(row, col, shape), flat);
                }
            }
        }
    }

    #[test]
    fn unravel_matches_dataset_dimensions() {
        // last cell of the d03 grid
        let shape = GridShape::new(840, 642);
        assert_eq!(unravel_index(shape.len() - 1, shape), (839, 641));
        assert_eq!(unravel_index(642, shape), (1, 0));
    }

    #[test]
    fn checked_len_detects_overflow() {
        assert_eq!(GridShape::new(417, 627).checked_len(), Some(261_459));
        assert_eq!(GridShape::new(usize::MAX, 2).checked_len(), None);
        assert!(!GridShape::new(usize::MAX, 2).is_empty());
        assert!(GridShape::new(3, 0).is_empty());
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let lat = Array2::<f64>::zeros((3, 3));
        let lon = Array2::<f64>::zeros((3, 4));
        match LatLonGrid::new(lat, lon) {
            Err(FwfError::ShapeMismatch { lat, lon }) => {
                assert_eq!(lat, (3, 3));
                assert_eq!(lon, (3, 4));
            }
            other => panic!("expected shape mismatch, got {other:?}"),
        }
    }

    #[test]
    fn empty_grid_is_rejected() {
        let lat = Array2::<f64>::zeros((0, 3));
        let lon = Array2::<f64>::zeros((0, 3));
        assert!(matches!(LatLonGrid::new(lat, lon), Err(FwfError::EmptyGrid)));
    }

    #[test]
    fn flatten_is_row_major() {
        let lat = array![[1., 2.], [3., 4.]];
        let lon = array![[10., 20.], [30., 40.]];
        let grid = LatLonGrid::new(lat, lon).unwrap();
        let points = grid.flatten();
        assert_eq!(points[1], GridPoint::new(2., 20.));
        assert_eq!(points[2], GridPoint::new(3., 30.));

        // a transposed (column-major) view still flattens in logical order
        let lat_t = array![[1., 3.], [2., 4.]].reversed_axes();
        let lon_t = array![[10., 30.], [20., 40.]].reversed_axes();
        let grid_t = LatLonGrid::new(lat_t, lon_t).unwrap();
        assert_eq!(grid_t.flatten(), points);
    }
}
