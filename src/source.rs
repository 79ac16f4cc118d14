//! Loading the `XLAT`/`XLONG` coordinate grids of a model domain.
//!
//! Two inputs are understood:
//!
//! - `.csv` with columns `south_north,west_east,lat,lon`, one row per cell in
//!   any order
//! - `.nc`, the forecast dataset itself (only with the `netcdf` feature)

use std::{fs::File, io::Read, path::Path};

use ndarray::Array2;
use serde::Deserialize;
use tracing::info;

use crate::{
    FwfError, Result,
    grid::{GridShape, LatLonGrid, ravel_index},
};

#[derive(Debug, Deserialize)]
struct GridCellRecord {
    south_north: usize,
    west_east: usize,
    lat: f64,
    lon: f64,
}

/// Load a coordinate grid, picking the reader from the file extension
pub fn load_grid(path: &Path) -> Result<LatLonGrid> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let grid = match extension.as_deref() {
        Some("csv") => read_csv_grid(File::open(path)?)?,
        Some("nc") => read_netcdf_grid(path)?,
        _ => {
            return Err(FwfError::UnsupportedFormat(format!(
                "Don't know how to read a grid from {}: expected .csv or .nc",
                path.display()
            )));
        }
    };
    info!(path = %path.display(), shape = %grid.shape(), "loaded coordinate grid");
    Ok(grid)
}

/// Read a grid from CSV rows of `south_north,west_east,lat,lon`
///
/// The grid shape is inferred from the largest indexes; every cell has to
/// appear exactly once.
pub fn read_csv_grid<R: Read>(input: R) -> Result<LatLonGrid> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);
    let mut cells = Vec::new();
    for record in reader.deserialize() {
        let cell: GridCellRecord = record?;
        cells.push(cell);
    }
    if cells.is_empty() {
        return Err(FwfError::EmptyGrid);
    }
    let extent = |index: usize| {
        index.checked_add(1).ok_or_else(|| {
            FwfError::IncompleteGrid(format!("cell index {index} is out of range"))
        })
    };
    let rows = extent(cells.iter().map(|c| c.south_north).max().unwrap_or(0))?;
    let cols = extent(cells.iter().map(|c| c.west_east).max().unwrap_or(0))?;
    let shape = GridShape::new(rows, cols);
    // a grid with more cells than rows read can't be complete
    match shape.checked_len() {
        Some(len) if len <= cells.len() => {}
        _ => {
            return Err(FwfError::IncompleteGrid(format!(
                "{} cells read for a grid of shape {shape}",
                cells.len()
            )));
        }
    }

    let mut lat = vec![f64::NAN; shape.len()];
    let mut lon = vec![f64::NAN; shape.len()];
    let mut seen = vec![false; shape.len()];
    for cell in cells {
        let flat = ravel_index(cell.south_north, cell.west_east, shape);
        if seen[flat] {
            return Err(FwfError::IncompleteGrid(format!(
                "cell ({}, {}) appears more than once",
                cell.south_north, cell.west_east
            )));
        }
        seen[flat] = true;
        lat[flat] = cell.lat;
        lon[flat] = cell.lon;
    }
    let missing = seen.iter().filter(|s| !**s).count();
    if missing > 0 {
        return Err(FwfError::IncompleteGrid(format!(
            "{missing} of {} cells missing from a grid of shape {shape}",
            shape.len()
        )));
    }
    LatLonGrid::new(to_array(shape, lat)?, to_array(shape, lon)?)
}

fn to_array(shape: GridShape, values: Vec<f64>) -> Result<Array2<f64>> {
    Array2::from_shape_vec((shape.rows, shape.cols), values)
        .map_err(|e| FwfError::IncompleteGrid(e.to_string()))
}

#[cfg(feature = "netcdf")]
fn read_netcdf_grid(path: &Path) -> Result<LatLonGrid> {
    let file = netcdf::open(path)?;
    let lat = read_coordinate(&file, &["XLAT", "lat", "latitude"])?;
    let lon = read_coordinate(&file, &["XLONG", "lon", "longitude"])?;
    LatLonGrid::new(lat, lon)
}

/// Read a 2D coordinate variable; for `(time, south_north, west_east)` variables
/// the first time slice is used
#[cfg(feature = "netcdf")]
fn read_coordinate(file: &netcdf::File, names: &[&str]) -> Result<Array2<f64>> {
    for name in names {
        let Some(var) = file.variable(name) else {
            continue;
        };
        let dims: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        if dims.len() < 2 {
            return Err(FwfError::UnsupportedFormat(format!(
                "{name} has {} dimensions, expected at least 2",
                dims.len()
            )));
        }
        let shape = GridShape::new(dims[dims.len() - 2], dims[dims.len() - 1]);
        let mut values: Vec<f64> = var.get_values(..)?;
        values.truncate(shape.len());
        return to_array(shape, values);
    }
    Err(FwfError::UnsupportedFormat(format!(
        "dataset has none of the variables {}",
        names.join(", ")
    )))
}

#[cfg(not(feature = "netcdf"))]
fn read_netcdf_grid(path: &Path) -> Result<LatLonGrid> {
    Err(FwfError::UnsupportedFormat(format!(
        "Can't read {}: built without the `netcdf` feature",
        path.display()
    )))
}
