use std::{fmt::Display, fs::File, io::Read, path::Path};

use serde::Deserialize;
use tracing::{debug, info, warn};
use uom::si::{f64::Length, length::kilometer};

use crate::{
    Result,
    geomath::great_circle_distance,
    grid::{GridShape, unravel_index},
    index::SpatialIndex,
    utils::check_lat_lon,
};

/// Maximum planar distance, in degrees, between a station and its nearest grid
/// cell for the station to count as inside the model domain
pub const DISTANCE_THRESHOLD: f64 = 0.1;

/// A named location to look up, typically a weather station from the roster
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StationQuery {
    #[serde(rename = "wmo", alias = "station_id")]
    pub station_id: String,
    pub lat: f64,
    pub lon: f64,
}

impl StationQuery {
    pub fn new(station_id: impl Into<String>, lat: f64, lon: f64) -> Self {
        StationQuery {
            station_id: station_id.into(),
            lat,
            lon,
        }
    }
}

/// A station matched to a grid cell
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub station_id: String,
    pub row: usize,
    pub col: usize,
    /// Planar distance in degrees between the station and the cell
    pub distance: f64,
    pub station_lat: f64,
    pub station_lon: f64,
    pub grid_lat: f64,
    pub grid_lon: f64,
}

impl Resolution {
    /// Great-circle distance from the station to the centre of its cell
    pub fn offset(&self) -> Length {
        great_circle_distance(
            (self.station_lat, self.station_lon),
            (self.grid_lat, self.grid_lon),
        )
    }
}

impl Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{: <10} south_north {: >4}  west_east {: >4}  distance {:.4}°  offset {:.2} km",
            self.station_id,
            self.row,
            self.col,
            self.distance,
            self.offset().get::<kilometer>()
        )
    }
}

/// Resolve one station against `index` using [`DISTANCE_THRESHOLD`]
///
/// Stations farther than the threshold from every cell are outside the domain
/// and give `None`; that is not an error. So do queries with a non-finite
/// coordinate, and calls where `shape` is not the shape the index was built
/// from.
pub fn resolve(index: &SpatialIndex, query: &StationQuery, shape: GridShape) -> Option<Resolution> {
    resolve_with_threshold(index, query, shape, DISTANCE_THRESHOLD)
}

pub fn resolve_with_threshold(
    index: &SpatialIndex,
    query: &StationQuery,
    shape: GridShape,
    max_distance: f64,
) -> Option<Resolution> {
    if shape != index.shape() {
        warn!(
            key = index.key(),
            expected = %index.shape(),
            actual = %shape,
            "grid shape does not match the index"
        );
        return None;
    }
    if !query.lat.is_finite() || !query.lon.is_finite() {
        debug!(station = %query.station_id, "station has no finite coordinates");
        return None;
    }
    let (distance, flat) = index.nearest(query.lat, query.lon)?;
    if !(distance <= max_distance) {
        debug!(
            station = %query.station_id,
            distance,
            max_distance,
            "station is outside the model domain"
        );
        return None;
    }
    let (row, col) = unravel_index(flat, shape);
    let cell = index.point(flat)?;
    Some(Resolution {
        station_id: query.station_id.clone(),
        row,
        col,
        distance,
        station_lat: query.lat,
        station_lon: query.lon,
        grid_lat: cell.lat,
        grid_lon: cell.lon,
    })
}

/// Resolve every station in input order, keeping only those inside the domain
pub fn resolve_all(index: &SpatialIndex, queries: &[StationQuery], shape: GridShape) -> StationMap {
    resolve_all_with_threshold(index, queries, shape, DISTANCE_THRESHOLD)
}

pub fn resolve_all_with_threshold(
    index: &SpatialIndex,
    queries: &[StationQuery],
    shape: GridShape,
    max_distance: f64,
) -> StationMap {
    let entries: Vec<Resolution> = queries
        .iter()
        .filter_map(|query| resolve_with_threshold(index, query, shape, max_distance))
        .collect();
    info!(
        key = index.key(),
        stations = queries.len(),
        resolved = entries.len(),
        dropped = queries.len() - entries.len(),
        "resolved stations to grid cells"
    );
    StationMap { entries }
}

/// Stations resolved to grid cells, in the order they were queried
///
/// [`south_north`](Self::south_north) and [`west_east`](Self::west_east) are
/// parallel index vectors. Used together as a pointwise selection on the
/// dataset's `south_north`/`west_east` dimensions, they pick out one time
/// series per station, in the same order as [`station_ids`](Self::station_ids).
/// Reading the variables themselves is left to the NetCDF tooling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationMap {
    entries: Vec<Resolution>,
}

impl StationMap {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(row, col)` of the first resolution for `station_id`
    pub fn get(&self, station_id: &str) -> Option<(usize, usize)> {
        self.entries
            .iter()
            .find(|r| r.station_id == station_id)
            .map(|r| (r.row, r.col))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resolution> {
        self.entries.iter()
    }

    pub fn station_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|r| r.station_id.as_str()).collect()
    }

    /// Row indexes along the dataset's `south_north` dimension, one per station
    pub fn south_north(&self) -> Vec<usize> {
        self.entries.iter().map(|r| r.row).collect()
    }

    /// Column indexes along the dataset's `west_east` dimension, one per station
    pub fn west_east(&self) -> Vec<usize> {
        self.entries.iter().map(|r| r.col).collect()
    }
}

impl IntoIterator for StationMap {
    type Item = Resolution;
    type IntoIter = std::vec::IntoIter<Resolution>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a StationMap {
    type Item = &'a Resolution;
    type IntoIter = std::slice::Iter<'a, Resolution>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Read a station roster with `wmo`, `lat` and `lon` columns
///
/// Other columns are ignored. Coordinates outside [-90, 90] / [-180, 180] are rejected.
pub fn read_roster<R: Read>(input: R) -> Result<Vec<StationQuery>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);
    let mut stations = Vec::new();
    for record in reader.deserialize() {
        let station: StationQuery = record?;
        check_lat_lon(station.lat, station.lon, &format!("station {}", station.station_id))?;
        stations.push(station);
    }
    Ok(stations)
}

pub fn read_roster_path(path: &Path) -> Result<Vec<StationQuery>> {
    let stations = read_roster(File::open(path)?)?;
    info!(path = %path.display(), stations = stations.len(), "read station roster");
    Ok(stations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FwfError, index::tests::sample_grid};

    fn sample_index() -> SpatialIndex {
        SpatialIndex::build("test", &sample_grid()).unwrap()
    }

    #[test]
    fn station_on_grid_point() {
        let index = sample_index();
        let shape = index.shape();
        let r = resolve(&index, &StationQuery::new("71203", 50., -100.), shape).unwrap();
        assert_eq!((r.row, r.col), (1, 1));
        assert_eq!(r.distance, 0.);
        assert_eq!((r.grid_lat, r.grid_lon), (50., -100.));
    }

    #[test]
    fn station_far_outside_domain() {
        let index = sample_index();
        let shape = index.shape();
        assert_eq!(resolve(&index, &StationQuery::new("pole", 90., 0.), shape), None);
    }

    #[test]
    fn threshold_is_inclusive() {
        let index = sample_index();
        let shape = index.shape();
        // 1/16 degree north of the centre cell, exactly representable
        let near = StationQuery::new("edge", 50.0625, -100.);
        assert!(resolve_with_threshold(&index, &near, shape, 0.0625).is_some());
        assert!(resolve_with_threshold(&index, &near, shape, 0.0624).is_none());
        let outside = StationQuery::new("gap", 50.25, -100.25);
        assert!(resolve(&index, &outside, shape).is_none());
    }

    #[test]
    fn resolve_all_empty() {
        let index = sample_index();
        assert!(resolve_all(&index, &[], index.shape()).is_empty());
    }

    #[test]
    fn resolve_all_keeps_order_and_shared_cells() {
        let index = sample_index();
        let queries = vec![
            StationQuery::new("a", 49.52, -99.48),
            StationQuery::new("far", 10., 10.),
            StationQuery::new("b", 50.01, -100.02),
            StationQuery::new("c", 49.99, -99.99),
        ];
        let map = resolve_all(&index, &queries, index.shape());
        assert_eq!(map.station_ids(), vec!["a", "b", "c"]);
        assert_eq!(map.get("a"), Some((2, 2)));
        assert_eq!(map.get("b"), Some((1, 1)));
        assert_eq!(map.get("c"), Some((1, 1)));
        assert_eq!(map.get("far"), None);
        assert_eq!(map.south_north(), vec![2, 1, 1]);
        assert_eq!(map.west_east(), vec![2, 1, 1]);
    }

    #[test]
    fn nan_station_is_not_resolved() {
        let index = sample_index();
        let shape = index.shape();
        let nan = StationQuery::new("nan", f64::NAN, f64::NAN);
        assert_eq!(resolve(&index, &nan, shape), None);
        let half = StationQuery::new("half", 50., f64::NAN);
        assert_eq!(resolve(&index, &half, shape), None);
        assert_eq!(
            resolve_with_threshold(&index, &nan, shape, f64::INFINITY),
            None
        );
    }

    #[test]
    fn nan_threshold_accepts_nothing() {
        let index = sample_index();
        let on_point = StationQuery::new("71203", 50., -100.);
        assert_eq!(
            resolve_with_threshold(&index, &on_point, index.shape(), f64::NAN),
            None
        );
    }

    #[test]
    fn resolve_all_drops_non_finite_stations() {
        let index = sample_index();
        let queries = vec![
            StationQuery::new("nan", f64::NAN, f64::NAN),
            StationQuery::new("b", 50.01, -100.02),
            StationQuery::new("inf", f64::INFINITY, -100.),
        ];
        let map = resolve_all(&index, &queries, index.shape());
        assert_eq!(map.station_ids(), vec!["b"]);
        assert!(map.iter().all(|r| r.distance <= DISTANCE_THRESHOLD));
    }

    #[test]
    fn shape_without_columns_is_rejected() {
        let index = sample_index();
        let q = StationQuery::new("71203", 50., -100.);
        assert_eq!(resolve(&index, &q, GridShape::new(3, 0)), None);
        assert!(resolve_all(&index, &[q], GridShape::new(0, 0)).is_empty());
    }

    #[test]
    fn shape_other_than_the_index_is_rejected() {
        let index = sample_index();
        // same number of cells, different layout
        let q = StationQuery::new("a", 49.52, -99.48);
        assert_eq!(resolve(&index, &q, GridShape::new(9, 1)), None);
        assert_eq!(resolve(&index, &q, GridShape::new(1, 9)), None);
        assert_eq!(
            resolve(&index, &q, index.shape()).map(|r| (r.row, r.col)),
            Some((2, 2))
        );
    }

    #[test]
    fn station_map_indexes_line_up_with_ids() {
        let index = sample_index();
        let queries = vec![
            StationQuery::new("x", 50.49, -100.49),
            StationQuery::new("y", 49.51, -99.51),
        ];
        let map = resolve_all(&index, &queries, index.shape());
        let picked: Vec<_> = map
            .station_ids()
            .into_iter()
            .zip(map.south_north().into_iter().zip(map.west_east()))
            .collect();
        assert_eq!(picked, vec![("x", (0, 0)), ("y", (2, 2))]);
    }

    #[test]
    fn roster_ignores_extra_columns() {
        let csv = "name,wmo,lat,lon,elev\n\
                   Edmonton,71123,53.57,-113.52,671\n\
                   Yellowknife, 71936 ,62.46,-114.44,205\n";
        let stations = read_roster(csv.as_bytes()).unwrap();
        assert_eq!(
            stations,
            vec![
                StationQuery::new("71123", 53.57, -113.52),
                StationQuery::new("71936", 62.46, -114.44),
            ]
        );
    }

    #[test]
    fn roster_rejects_bad_coordinates() {
        let csv = "wmo,lat,lon\n71123,153.57,-113.52\n";
        assert!(matches!(
            read_roster(csv.as_bytes()),
            Err(FwfError::InvalidCoordinate(_))
        ));
    }

    #[test]
    fn empty_roster() {
        assert!(read_roster("wmo,lat,lon\n".as_bytes()).unwrap().is_empty());
    }
}
