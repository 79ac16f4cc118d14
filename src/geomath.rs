use geo::{Distance, Haversine, Point};
use uom::si::{f64::Length, length::meter};

/// Build a [`Point`] from latitude/longitude in degrees
///
/// Note the reversed order: `geo` maps `x` to longitude and `y` to latitude.
pub fn lat_lon_point(lat: f64, lon: f64) -> Point<f64> {
    Point::new(lon, lat)
}

/// Great-circle distance between two (latitude, longitude) pairs in degrees
///
/// The spatial index measures planar degree-space distance; this is only used
/// to report how far a station actually is from the cell it was matched to.
pub fn great_circle_distance(start: (f64, f64), end: (f64, f64)) -> Length {
    let meters = Haversine.distance(lat_lon_point(start.0, start.1), lat_lon_point(end.0, end.1));
    Length::new::<meter>(meters)
}
