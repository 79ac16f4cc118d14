use std::{io::Write, path::Path};

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value, feature::Id};
use serde::Serialize;
use shapefile::{
    Point, Writer,
    dbase::{FieldName, FieldValue, Record, TableWriterBuilder},
};
use uom::si::length::kilometer;

use crate::{FwfError, Result, stations::Resolution, stations::StationMap};

#[derive(Serialize)]
struct ResolutionRecord<'a> {
    wmo: &'a str,
    south_north: usize,
    west_east: usize,
    distance: f64,
    offset_km: f64,
    lat: f64,
    lon: f64,
    grid_lat: f64,
    grid_lon: f64,
}

impl<'a> From<&'a Resolution> for ResolutionRecord<'a> {
    fn from(r: &'a Resolution) -> Self {
        ResolutionRecord {
            wmo: &r.station_id,
            south_north: r.row,
            west_east: r.col,
            distance: r.distance,
            offset_km: r.offset().get::<kilometer>(),
            lat: r.station_lat,
            lon: r.station_lon,
            grid_lat: r.grid_lat,
            grid_lon: r.grid_lon,
        }
    }
}

/// Write one CSV row per resolved station, with a header
pub fn write_csv<W: Write>(stations: &StationMap, output: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(output);
    for resolution in stations {
        writer.serialize(ResolutionRecord::from(resolution))?;
    }
    writer.flush()?;
    Ok(())
}

/// One point feature per station, placed at the station, with the grid cell in its properties
pub fn to_geojson(stations: &StationMap) -> GeoJson {
    let features = stations
        .iter()
        .map(|r| {
            let mut feature = Feature {
                geometry: Some(Geometry::new(Value::Point(vec![r.station_lon, r.station_lat]))),
                id: Some(Id::String(r.station_id.clone())),
                ..Default::default()
            };
            feature.set_property("wmo", r.station_id.clone());
            feature.set_property("south_north", r.row);
            feature.set_property("west_east", r.col);
            feature.set_property("distance", r.distance);
            feature.set_property("offset_km", r.offset().get::<kilometer>());
            feature.set_property("grid_lat", r.grid_lat);
            feature.set_property("grid_lon", r.grid_lon);
            feature
        })
        .collect();
    GeoJson::FeatureCollection(FeatureCollection {
        features,
        ..Default::default()
    })
}

fn field_name(name: &str) -> Result<FieldName> {
    FieldName::try_from(name)
        .map_err(|e| FwfError::UnsupportedFormat(format!("Bad shapefile field name {name}: {e}")))
}

/// Write station points to `path`; e.g. /path/to/foo.shp becomes /path/to/foo{.shp,.shx,.dbf}
pub fn write_shapefile(stations: &StationMap, path: &Path) -> Result<()> {
    const WMO: &str = "wmo";
    const ROW: &str = "row";
    const COL: &str = "col";
    const DISTANCE: &str = "distance";
    const OFFSET_KM: &str = "offset_km";

    let table_builder = TableWriterBuilder::new()
        .add_character_field(field_name(WMO)?, 32)
        .add_numeric_field(field_name(ROW)?, 10, 0)
        .add_numeric_field(field_name(COL)?, 10, 0)
        .add_numeric_field(field_name(DISTANCE)?, 12, 6)
        .add_numeric_field(field_name(OFFSET_KM)?, 12, 3);
    let mut writer = Writer::from_path(path, table_builder)?;
    for r in stations {
        let mut record = Record::default();
        record.insert(WMO.to_string(), FieldValue::Character(Some(r.station_id.clone())));
        record.insert(ROW.to_string(), FieldValue::Numeric(Some(r.row as f64)));
        record.insert(COL.to_string(), FieldValue::Numeric(Some(r.col as f64)));
        record.insert(DISTANCE.to_string(), FieldValue::Numeric(Some(r.distance)));
        record.insert(
            OFFSET_KM.to_string(),
            FieldValue::Numeric(Some(r.offset().get::<kilometer>())),
        );
        writer.write_shape_and_record(&Point::new(r.station_lon, r.station_lat), &record)?;
    }
    Ok(())
}
