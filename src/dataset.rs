//! Layout of the fire weather forecast (FWF) NetCDF output.
//!
//! The model resolves the FWI System and FBP System on two domains at a
//! 55-hour forecast horizon. Each forecast run writes an hourly and a daily
//! file per domain, named `fwf-{product}-{domain}-{YYYYMMDDHH}.nc`.

use std::{fmt::Display, str::FromStr};

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::{FwfError, grid::GridShape};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// 12 km grid
    D02,
    /// 4 km grid
    D03,
}

impl Domain {
    pub const ALL: [Domain; 2] = [Domain::D02, Domain::D03];

    /// Identifier used in file names and as the index cache key
    pub fn id(&self) -> &'static str {
        match self {
            Domain::D02 => "d02",
            Domain::D03 => "d03",
        }
    }

    pub fn resolution_km(&self) -> u32 {
        match self {
            Domain::D02 => 12,
            Domain::D03 => 4,
        }
    }

    /// `(south_north, west_east)` dimensions of the domain
    pub fn shape(&self) -> GridShape {
        match self {
            Domain::D02 => GridShape::new(417, 627),
            Domain::D03 => GridShape::new(840, 642),
        }
    }
}

impl Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Domain {
    type Err = FwfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "d02" => Ok(Domain::D02),
            "d03" => Ok(Domain::D03),
            _ => Err(FwfError::UnknownDomain(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Product {
    Hourly,
    Daily,
}

impl Product {
    pub const ALL: [Product; 2] = [Product::Hourly, Product::Daily];

    pub fn name(&self) -> &'static str {
        match self {
            Product::Hourly => "hourly",
            Product::Daily => "daily",
        }
    }

    /// Length of the `time` dimension
    pub fn time_steps(&self) -> usize {
        match self {
            Product::Hourly => 55,
            Product::Daily => 2,
        }
    }

    pub fn time_description(&self) -> &'static str {
        match self {
            Product::Hourly => "Hourly UTC",
            Product::Daily => "Noon Local for that Day",
        }
    }

    pub fn approximate_size(&self, domain: Domain) -> &'static str {
        match (self, domain) {
            (Product::Hourly, Domain::D02) => "~780M",
            (Product::Hourly, Domain::D03) => "~1.7G",
            (Product::Daily, Domain::D02) => "~16M",
            (Product::Daily, Domain::D03) => "~30M",
        }
    }

    /// Data variables carried by this product, excluding the coordinates
    pub fn variables(&self) -> &'static [Variable] {
        match self {
            Product::Hourly => &HOURLY_VARIABLES,
            Product::Daily => &DAILY_VARIABLES,
        }
    }

    pub fn variable(&self, name: &str) -> Option<&'static Variable> {
        COORDINATE_VARIABLES
            .iter()
            .chain(self.variables())
            .find(|v| v.name == name)
    }
}

impl Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Product {
    type Err = FwfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hourly" => Ok(Product::Hourly),
            "daily" => Ok(Product::Daily),
            _ => Err(FwfError::UnknownProduct(s.to_string())),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Variable {
    pub name: &'static str,
    pub description: &'static str,
    pub units: Option<&'static str>,
}

const fn var(name: &'static str, description: &'static str, units: Option<&'static str>) -> Variable {
    Variable {
        name,
        description,
        units,
    }
}

pub static COORDINATE_VARIABLES: [Variable; 3] = [
    var("Time", "Forecast valid time", None),
    var("XLAT", "Latitude", Some("degrees")),
    var("XLONG", "Longitude", Some("degrees")),
];

pub static HOURLY_VARIABLES: [Variable; 23] = [
    var("F", "Fine Fuel Moisture Code", None),
    var("m_o", "Fine Fuel Moisture Content", None),
    var("R", "Initial Spread Index", None),
    var("S", "Fire Weather Index", None),
    var("DSR", "Daily Severity Rating", None),
    var("FMC", "Foliar Moisture Content", Some("%")),
    var("SFC", "Surface Fuel Consumption", Some("kg m^-2")),
    var("TFC", "Total Fuel Consumption", Some("kg m^-2")),
    var("ROS", "Rate of Spread", Some("m min^-1")),
    var("CFB", "Crown Fraction Burned", Some("%")),
    var("HFI", "Head Fire Intensity", Some("kW m^-1")),
    var("T", "2 meter Temperature", Some("C")),
    var("TD", "2 meter Dew Point Temperature", Some("C")),
    var("H", "2 meter Relative Humidity", Some("%")),
    var("W", "10 meter Wind Speed", Some("km/h")),
    var("WD", "10 meter Wind Direction", Some("deg")),
    var("U10", "U Component of Wind at 10 meter", Some("m/s")),
    var("V10", "V Component of Wind at 10 meter", Some("m/s")),
    var("r_o", "Total Accumulated Precipitation", Some("mm")),
    var("r_o_hourly", "Hourly Accumulated Precipitation", Some("mm")),
    var("SNW", "Total Accumulated Snow", Some("cm")),
    var("SNOWH", "Physical Snow Depth", Some("m")),
    var("SNOWC", "Flag Indicating Snow Cover (1 for Snow Cover)", None),
];

pub static DAILY_VARIABLES: [Variable; 11] = [
    var("P", "Duff Moisture Code", None),
    var("D", "Drought Code", None),
    var("U", "Build Up Index", None),
    var("T", "2 meter Temperature", Some("C")),
    var("TD", "2 meter Dew Point Temperature", Some("C")),
    var("H", "2 meter Relative Humidity", Some("%")),
    var("W", "10 meter Wind Speed", Some("km/h")),
    var("WD", "10 meter Wind Direction", Some("deg")),
    var("r_o", "Total Accumulated Precipitation", Some("mm")),
    var("r_o_tomorrow", "Carry Over Precipitation", Some("mm")),
    var("SNOWC", "Flag Indicating Snow Cover (1 for Snow Cover)", None),
];

/// Initialisation time of a forecast run, written `YYYYMMDDHH`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ForecastDate(NaiveDateTime);

impl ForecastDate {
    pub fn new(datetime: NaiveDateTime) -> Self {
        ForecastDate(datetime)
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }
}

impl FromStr for ForecastDate {
    type Err = FwfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FwfError::InvalidForecastDate(s.to_string());
        if s.len() != 10 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let field = |range: std::ops::Range<usize>| s[range].parse::<u32>().map_err(|_| invalid());
        let year = field(0..4)? as i32;
        let datetime = NaiveDate::from_ymd_opt(year, field(4..6)?, field(6..8)?)
            .and_then(|date| date.and_hms_opt(field(8..10).ok()?, 0, 0))
            .ok_or_else(invalid)?;
        Ok(ForecastDate(datetime))
    }
}

impl Display for ForecastDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}{:02}{:02}{:02}",
            self.0.year(),
            self.0.month(),
            self.0.day(),
            self.0.hour()
        )
    }
}

/// File name of one dataset, e.g. `fwf-hourly-d02-2021051006.nc`
pub fn dataset_file_name(product: Product, domain: Domain, date: ForecastDate) -> String {
    format!("fwf-{product}-{domain}-{date}.nc")
}

/// Human-readable summary of one product on one domain
pub struct DatasetDescription {
    pub product: Product,
    pub domain: Domain,
}

impl Display for DatasetDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let DatasetDescription { product, domain } = self;
        let shape = domain.shape();
        writeln!(f, "Dataset:         fwf-{product}-{domain}-YYYYMMDDHH.nc")?;
        writeln!(f, "Domain:          {domain} ({} km)", domain.resolution_km())?;
        writeln!(f, "File Size:       {}", product.approximate_size(*domain))?;
        writeln!(
            f,
            "Dimensions:      (time: {}, south_north: {}, west_east: {})",
            product.time_steps(),
            shape.rows,
            shape.cols
        )?;
        writeln!(f, "Time:            {}", product.time_description())?;
        write!(f, "Variables:")?;
        for variable in COORDINATE_VARIABLES.iter().chain(product.variables()) {
            write!(f, "\n  {: <13}{}", variable.name, variable.description)?;
            if let Some(units) = variable.units {
                write!(f, " [{units}]")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_date_round_trip() {
        let date: ForecastDate = "2021051006".parse().unwrap();
        assert_eq!(
            date.datetime(),
            NaiveDate::from_ymd_opt(2021, 5, 10)
                .unwrap()
                .and_hms_opt(6, 0, 0)
                .unwrap()
        );
        assert_eq!(date.to_string(), "2021051006");
    }

    #[test]
    fn forecast_date_rejects_garbage() {
        for bad in ["", "202105100", "20210510066", "2021-05-10", "2021133106", "2021051025"] {
            assert!(
                matches!(bad.parse::<ForecastDate>(), Err(FwfError::InvalidForecastDate(_))),
                "{bad} should not parse"
            );
        }
    }

    #[test]
    fn file_names() {
        let date: ForecastDate = "2021051006".parse().unwrap();
        assert_eq!(
            dataset_file_name(Product::Hourly, Domain::D02, date),
            "fwf-hourly-d02-2021051006.nc"
        );
        assert_eq!(
            dataset_file_name(Product::Daily, Domain::D03, date),
            "fwf-daily-d03-2021051006.nc"
        );
    }

    #[test]
    fn domains_and_products_parse() {
        assert_eq!("d02".parse::<Domain>().unwrap(), Domain::D02);
        assert_eq!("D03".parse::<Domain>().unwrap(), Domain::D03);
        assert!(matches!("d01".parse::<Domain>(), Err(FwfError::UnknownDomain(_))));
        assert_eq!("daily".parse::<Product>().unwrap(), Product::Daily);
        assert!(matches!("weekly".parse::<Product>(), Err(FwfError::UnknownProduct(_))));
    }

    #[test]
    fn variable_tables() {
        assert_eq!(Product::Hourly.variable("HFI").unwrap().units, Some("kW m^-1"));
        assert_eq!(Product::Daily.variable("r_o_tomorrow").unwrap().units, Some("mm"));
        assert!(Product::Daily.variable("HFI").is_none());
        assert!(Product::Daily.variable("XLAT").is_some());
        assert_eq!(Domain::D03.shape(), GridShape::new(840, 642));
    }

    #[test]
    fn description_lists_every_variable() {
        let text = DatasetDescription {
            product: Product::Daily,
            domain: Domain::D02,
        }
        .to_string();
        assert!(text.contains("(time: 2, south_north: 417, west_east: 627)"));
        for variable in DAILY_VARIABLES.iter() {
            assert!(text.contains(variable.description));
        }
    }
}
