//! Nearest grid-cell lookup for the fire weather forecast (FWF) model output.
//!
//! The FWF datasets live on curvilinear grids described by 2D `XLAT`/`XLONG`
//! arrays, so a station's cell can't be computed directly from its
//! coordinates. Instead every grid point goes into a k-d tree once per domain,
//! the tree is cached on disk, and stations are matched to their nearest
//! point. Matches farther than [`DISTANCE_THRESHOLD`] degrees are outside the
//! domain and dropped.
//!
//! ```no_run
//! use fwf_locate::{Paths, SpatialIndex, resolve_all, source, stations::read_roster_path};
//!
//! # fn main() -> fwf_locate::Result<()> {
//! let paths = Paths::new("data", None);
//! let index = SpatialIndex::load_or_build(&paths.index_store(), "d02", || {
//!     source::load_grid(&paths.fwf_dir().join("fwf-hourly-d02-2021051006.nc"))
//! })?;
//! let stations = read_roster_path(&paths.roster_path())?;
//! for resolution in &resolve_all(&index, &stations, index.shape()) {
//!     println!("{resolution}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod dataset;
mod error;
pub mod export;
pub mod geomath;
pub mod grid;
mod index;
pub mod source;
pub mod stations;
mod utils;

pub use cache::{CacheStore, DirStore, MemoryStore};
pub use config::Paths;
pub use dataset::{Domain, ForecastDate, Product};
pub use error::{FwfError, Result};
pub use grid::{GridPoint, GridShape, LatLonGrid, ravel_index, unravel_index};
pub use index::SpatialIndex;
pub use stations::{
    DISTANCE_THRESHOLD, Resolution, StationMap, StationQuery, resolve, resolve_all,
};
