//! Nearest-neighbour index over the cells of a model domain.
//!
//! The grid is flattened in row-major order and every `(lat, lon)` pair goes
//! into a k-d tree together with its flat index. Distances are planar in
//! degree space, the same metric the threshold in [`crate::stations`] is
//! expressed in.

use std::{
    fs,
    io::{self, Read, Write},
    path::Path,
};

use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use kd_tree::KdMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    FwfError, Result,
    cache::CacheStore,
    grid::{GridPoint, GridShape, LatLonGrid},
};

const CACHE_MAGIC: [u8; 4] = *b"FWFK";
const CACHE_VERSION: u16 = 1;

pub struct SpatialIndex {
    key: String,
    shape: GridShape,
    points: Vec<GridPoint>,
    tree: KdMap<[f64; 2], usize>,
}

/// What actually goes to disk; the tree is re-partitioned from `points` on load
#[derive(Serialize, Deserialize)]
struct CachedIndex {
    magic: [u8; 4],
    version: u16,
    key: String,
    shape: GridShape,
    points: Vec<GridPoint>,
}

impl SpatialIndex {
    /// Build an index over a validated lat/lon grid
    ///
    /// `key` names the index in a cache store, normally the domain id (`d02`, `d03`).
    pub fn build(key: &str, grid: &LatLonGrid) -> Result<SpatialIndex> {
        let shape = grid.shape();
        let points = grid.flatten();
        let skipped = points
            .iter()
            .filter(|p| !(p.lat.is_finite() && p.lon.is_finite()))
            .count();
        if skipped > 0 {
            warn!(key, skipped, "grid contains non-finite coordinates; those cells are not indexed");
        }
        let index = SpatialIndex::from_points(key, shape, points)?;
        info!(key, %shape, points = index.len(), "built spatial index");
        Ok(index)
    }

    /// Shorthand for [`LatLonGrid::new`] followed by [`SpatialIndex::build`]
    pub fn build_from_arrays(
        key: &str,
        lat: ndarray::Array2<f64>,
        lon: ndarray::Array2<f64>,
    ) -> Result<SpatialIndex> {
        SpatialIndex::build(key, &LatLonGrid::new(lat, lon)?)
    }

    fn from_points(key: &str, shape: GridShape, points: Vec<GridPoint>) -> Result<SpatialIndex> {
        if shape.is_empty() {
            return Err(FwfError::EmptyGrid);
        }
        if shape.checked_len() != Some(points.len()) {
            return Err(FwfError::IncompleteGrid(format!(
                "{} points for a grid of shape {shape}",
                points.len()
            )));
        }
        let entries: Vec<([f64; 2], usize)> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.lat.is_finite() && p.lon.is_finite())
            .map(|(flat, p)| (p.as_key(), flat))
            .collect();
        let tree = KdMap::build_by_ordered_float(entries);
        Ok(SpatialIndex {
            key: key.to_string(),
            shape,
            points,
            tree,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Number of grid cells covered, including any that were left out of the tree
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Coordinates of the cell at `flat`, if it exists
    pub fn point(&self, flat: usize) -> Option<GridPoint> {
        self.points.get(flat).copied()
    }

    /// The single nearest indexed cell to `(lat, lon)` as `(distance, flat index)`
    ///
    /// Distance is Euclidean in degrees. Returns `None` only when no cell was indexed.
    pub fn nearest(&self, lat: f64, lon: f64) -> Option<(f64, usize)> {
        self.tree
            .nearest(&[lat, lon])
            .map(|found| (found.squared_distance.sqrt(), found.item.1))
    }

    /// Serialize the index into the gzip-compressed cache format
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let cached = CachedIndex {
            magic: CACHE_MAGIC,
            version: CACHE_VERSION,
            key: self.key.clone(),
            shape: self.shape,
            points: self.points.clone(),
        };
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        bincode::serialize_into(&mut encoder, &cached)?;
        Ok(encoder.finish()?)
    }

    /// Restore an index written by [`SpatialIndex::to_bytes`]
    ///
    /// Anything that doesn't decode to an index for `key` is reported as
    /// [`FwfError::CorruptCache`].
    pub fn from_bytes(key: &str, bytes: &[u8]) -> Result<SpatialIndex> {
        let corrupt = |reason: String| FwfError::CorruptCache {
            key: key.to_string(),
            reason,
        };
        let mut decompressed = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut decompressed)
            .map_err(|e| corrupt(format!("decompression failed: {e}")))?;
        let cached: CachedIndex = bincode::deserialize(&decompressed)
            .map_err(|e| corrupt(format!("decoding failed: {e}")))?;
        if cached.magic != CACHE_MAGIC {
            return Err(corrupt("not an index cache".to_string()));
        }
        if cached.version != CACHE_VERSION {
            return Err(corrupt(format!(
                "cache version {} but this build reads version {CACHE_VERSION}",
                cached.version
            )));
        }
        if cached.key != key {
            return Err(corrupt(format!("cache holds the index for '{}'", cached.key)));
        }
        SpatialIndex::from_points(key, cached.shape, cached.points)
            .map_err(|e| corrupt(e.to_string()))
    }

    /// Write the index to a single file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        file.write_all(&self.to_bytes()?)?;
        Ok(())
    }

    /// Read an index written by [`SpatialIndex::save`]
    ///
    /// A missing file is [`FwfError::CacheMiss`].
    pub fn load(key: &str, path: &Path) -> Result<SpatialIndex> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FwfError::CacheMiss(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        SpatialIndex::from_bytes(key, &bytes)
    }

    pub fn save_to(&self, store: &impl CacheStore) -> Result<()> {
        store.save(&self.key, &self.to_bytes()?)?;
        info!(key = %self.key, "saved spatial index");
        Ok(())
    }

    pub fn load_from(store: &impl CacheStore, key: &str) -> Result<SpatialIndex> {
        let index = SpatialIndex::from_bytes(key, &store.load(key)?)?;
        info!(key, shape = %index.shape, "loaded cached spatial index");
        Ok(index)
    }

    /// Load the cached index for `key`, building and saving it on a cache miss
    ///
    /// `grid` is only called when the cache is empty. Every error other than a
    /// miss (including a corrupt cache) is returned as-is.
    pub fn load_or_build<F>(store: &impl CacheStore, key: &str, grid: F) -> Result<SpatialIndex>
    where
        F: FnOnce() -> Result<LatLonGrid>,
    {
        match SpatialIndex::load_from(store, key) {
            Ok(index) => Ok(index),
            Err(FwfError::CacheMiss(_)) => {
                info!(key, "no cached spatial index, building");
                let index = SpatialIndex::build(key, &grid()?)?;
                index.save_to(store)?;
                Ok(index)
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("key", &self.key)
            .field("shape", &self.shape)
            .field("points", &self.points.len())
            .finish()
    }
}
