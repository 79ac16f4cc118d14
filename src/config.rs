use std::path::{Path, PathBuf};

use crate::{
    cache::DirStore,
    dataset::{Domain, ForecastDate, Product, dataset_file_name},
};

/// Default data directory when neither a flag nor `FWF_DATA_DIR` is given
pub const DEFAULT_DATA_DIR: &str = "data";

/// File name of the weather station roster inside the data directory
pub const ROSTER_FILE_NAME: &str = "nrcan-wxstations.csv";

/// Where datasets, rosters and cached indexes live
///
/// ```text
/// <data_dir>/
///   nrcan-wxstations.csv
///   kdtree/fwf_d02_tree.bin
/// <fwf_dir>/                      (defaults to <data_dir>/fwf)
///   fwf-hourly-d02-2021051006.nc
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    data_dir: PathBuf,
    fwf_dir: PathBuf,
}

impl Paths {
    pub fn new(data_dir: impl Into<PathBuf>, fwf_dir: Option<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let fwf_dir = fwf_dir.unwrap_or_else(|| data_dir.join("fwf"));
        Paths { data_dir, fwf_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn fwf_dir(&self) -> &Path {
        &self.fwf_dir
    }

    pub fn kdtree_dir(&self) -> PathBuf {
        self.data_dir.join("kdtree")
    }

    /// Cache store for built indexes, one file per domain under [`Paths::kdtree_dir`]
    pub fn index_store(&self) -> DirStore {
        DirStore::new(self.kdtree_dir())
    }

    pub fn roster_path(&self) -> PathBuf {
        self.data_dir.join(ROSTER_FILE_NAME)
    }

    pub fn dataset_path(&self, product: Product, domain: Domain, date: ForecastDate) -> PathBuf {
        self.fwf_dir.join(dataset_file_name(product, domain, date))
    }
}

impl Default for Paths {
    fn default() -> Self {
        Paths::new(DEFAULT_DATA_DIR, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout() {
        let paths = Paths::new("/srv/fwf-data", None);
        assert_eq!(paths.fwf_dir(), Path::new("/srv/fwf-data/fwf"));
        assert_eq!(paths.kdtree_dir(), PathBuf::from("/srv/fwf-data/kdtree"));
        assert_eq!(
            paths.index_store().path_for("d03"),
            PathBuf::from("/srv/fwf-data/kdtree/fwf_d03_tree.bin")
        );
        assert_eq!(
            paths.roster_path(),
            PathBuf::from("/srv/fwf-data/nrcan-wxstations.csv")
        );
        let date = "2021051006".parse().unwrap();
        assert_eq!(
            paths.dataset_path(Product::Hourly, Domain::D02, date),
            PathBuf::from("/srv/fwf-data/fwf/fwf-hourly-d02-2021051006.nc")
        );
    }

    #[test]
    fn separate_forecast_dir() {
        let paths = Paths::new("data", Some(PathBuf::from("/mnt/fwf")));
        assert_eq!(paths.fwf_dir(), Path::new("/mnt/fwf"));
        assert_eq!(paths.kdtree_dir(), PathBuf::from("data/kdtree"));
    }
}
