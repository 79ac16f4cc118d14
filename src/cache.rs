//! Key-value persistence for built spatial indexes.
//!
//! A store only moves opaque bytes around; encoding lives with
//! [`SpatialIndex`](crate::SpatialIndex). Keys are domain identifiers such as
//! `d02`.

use std::{
    cell::RefCell,
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{FwfError, Result};

pub trait CacheStore {
    /// Fetch the bytes stored under `key`, or [`FwfError::CacheMiss`] if there are none
    fn load(&self, key: &str) -> Result<Vec<u8>>;

    fn save(&self, key: &str, bytes: &[u8]) -> Result<()>;
}

/// Stores one file per key in a directory, created on first save
#[derive(Debug, Clone)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the cache file for `key`, e.g. `<dir>/fwf_d02_tree.bin`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("fwf_{key}_tree.bin"))
    }
}

impl CacheStore for DirStore {
    fn load(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => {
                debug!(path = %path.display(), bytes = bytes.len(), "read cached index");
                Ok(bytes)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(FwfError::CacheMiss(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        // the cache file is either absent or complete
        let tmp = path.with_extension("bin.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), bytes = bytes.len(), "wrote cached index");
        Ok(())
    }
}

/// In-process store, mostly useful for tests and one-off runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }
}

impl CacheStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Vec<u8>> {
        self.entries
            .borrow()
            .get(key)
            .cloned()
            .ok_or_else(|| FwfError::CacheMiss(key.to_string()))
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_store_missing_key_is_cache_miss() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirStore::new(tmp.path().join("kdtree"));
        assert!(matches!(store.load("d02"), Err(FwfError::CacheMiss(k)) if k == "d02"));
    }

    #[test]
    fn dir_store_creates_directory_on_save() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("kdtree");
        let store = DirStore::new(&dir);
        assert!(!dir.exists());
        store.save("d03", b"payload").unwrap();
        assert!(store.path_for("d03").is_file());
        assert_eq!(store.load("d03").unwrap(), b"payload");
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.load("d02").unwrap_err().is_cache_miss());
        store.save("d02", &[1, 2, 3]).unwrap();
        assert!(store.contains("d02"));
        assert_eq!(store.load("d02").unwrap(), vec![1, 2, 3]);
    }
}
