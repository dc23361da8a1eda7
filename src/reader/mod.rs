//! Dataset loading layer
//!
//! Two inputs feed the dashboard: a gzip-compressed, tab-separated
//! housing-market tracker and a GeoJSON state-boundary file. Both are
//! loaded once per process and memoized by canonical path; repeated calls
//! return the cached `Arc` without touching disk. The cache is only
//! invalidated by a process restart.
//!
//! Loading is all-or-nothing: a missing path or malformed content fails
//! with a fatal [`ReaderError`](crate::HousemapError::ReaderError) and
//! nothing is cached.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};

use polars::prelude::DataFrame;
use tracing::info;

use crate::{HousemapError, Result};

mod boundaries;
mod market;

pub use boundaries::{BoundaryCollection, BoundaryFeature, BoundaryProperties};

/// Read-through cache keyed by canonical file path.
///
/// Lock discipline is trivial: entries are inserted once and never
/// mutated, mirroring the read-only lifecycle of the loaded tables.
struct PathCache<T> {
    inner: RwLock<HashMap<PathBuf, Arc<T>>>,
}

impl<T> PathCache<T> {
    fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    fn get_or_load<F>(&self, path: &Path, load: F) -> Result<Arc<T>>
    where
        F: FnOnce(&Path) -> Result<T>,
    {
        let key = path.canonicalize().map_err(|e| {
            HousemapError::ReaderError(format!("Failed to open {}: {}", path.display(), e))
        })?;

        {
            let cache = self
                .inner
                .read()
                .map_err(|e| HousemapError::InternalError(format!("Cache lock poisoned: {}", e)))?;
            if let Some(cached) = cache.get(&key) {
                return Ok(Arc::clone(cached));
            }
        }

        let loaded = Arc::new(load(&key)?);
        info!("Loaded {} into the dataset cache", key.display());

        let mut cache = self
            .inner
            .write()
            .map_err(|e| HousemapError::InternalError(format!("Cache lock poisoned: {}", e)))?;
        // A concurrent load of the same path may have won the race; keep
        // the first entry so callers share one copy.
        let entry = cache.entry(key).or_insert(loaded);
        Ok(Arc::clone(entry))
    }
}

fn market_cache() -> &'static PathCache<DataFrame> {
    static CACHE: OnceLock<PathCache<DataFrame>> = OnceLock::new();
    CACHE.get_or_init(PathCache::new)
}

fn boundary_cache() -> &'static PathCache<BoundaryCollection> {
    static CACHE: OnceLock<PathCache<BoundaryCollection>> = OnceLock::new();
    CACHE.get_or_init(PathCache::new)
}

/// Read the housing-market tracker (gzip TSV) at `path`, memoized by path.
///
/// All columns come back as strings; numeric casting is the pipeline's
/// responsibility so that a malformed number fails loudly at cast time.
pub fn read_market<P: AsRef<Path>>(path: P) -> Result<Arc<DataFrame>> {
    market_cache().get_or_load(path.as_ref(), market::load)
}

/// Read the state-boundary GeoJSON at `path`, memoized by path.
pub fn read_boundaries<P: AsRef<Path>>(path: P) -> Result<Arc<BoundaryCollection>> {
    boundary_cache().get_or_load(path.as_ref(), boundaries::load)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_market_file_is_fatal() {
        let err = read_market("/nonexistent/state_market_tracker.tsv000.gz").unwrap_err();
        assert!(matches!(err, HousemapError::ReaderError(_)));
    }

    #[test]
    fn missing_boundary_file_is_fatal() {
        let err = read_boundaries("/nonexistent/us-state-boundaries.geojson").unwrap_err();
        assert!(matches!(err, HousemapError::ReaderError(_)));
    }

    #[test]
    fn market_load_is_memoized_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.tsv000.gz");
        std::fs::write(&path, test_fixtures::gzip(test_fixtures::MARKET_TSV)).unwrap();

        let first = read_market(&path).unwrap();
        // Corrupt the file on disk; the cached table must still be served.
        std::fs::write(&path, b"not gzip at all").unwrap();
        let second = read_market(&path).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.height(), 5);
    }

    #[test]
    fn boundary_load_is_memoized_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boundaries.geojson");
        std::fs::write(&path, test_fixtures::BOUNDARIES_GEOJSON).unwrap();

        let first = read_boundaries(&path).unwrap();
        let second = read_boundaries(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.features.len(), 3);
    }

    #[test]
    fn failed_load_caches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.tsv000.gz");
        std::fs::write(&path, b"garbage").unwrap();
        assert!(read_market(&path).is_err());

        // Replacing the file with valid content must succeed: the failure
        // above left no poisoned cache entry behind.
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&test_fixtures::gzip(test_fixtures::MARKET_TSV))
            .unwrap();
        drop(file);
        assert!(read_market(&path).is_ok());
    }
}
