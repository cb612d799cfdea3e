//! Cached call repository.
//!
//! The store owns the in-memory call collection and its derived SQLite tag
//! index. Both are loaded lazily and survive for the lifetime of the store;
//! `reload()` is the only way to pick up new data.

use super::{load_csv_file, load_json_dir, CallRecord};
use crate::error::{Result, RingeError};
use crate::index::TagIndex;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument};

/// Where call data lives on disk.
#[derive(Debug, Clone)]
pub enum CallSource {
    /// Directory of per-call JSON files.
    JsonDir(PathBuf),
    /// Single CSV export.
    CsvFile(PathBuf),
}

impl CallSource {
    /// Human-readable description for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            CallSource::JsonDir(dir) => format!("JSON files in {}", dir.display()),
            CallSource::CsvFile(path) => format!("CSV file {}", path.display()),
        }
    }
}

/// Repository for the call collection.
pub struct CallStore {
    source: CallSource,
    cache: Mutex<Option<Arc<Vec<CallRecord>>>>,
    index: Mutex<Option<Arc<TagIndex>>>,
}

impl CallStore {
    /// Create a store over the given source. Nothing is read until the
    /// first `load_all()`.
    pub fn new(source: CallSource) -> Self {
        Self {
            source,
            cache: Mutex::new(None),
            index: Mutex::new(None),
        }
    }

    /// The configured source.
    pub fn source(&self) -> &CallSource {
        &self.source
    }

    /// Load the full call collection, reading storage at most once.
    ///
    /// Subsequent calls return the cached collection; use `reload()` to
    /// pick up new files.
    pub fn load_all(&self) -> Result<Arc<Vec<CallRecord>>> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|e| RingeError::CallData(format!("Failed to acquire lock: {}", e)))?;

        if let Some(calls) = cache.as_ref() {
            return Ok(calls.clone());
        }

        let calls = Arc::new(self.read_source()?);
        *cache = Some(calls.clone());
        Ok(calls)
    }

    /// Drop the cache and the derived index, then load fresh data.
    /// Returns the new record count.
    #[instrument(skip(self))]
    pub fn reload(&self) -> Result<usize> {
        {
            let mut cache = self
                .cache
                .lock()
                .map_err(|e| RingeError::CallData(format!("Failed to acquire lock: {}", e)))?;
            *cache = None;
        }
        {
            let mut index = self
                .index
                .lock()
                .map_err(|e| RingeError::CallData(format!("Failed to acquire lock: {}", e)))?;
            *index = None;
        }

        let calls = self.load_all()?;
        info!("Reloaded {} calls", calls.len());
        Ok(calls.len())
    }

    /// The SQLite tag index, built from the collection on first access.
    ///
    /// The index is a derived, disposable cache; `reload()` discards it.
    pub fn tag_index(&self) -> Result<Arc<TagIndex>> {
        let mut index = self
            .index
            .lock()
            .map_err(|e| RingeError::CallData(format!("Failed to acquire lock: {}", e)))?;

        if let Some(idx) = index.as_ref() {
            return Ok(idx.clone());
        }

        let calls = self.load_all()?;
        let built = Arc::new(TagIndex::build(&calls)?);
        *index = Some(built.clone());
        Ok(built)
    }

    fn read_source(&self) -> Result<Vec<CallRecord>> {
        match &self.source {
            CallSource::JsonDir(dir) => load_json_dir(dir),
            CallSource::CsvFile(path) => load_csv_file(path),
        }
    }
}
