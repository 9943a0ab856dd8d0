//! On-disk node cache.
//!
//! The cache is a single JSON file holding the last node search. Its
//! modification time decides freshness: the snapshot is reused while
//! `mtime + max_age` lies in the future.
//!
//! Writes go to a temporary file in the cache directory which is then renamed
//! over the target, so a concurrent reader sees either the old or the new
//! snapshot. Concurrent writers are not serialized; the last rename wins.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::node::CacheDocument;
use crate::error::{Error, Result};

/// Fixed file name of the cache inside the configured cache directory
pub const CACHE_FILE_NAME: &str = "ansible-chef.cache";

/// Default freshness threshold
pub const DEFAULT_CACHE_MAX_AGE: Duration = Duration::from_secs(3600);

/// Reads, writes and ages the node cache file.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
    max_age: Duration,
}

impl CacheStore {
    /// Create a store for the cache file at `path`
    pub fn new(path: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            path: path.into(),
            max_age,
        }
    }

    /// Create a store for the fixed cache file inside `dir`
    pub fn in_directory(dir: impl AsRef<Path>, max_age: Duration) -> Self {
        Self::new(dir.as_ref().join(CACHE_FILE_NAME), max_age)
    }

    /// Path of the cache file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Freshness threshold
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Modification time of the cache file, if it exists
    fn modified(&self) -> Option<SystemTime> {
        let metadata = fs::metadata(&self.path).ok()?;
        if !metadata.is_file() {
            return None;
        }
        metadata.modified().ok()
    }

    /// Age of the cache file at `now` (zero if modified in the future)
    pub fn age(&self, now: SystemTime) -> Option<Duration> {
        self.modified()
            .map(|mtime| now.duration_since(mtime).unwrap_or(Duration::ZERO))
    }

    /// Check whether the cache exists and `mtime + max_age > now`
    pub fn is_valid(&self, now: SystemTime) -> bool {
        let Some(mtime) = self.modified() else {
            debug!(path = %self.path.display(), "cache file not found");
            return false;
        };

        let valid = match mtime.checked_add(self.max_age) {
            Some(expires_at) => expires_at > now,
            // Overflow means an effectively infinite max age
            None => true,
        };

        debug!(
            path = %self.path.display(),
            age_secs = self.age(now).map(|a| a.as_secs()),
            max_age_secs = self.max_age.as_secs(),
            valid,
            "checked cache freshness"
        );
        valid
    }

    /// Read the cached snapshot
    pub fn read(&self) -> Result<CacheDocument> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| Error::cache_unreadable(&self.path, e.to_string()))?;

        let doc: CacheDocument = serde_json::from_str(&content)
            .map_err(|e| Error::cache_unreadable(&self.path, format!("malformed JSON: {}", e)))?;

        debug!(path = %self.path.display(), nodes = doc.len(), "read cache");
        Ok(doc)
    }

    /// Replace the cached snapshot
    pub fn write(&self, doc: &CacheDocument) -> Result<()> {
        let write_err = |source| Error::CacheWrite {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(write_err)?;

        let json = serde_json::to_string_pretty(doc)
            .map_err(|e| write_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.flush().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        info!(path = %self.path.display(), nodes = doc.len(), "wrote cache");
        Ok(())
    }
}
