//! On-disk cache for the downloaded IOC list.
//!
//! # Cache Location
//!
//! - Linux: `~/.cache/hulud-scan/consolidated_iocs.csv`
//! - macOS: `~/Library/Caches/hulud-scan/consolidated_iocs.csv`
//! - Windows: `%LOCALAPPDATA%\hulud-scan\consolidated_iocs.csv`
//!
//! # Example
//!
//! ```no_run
//! use hulud_scan::cache::IocCache;
//!
//! let cache = IocCache::new();
//! if cache.is_stale() {
//!     println!("IOC list at {} needs a refresh", cache.path().display());
//! }
//! ```

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Default cache TTL in hours.
const CACHE_TTL_HOURS: u64 = 24;

const CACHE_FILENAME: &str = "consolidated_iocs.csv";

/// Platform cache directory for this tool.
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hulud-scan")
}

/// Location and freshness of the cached IOC CSV.
pub struct IocCache {
    dir: PathBuf,
    ttl: Duration,
}

impl IocCache {
    /// Creates a cache in the platform directory with the default 24-hour TTL.
    pub fn new() -> Self {
        Self::with_ttl_hours(CACHE_TTL_HOURS)
    }

    pub fn with_ttl_hours(hours: u64) -> Self {
        Self {
            dir: cache_dir(),
            ttl: Duration::from_secs(hours * 3600),
        }
    }

    /// Creates a cache rooted at `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CACHE_FILENAME)
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    /// Age of the cached file, if present.
    pub fn age(&self) -> Option<Duration> {
        let modified = fs::metadata(self.path()).ok()?.modified().ok()?;
        SystemTime::now().duration_since(modified).ok()
    }

    /// True if the file is missing or older than the TTL.
    pub fn is_stale(&self) -> bool {
        match self.age() {
            Some(age) => age > self.ttl,
            None => true,
        }
    }

    /// Writes `bytes` to the cache file, creating the directory if needed.
    pub fn store(&self, bytes: &[u8]) -> Result<PathBuf> {
        ensure_dir(&self.dir)?;
        let path = self.path();
        fs::write(&path, bytes)
            .with_context(|| format!("Failed to write IOC cache {}", path.display()))?;
        Ok(path)
    }

    /// Removes the cached file if present.
    pub fn clear(&self) -> Result<()> {
        let path = self.path();
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}

impl Default for IocCache {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
    }
    Ok(())
}
