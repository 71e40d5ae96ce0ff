use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::{ForecastResponse, Place, TimeWindow};

const SLOT_DIR: &str = "temps-cli";
const SLOT_FILE: &str = "last-forecast.json";

/// Last-known-good forecast. Staleness is not stored; it is decided at
/// substitution time, so a record never expires by age.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedForecast {
    pub place: Place,
    pub window: TimeWindow,
    pub forecast: ForecastResponse,
    pub fetched_at: String,
}

/// Single-slot fallback store: capacity is exactly one entry, every write is
/// an unconditional overwrite. Constructed once and injected into the report
/// workflow.
#[derive(Debug, Clone)]
pub struct StaleCache {
    path: PathBuf,
}

impl StaleCache {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            path: cache_dir.join(SLOT_DIR).join(SLOT_FILE),
        }
    }

    pub fn get(&self) -> io::Result<Option<CachedForecast>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let payload = fs::read_to_string(&self.path)?;
        // Corrupt payloads count as a miss, not an error.
        Ok(serde_json::from_str::<CachedForecast>(&payload).ok())
    }

    pub fn put(&self, record: &CachedForecast) -> io::Result<()> {
        let payload = serde_json::to_vec(record)
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error.to_string()))?;
        write_atomic(&self.path, &payload)
    }
}

// Rename keeps concurrent report generations at last-write-wins, ordered by
// completion.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "cache path must have a parent directory",
        )
    })?;
    fs::create_dir_all(parent)?;

    let tmp_path = path.with_extension(format!("{}.tmp", std::process::id()));
    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
