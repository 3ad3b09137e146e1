//! On-disk memoisation of flow reads.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use pvf_core::{ErrorInfo, Metadata, PvfError};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::flows::{read_flows, Flows, ReaderKind};

/// Default cache directory, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = "cache";

#[derive(Serialize)]
struct CacheKey<'a> {
    path: String,
    size: u64,
    modified_ns: String,
    reader: ReaderKind,
    extra: &'a Metadata,
}

/// Computes a stable hexadecimal hash for the provided serialisable payload.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, PvfError> {
    let bytes = serde_json::to_vec(value)
        .map_err(|err| PvfError::Serde(ErrorInfo::new("encode-failed", err.to_string())))?;
    Ok(format!("{:x}", Sha256::digest(bytes)))
}

/// Flow reader that stores parsed logs as JSON keyed by file identity.
///
/// The key covers the path, size and modification time of the log together
/// with the reader and the extra metadata, so editing a log invalidates its
/// entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowCache {
    dir: Option<PathBuf>,
}

impl Default for FlowCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DIR)
    }
}

impl FlowCache {
    /// Cache rooted at `dir`, created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Cache that always reads the logs.
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// Directory holding the entries, if caching is enabled.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Entry path for a log.
    pub fn key(
        &self,
        path: &Path,
        reader: ReaderKind,
        extra: &Metadata,
    ) -> Result<String, PvfError> {
        let stat = fs::metadata(path).map_err(|err| PvfError::io("read-failed", path, err))?;
        let modified_ns = stat
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|elapsed| elapsed.as_nanos().to_string())
            .unwrap_or_default();
        stable_hash_string(&CacheKey {
            path: path.display().to_string(),
            size: stat.len(),
            modified_ns,
            reader,
            extra,
        })
    }

    /// Reads flows through the cache.
    pub fn read_flows(
        &self,
        path: &Path,
        reader: ReaderKind,
        extra: &Metadata,
    ) -> Result<Option<Flows>, PvfError> {
        let Some(dir) = &self.dir else {
            return read_flows(path, reader, extra);
        };
        let entry = dir.join(format!("{}.json", self.key(path, reader, extra)?));
        if let Ok(bytes) = fs::read(&entry) {
            match serde_json::from_slice::<Option<Flows>>(&bytes) {
                Ok(flows) => {
                    tracing::debug!(
                        path = %path.display(),
                        entry = %entry.display(),
                        "flow cache hit"
                    );
                    return Ok(flows);
                }
                Err(err) => {
                    tracing::warn!(
                        entry = %entry.display(),
                        error = %err,
                        "discarding unreadable cache entry"
                    );
                }
            }
        }

        let flows = read_flows(path, reader, extra)?;
        if let Err(err) = store(dir, &entry, &flows) {
            tracing::warn!(entry = %entry.display(), error = %err, "could not write cache entry");
        }
        Ok(flows)
    }
}

fn store(dir: &Path, entry: &Path, flows: &Option<Flows>) -> Result<(), PvfError> {
    fs::create_dir_all(dir).map_err(|err| PvfError::io("write-failed", dir, err))?;
    let bytes = serde_json::to_vec(flows).map_err(|err| {
        PvfError::Serde(ErrorInfo::new("encode-failed", err.to_string()).with_path(entry))
    })?;
    fs::write(entry, bytes).map_err(|err| PvfError::io("write-failed", entry, err))
}
