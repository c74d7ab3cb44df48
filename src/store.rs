//! Per-session record files under `<root>/debug/<session>/<key>.data`.

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::{MicroKey, ProfileRecord, ProfilerError, ProfilerResult};

const RECORD_EXT: &str = "data";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcReport {
    pub scanned: usize,
    pub removed: usize,
}

#[derive(Debug, Clone)]
pub struct LogStore {
    root: PathBuf,
}

impl LogStore {
    /// `logdata_path` is the configured root; records live under its `debug/`.
    pub fn new(logdata_path: &Path) -> Self {
        Self {
            root: logdata_path.join("debug"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session_dir(&self, session_id: &str) -> ProfilerResult<PathBuf> {
        validate_session_id(session_id)?;
        Ok(self.root.join(session_id))
    }

    pub fn record_path(&self, session_id: &str, key: &MicroKey) -> ProfilerResult<PathBuf> {
        Ok(self
            .session_dir(session_id)?
            .join(format!("{key}.{RECORD_EXT}")))
    }

    /// Writes one record. An existing file with the same key is replaced.
    pub fn save(&self, session_id: &str, record: &ProfileRecord) -> ProfilerResult<PathBuf> {
        let dir = self.session_dir(session_id)?;
        std::fs::create_dir_all(&dir).map_err(|e| ProfilerError::io(&dir, e))?;
        let path = self.record_path(session_id, &record.microtime)?;
        let bytes = record.encode()?;
        std::fs::write(&path, bytes).map_err(|e| ProfilerError::io(&path, e))?;
        tracing::debug!("saved profile record {}", path.display());
        Ok(path)
    }

    /// Keys of stored records for a session, oldest first.
    pub fn keys(&self, session_id: &str) -> ProfilerResult<Vec<MicroKey>> {
        Ok(self.list(session_id)?.into_keys().collect())
    }

    /// The newest `limit` records (all when `limit` is 0), oldest first.
    ///
    /// Unreadable or undecodable files are logged and skipped.
    pub fn history(&self, session_id: &str, limit: usize) -> ProfilerResult<Vec<ProfileRecord>> {
        let files = self.list(session_id)?;
        let skip = if limit == 0 {
            0
        } else {
            files.len().saturating_sub(limit)
        };

        let mut out = Vec::with_capacity(files.len() - skip);
        for (key, path) in files.into_iter().skip(skip) {
            let loaded = std::fs::read(&path)
                .map_err(|e| ProfilerError::io(&path, e))
                .and_then(|bytes| ProfileRecord::decode(&bytes));
            match loaded {
                Ok(record) => out.push(record),
                Err(err) => {
                    tracing::warn!("skipping profile record {key}: {err}");
                }
            }
        }
        Ok(out)
    }

    fn list(&self, session_id: &str) -> ProfilerResult<BTreeMap<MicroKey, PathBuf>> {
        let dir = self.session_dir(session_id)?;
        let mut files = BTreeMap::new();
        if !dir.is_dir() {
            return Ok(files);
        }
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("failed to list {}: {err}", dir.display());
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            let Some(key) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(MicroKey::parse)
            else {
                continue;
            };
            files.insert(key, path.to_path_buf());
        }
        Ok(files)
    }

    /// Removes session directories last modified before `now - expiration`.
    ///
    /// Removal failures are logged at debug level and otherwise ignored.
    pub fn gc(&self, expiration: Duration, now: SystemTime) -> GcReport {
        let mut report = GcReport::default();
        if !self.root.is_dir() {
            return report;
        }
        let Some(cutoff) = now.checked_sub(expiration) else {
            return report;
        };

        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_dir() {
                continue;
            }
            report.scanned += 1;
            let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
            if !is_expired(modified, cutoff) {
                continue;
            }
            match std::fs::remove_dir_all(entry.path()) {
                Ok(()) => {
                    report.removed += 1;
                    tracing::debug!("removed expired session dir {}", entry.path().display());
                }
                Err(err) => {
                    tracing::debug!("failed to remove {}: {err}", entry.path().display());
                }
            }
        }
        report
    }
}

fn is_expired(modified: Option<SystemTime>, cutoff: SystemTime) -> bool {
    modified.is_some_and(|m| m < cutoff)
}

fn validate_session_id(session_id: &str) -> ProfilerResult<()> {
    let bad = session_id.is_empty()
        || session_id == "."
        || session_id == ".."
        || session_id.contains(['/', '\\', '\0']);
    if bad {
        return Err(ProfilerError::InvalidArgument(format!(
            "invalid session id {session_id:?}"
        )));
    }
    Ok(())
}
