//! Loading and saving the build cache.
//!
//! A cache is persisted as two files sharing a directory and base name: the
//! cache itself (`<name>.<ext>`, see [`format`](crate::format)) and the
//! generated-code ledger (`<name>.CreatedCode.<ext>`). Loading never fails:
//! a missing cache is a cold start, and a corrupt or incompatible one is
//! deleted and replaced by an empty cache. Saving never fails either; a
//! failed save leaves the previous file in place and the in-memory cache
//! usable.

use std::path::Path;
use std::sync::Arc;

use forge_common::BuildId;
use tracing::{debug, warn};

use crate::cache::BuildCache;
use crate::error::CacheError;
use crate::format;
use crate::ledger::{ledger_path_for, CreatedCodeLedger};
use crate::probe::ContentProbe;

/// How many times a bad cache file is deleted and re-read before giving up.
pub const DEFAULT_RECOVERY_ATTEMPTS: u32 = 2;

/// How a cache came out of [`BuildCache::load_with_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// No cache file existed.
    ColdStart,
    /// The cache file was decoded successfully.
    Loaded,
    /// The cache file was unusable and has been discarded.
    Recovered(RecoveryReason),
}

/// Why a cache file was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryReason {
    /// Well-formed, but written by another format or tool version.
    Incompatible,
    /// Truncated, garbage, or failing its checksum.
    Corrupt,
}

impl BuildCache {
    /// Loads the cache at `path` for the build `build_id`.
    ///
    /// Equivalent to [`load_with_status`](Self::load_with_status) with
    /// [`DEFAULT_RECOVERY_ATTEMPTS`], discarding the status.
    pub fn load(path: &Path, build_id: BuildId, probe: Arc<dyn ContentProbe>) -> Self {
        Self::load_with_status(path, build_id, probe, DEFAULT_RECOVERY_ATTEMPTS).0
    }

    /// Loads the cache at `path`, reporting what happened.
    ///
    /// The ledger is loaded first, from the sibling path, and bound to
    /// `build_id`. The freshly loaded ledger and `probe` are always the ones
    /// bound to the returned cache. A bad cache file is deleted and re-read
    /// at most `max_recovery_attempts` times; if it still cannot be read
    /// (deletion silently failing, for instance) an empty cache is returned.
    pub fn load_with_status(
        path: &Path,
        build_id: BuildId,
        probe: Arc<dyn ContentProbe>,
        max_recovery_attempts: u32,
    ) -> (Self, LoadStatus) {
        let ledger = CreatedCodeLedger::load(&ledger_path_for(path), build_id);
        let mut recovery = None;
        let mut attempts = 0;

        loop {
            let decoded = match std::fs::read(path) {
                Ok(raw) => format::decode(path, &raw),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    let status = recovery.map_or(LoadStatus::ColdStart, LoadStatus::Recovered);
                    debug!(path = %path.display(), ?status, "starting with empty build cache");
                    return (Self::new(path, ledger, probe), status);
                }
                Err(e) => Err(CacheError::io(path, e)),
            };

            let error = match decoded {
                Ok(record) => {
                    debug!(path = %path.display(), files = record.files.len(), "loaded build cache");
                    return (
                        Self::from_record(path, record, ledger, probe),
                        LoadStatus::Loaded,
                    );
                }
                Err(e) => e,
            };

            let reason = if error.is_incompatible() {
                RecoveryReason::Incompatible
            } else {
                RecoveryReason::Corrupt
            };
            warn!(error = %error, ?reason, "discarding build cache");
            recovery = Some(reason);

            if attempts >= max_recovery_attempts {
                warn!(path = %path.display(), attempts, "could not remove bad build cache, using an empty one");
                return (Self::new(path, ledger, probe), LoadStatus::Recovered(reason));
            }
            attempts += 1;

            if let Err(e) = std::fs::remove_file(path) {
                debug!(path = %path.display(), error = %e, "failed to delete bad build cache");
            }
        }
    }

    /// Saves to [`cache_file_path`](Self::cache_file_path). Returns whether
    /// the cache was written.
    pub fn save(&mut self) -> bool {
        let path = self.cache_file_path.clone();
        self.save_to(&path)
    }

    /// Saves the ledger and the cache next to each other at `path`.
    ///
    /// Failures are logged and swallowed; the return value reports whether
    /// the cache was written. On success `path` becomes the cache's default
    /// location.
    pub fn save_to(&mut self, path: &Path) -> bool {
        match self.try_save_to(path) {
            Ok(()) => {
                debug!(path = %path.display(), files = self.files.len(), "saved build cache");
                true
            }
            Err(e) => {
                warn!(error = %e, "build cache not saved");
                false
            }
        }
    }

    /// Fallible form of [`save_to`](Self::save_to).
    ///
    /// The cache is written to a temporary sibling and renamed into place,
    /// so a failure never leaves a half-written cache file behind.
    pub fn try_save_to(&mut self, path: &Path) -> Result<(), CacheError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| CacheError::io(dir, e))?;
        }

        self.ledger.save(&ledger_path_for(path))?;

        let bytes = format::encode(&self.to_record())?;
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);
        std::fs::write(&tmp, &bytes).map_err(|e| CacheError::io(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(CacheError::io(path, e));
        }

        self.cache_file_path = path.to_path_buf();
        Ok(())
    }
}
