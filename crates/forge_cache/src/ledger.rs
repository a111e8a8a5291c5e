//! Generated-code ledger.
//!
//! Some content builds emit code (type containers) that is compiled into the
//! game alongside the processed assets. The ledger remembers, per relative
//! content path, the build identifier that last generated such code. The
//! build cache consults it to catch derived code that no longer matches the
//! identifier an asset was built under.
//!
//! The ledger is stored as JSON next to the cache file, at
//! `<stem>.CreatedCode.<ext>`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use forge_common::BuildId;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CacheError;

/// Current on-disk ledger format. A file with any other version is ignored.
const LEDGER_FORMAT_VERSION: u32 = 1;

/// Infix inserted between the cache file stem and its extension.
const LEDGER_INFIX: &str = "CreatedCode";

/// Maps relative content paths to the build that last generated code for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedCodeLedger {
    format_version: u32,

    /// Build identifier of the session that last saved this ledger.
    session: BuildId,

    entries: BTreeMap<String, BuildId>,

    /// Session identifier found on disk when this ledger was loaded.
    #[serde(skip)]
    previous_session: Option<BuildId>,
}

impl CreatedCodeLedger {
    /// Creates an empty ledger for the session `session`.
    pub fn new(session: BuildId) -> Self {
        Self {
            format_version: LEDGER_FORMAT_VERSION,
            session,
            entries: BTreeMap::new(),
            previous_session: None,
        }
    }

    /// Loads the ledger at `path` for the session `session`, or creates an
    /// empty one.
    ///
    /// Missing, unreadable, corrupt and incompatible ledgers all yield an
    /// empty ledger: losing it only costs rebuilds.
    pub fn load(path: &Path, session: BuildId) -> Self {
        match Self::try_load(path) {
            Ok(Some(mut ledger)) => {
                ledger.previous_session = Some(ledger.session);
                ledger.session = session;
                debug!(path = %path.display(), entries = ledger.len(), "loaded created-code ledger");
                ledger
            }
            Ok(None) => {
                debug!(path = %path.display(), "no created-code ledger, starting empty");
                Self::new(session)
            }
            Err(e) => {
                warn!(error = %e, "discarding unreadable created-code ledger");
                Self::new(session)
            }
        }
    }

    /// Reads the ledger at `path`, returning `Ok(None)` if it does not exist.
    pub fn try_load(path: &Path) -> Result<Option<Self>, CacheError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(path, e)),
        };
        let ledger: Self = serde_json::from_str(&content).map_err(|e| CacheError::LedgerParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if ledger.format_version != LEDGER_FORMAT_VERSION {
            return Err(CacheError::VersionMismatch {
                path: path.to_path_buf(),
                expected: LEDGER_FORMAT_VERSION.to_string(),
                actual: ledger.format_version.to_string(),
            });
        }
        Ok(Some(ledger))
    }

    /// Writes the ledger to `path` as JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| CacheError::io(path, e))
    }

    /// Build identifier that last generated a type container for
    /// `relative_path`, if any.
    pub fn type_container_build_id(&self, relative_path: &str) -> Option<BuildId> {
        self.entries.get(relative_path).copied()
    }

    /// Records that `build_id` generated code for `relative_path`, returning
    /// the identifier it replaces.
    pub fn record(&mut self, relative_path: impl Into<String>, build_id: BuildId) -> Option<BuildId> {
        self.entries.insert(relative_path.into(), build_id)
    }

    /// The session this ledger is currently bound to.
    pub fn session(&self) -> BuildId {
        self.session
    }

    /// The session that last saved the ledger, if it was loaded from disk.
    pub fn previous_session(&self) -> Option<BuildId> {
        self.previous_session
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in relative-path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, BuildId)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Location of the ledger belonging to `cache_file`.
///
/// `obj/forge.cache` maps to `obj/forge.CreatedCode.cache`; a cache file
/// without an extension maps to `<name>.CreatedCode`.
pub fn ledger_path_for(cache_file: &Path) -> PathBuf {
    let stem = cache_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match cache_file.extension() {
        Some(ext) => format!("{stem}.{LEDGER_INFIX}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{LEDGER_INFIX}"),
    };
    cache_file.with_file_name(name)
}
