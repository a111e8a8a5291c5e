//! Incremental build cache for the forge content pipeline.
//!
//! Decides, for every asset of a project, whether it must be rebuilt;
//! tracks transitive dependencies between assets; persists that state across
//! runs and recovers from corrupt or stale cache files by starting fresh.

#![warn(missing_docs)]

pub mod build_file;
pub mod cache;
pub mod error;
pub mod format;
pub mod ledger;
pub mod persist;
pub mod probe;
pub mod shared;

pub use build_file::{BuildFile, Staleness};
pub use cache::{BuildCache, ContentItem};
pub use error::CacheError;
pub use ledger::{ledger_path_for, CreatedCodeLedger};
pub use persist::{LoadStatus, RecoveryReason, DEFAULT_RECOVERY_ATTEMPTS};
pub use probe::{content_key, ContentProbe, FsContentProbe};
pub use shared::SharedBuildCache;

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::{HashMap, HashSet};
    use std::io;
    use std::path::{Path, PathBuf};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use parking_lot::Mutex;

    use crate::probe::ContentProbe;

    /// `secs` seconds after the epoch.
    pub fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    /// In-memory probe whose answers tests can change while a cache holds it.
    #[derive(Default)]
    pub struct FakeProbe {
        sources: Mutex<HashMap<PathBuf, SystemTime>>,
        outputs: Mutex<HashMap<PathBuf, SystemTime>>,
        failing_outputs: Mutex<HashSet<PathBuf>>,
    }

    impl FakeProbe {
        pub fn set_source(&self, path: impl AsRef<Path>, time: SystemTime) {
            self.sources.lock().insert(path.as_ref().to_path_buf(), time);
        }

        pub fn remove_source(&self, path: impl AsRef<Path>) {
            self.sources.lock().remove(path.as_ref());
        }

        pub fn set_output(&self, path: impl AsRef<Path>, time: SystemTime) {
            self.outputs.lock().insert(path.as_ref().to_path_buf(), time);
        }

        pub fn remove_output(&self, path: impl AsRef<Path>) {
            self.outputs.lock().remove(path.as_ref());
        }

        pub fn fail_output(&self, path: impl AsRef<Path>) {
            self.failing_outputs.lock().insert(path.as_ref().to_path_buf());
        }
    }

    impl ContentProbe for FakeProbe {
        fn source_modified(&self, path: &Path) -> io::Result<SystemTime> {
            self.sources
                .lock()
                .get(path)
                .copied()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such source"))
        }

        fn output_modified(&self, path: &Path) -> io::Result<Option<SystemTime>> {
            if self.failing_outputs.lock().contains(path) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            Ok(self.outputs.lock().get(path).copied())
        }
    }
}
