//! Per-path build state.
//!
//! A [`BuildFile`] records what the cache knew about one source path the
//! last time it was built or re-referenced: the build identifier, the
//! dependency edges its output was derived from, and the modification times
//! of its source and processed output.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use forge_common::BuildId;
use serde::{Deserialize, Serialize};

use crate::probe::ContentProbe;

/// Build state for a single tracked path.
///
/// Entries are keyed by absolute path in the [`BuildCache`](crate::BuildCache).
/// A file that produces no processed output of its own (an included shader
/// source, a texture referenced by a material) has no `output_modified_time`
/// and is judged by its source timestamp alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFile {
    /// Identifier of the build this file was last built or refreshed under.
    pub build_id: BuildId,

    /// Absolute source path. Unique within a cache.
    pub path: PathBuf,

    /// Absolute paths this file's output was derived from, in import order.
    pub dependencies: Vec<PathBuf>,

    /// Source modification time observed at the last refresh.
    pub source_modified_time: Option<SystemTime>,

    /// Output modification time observed at the last refresh, `None` when
    /// no output was produced.
    pub output_modified_time: Option<SystemTime>,

    /// Whether the build step emits code or assets consumed elsewhere even
    /// when the generated-code ledger has no entry for it.
    pub creates_user_content: bool,
}

/// Why a [`BuildFile`] is considered stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// The source could not be read (deleted, permission denied).
    SourceUnreadable,
    /// Nothing was ever recorded for this path.
    NeverRefreshed,
    /// An output was recorded but can no longer be found.
    OutputMissing,
    /// The source was modified after the recorded output was produced.
    SourceNewerThanOutput,
    /// The source of an output-less file changed since it was recorded.
    SourceChanged,
    /// The source was modified after the dependent's output was produced.
    NewerThanDependent,
}

impl fmt::Display for Staleness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Staleness::SourceUnreadable => "source unreadable",
            Staleness::NeverRefreshed => "never refreshed",
            Staleness::OutputMissing => "output missing",
            Staleness::SourceNewerThanOutput => "source newer than output",
            Staleness::SourceChanged => "source changed",
            Staleness::NewerThanDependent => "newer than dependent output",
        };
        f.write_str(s)
    }
}

impl BuildFile {
    /// Creates an entry with no recorded source or output state.
    pub fn new(build_id: BuildId, path: impl Into<PathBuf>) -> Self {
        Self {
            build_id,
            path: path.into(),
            dependencies: Vec::new(),
            source_modified_time: None,
            output_modified_time: None,
            creates_user_content: false,
        }
    }

    /// Creates an entry and immediately records the current source and
    /// output state reported by `probe`.
    pub fn refreshed(build_id: BuildId, path: impl Into<PathBuf>, probe: &dyn ContentProbe) -> Self {
        let mut file = Self::new(build_id, path);
        file.refresh(build_id, probe);
        file
    }

    /// Replaces the dependency list.
    pub fn with_dependencies(mut self, dependencies: Vec<PathBuf>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Sets the user-content flag.
    pub fn with_user_content(mut self, creates_user_content: bool) -> Self {
        self.creates_user_content = creates_user_content;
        self
    }

    /// Re-stamps this entry with `build_id` and the current timestamps.
    ///
    /// Probe failures record "unknown", which later reads as stale.
    pub fn refresh(&mut self, build_id: BuildId, probe: &dyn ContentProbe) {
        self.build_id = build_id;
        self.source_modified_time = probe.source_modified(&self.path).ok();
        self.output_modified_time = probe.output_modified(&self.path).ok().flatten();
    }

    /// Returns `true` if a processed output was recorded for this file.
    pub fn is_built(&self) -> bool {
        self.output_modified_time.is_some()
    }

    /// Returns `true` if this file has no dependency edges.
    pub fn is_leaf(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Returns the path as recorded.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks this file alone, without following dependencies.
    ///
    /// `parent_modified` is the output time of the file that depends on this
    /// one; a source edited after that output was produced is stale even if
    /// this file's own output is current.
    pub fn needs_rebuild(&self, probe: &dyn ContentProbe, parent_modified: Option<SystemTime>) -> bool {
        self.staleness(probe, parent_modified).is_some()
    }

    /// Like [`needs_rebuild`](Self::needs_rebuild), but reports the reason.
    pub fn staleness(
        &self,
        probe: &dyn ContentProbe,
        parent_modified: Option<SystemTime>,
    ) -> Option<Staleness> {
        let Ok(source) = probe.source_modified(&self.path) else {
            return Some(Staleness::SourceUnreadable);
        };

        match self.output_modified_time {
            Some(recorded_output) => {
                let Ok(Some(current_output)) = probe.output_modified(&self.path) else {
                    return Some(Staleness::OutputMissing);
                };
                if source > recorded_output.min(current_output) {
                    return Some(Staleness::SourceNewerThanOutput);
                }
            }
            None => match self.source_modified_time {
                None => return Some(Staleness::NeverRefreshed),
                Some(recorded_source) if recorded_source != source => {
                    return Some(Staleness::SourceChanged);
                }
                Some(_) => {}
            },
        }

        match parent_modified {
            Some(parent) if source > parent => Some(Staleness::NewerThanDependent),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, FakeProbe};

    const SRC: &str = "/proj/Content/shader.glsl";

    fn built_leaf(probe: &FakeProbe) -> BuildFile {
        probe.set_source(SRC, at(100));
        probe.set_output(SRC, at(110));
        BuildFile::refreshed(BuildId::new(), SRC, probe)
    }

    #[test]
    fn new_entry_has_no_state() {
        let f = BuildFile::new(BuildId::nil(), SRC);
        assert!(f.is_leaf());
        assert!(!f.is_built());
        assert!(f.source_modified_time.is_none());
        assert!(!f.creates_user_content);
    }

    #[test]
    fn refresh_records_probe_state() {
        let probe = FakeProbe::default();
        let f = built_leaf(&probe);
        assert_eq!(f.source_modified_time, Some(at(100)));
        assert_eq!(f.output_modified_time, Some(at(110)));
        assert!(f.is_built());
    }

    #[test]
    fn refresh_restamps_build_id() {
        let probe = FakeProbe::default();
        let mut f = built_leaf(&probe);
        let next = BuildId::new();
        f.refresh(next, &probe);
        assert_eq!(f.build_id, next);
    }

    #[test]
    fn fresh_leaf_does_not_need_rebuild() {
        let probe = FakeProbe::default();
        let f = built_leaf(&probe);
        assert!(!f.needs_rebuild(&probe, None));
    }

    #[test]
    fn deleting_output_forces_rebuild() {
        let probe = FakeProbe::default();
        let f = built_leaf(&probe);
        probe.remove_output(SRC);
        assert_eq!(f.staleness(&probe, None), Some(Staleness::OutputMissing));
    }

    #[test]
    fn output_probe_error_forces_rebuild() {
        let probe = FakeProbe::default();
        let f = built_leaf(&probe);
        probe.fail_output(SRC);
        assert_eq!(f.staleness(&probe, None), Some(Staleness::OutputMissing));
    }

    #[test]
    fn vanished_source_forces_rebuild() {
        let probe = FakeProbe::default();
        let f = built_leaf(&probe);
        probe.remove_source(SRC);
        assert_eq!(f.staleness(&probe, None), Some(Staleness::SourceUnreadable));
    }

    #[test]
    fn edited_source_is_newer_than_output() {
        let probe = FakeProbe::default();
        let f = built_leaf(&probe);
        probe.set_source(SRC, at(120));
        assert_eq!(
            f.staleness(&probe, None),
            Some(Staleness::SourceNewerThanOutput)
        );
    }

    #[test]
    fn output_older_than_source_is_stale() {
        let probe = FakeProbe::default();
        let f = built_leaf(&probe);
        probe.set_output(SRC, at(95));
        assert_eq!(
            f.staleness(&probe, None),
            Some(Staleness::SourceNewerThanOutput)
        );
    }

    #[test]
    fn pure_input_tracks_source_changes() {
        let probe = FakeProbe::default();
        probe.set_source(SRC, at(100));
        let f = BuildFile::refreshed(BuildId::new(), SRC, &probe);
        assert!(!f.is_built());
        assert!(!f.needs_rebuild(&probe, None));

        probe.set_source(SRC, at(90));
        assert_eq!(f.staleness(&probe, None), Some(Staleness::SourceChanged));
    }

    #[test]
    fn unrefreshed_entry_is_stale() {
        let probe = FakeProbe::default();
        probe.set_source(SRC, at(100));
        let f = BuildFile::new(BuildId::new(), SRC);
        assert_eq!(f.staleness(&probe, None), Some(Staleness::NeverRefreshed));
    }

    #[test]
    fn older_parent_cannot_mask_newer_source() {
        let probe = FakeProbe::default();
        let f = built_leaf(&probe);
        assert_eq!(
            f.staleness(&probe, Some(at(50))),
            Some(Staleness::NewerThanDependent)
        );
        assert!(!f.needs_rebuild(&probe, Some(at(200))));
    }

    #[test]
    fn staleness_display() {
        assert_eq!(Staleness::OutputMissing.to_string(), "output missing");
        assert_eq!(
            Staleness::NewerThanDependent.to_string(),
            "newer than dependent output"
        );
    }
}
