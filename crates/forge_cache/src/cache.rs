//! The incremental build cache.
//!
//! [`BuildCache`] maps absolute source paths to their [`BuildFile`] records
//! and answers the one question the build driver asks for every asset: does
//! it need to be rebuilt? The answer follows recorded dependency edges
//! transitively and cross-checks the generated-code ledger. Every uncertain
//! case answers "rebuild": a spurious rebuild costs time, a missed one ships
//! stale content.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use forge_common::BuildId;
use rayon::prelude::*;
use tracing::debug;

use crate::build_file::BuildFile;
use crate::format::CacheRecord;
use crate::ledger::CreatedCodeLedger;
use crate::probe::ContentProbe;

/// A content file the driver wants a rebuild verdict for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    /// Ledger key: path under the content root without extension.
    pub relative: String,
    /// Absolute source path.
    pub path: PathBuf,
}

impl ContentItem {
    /// Creates an item from its ledger key and absolute path.
    pub fn new(relative: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            relative: relative.into(),
            path: path.into(),
        }
    }
}

/// Build state for every tracked path of a project.
///
/// The cache owns its [`BuildFile`] records and its [`CreatedCodeLedger`].
/// The [`ContentProbe`] is injected at construction and is never persisted.
/// There is no internal locking; wrap the cache in a
/// [`SharedBuildCache`](crate::SharedBuildCache) to drive parallel builds.
pub struct BuildCache {
    pub(crate) cache_file_path: PathBuf,
    pub(crate) files: HashMap<PathBuf, BuildFile>,
    pub(crate) ledger: CreatedCodeLedger,
    pub(crate) probe: Arc<dyn ContentProbe>,
}

impl fmt::Debug for BuildCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildCache")
            .field("cache_file_path", &self.cache_file_path)
            .field("files", &self.files.len())
            .field("ledger", &self.ledger.len())
            .finish_non_exhaustive()
    }
}

impl BuildCache {
    /// Creates an empty cache bound to `ledger` and `probe`.
    pub fn new(
        cache_file_path: impl Into<PathBuf>,
        ledger: CreatedCodeLedger,
        probe: Arc<dyn ContentProbe>,
    ) -> Self {
        Self {
            cache_file_path: cache_file_path.into(),
            files: HashMap::new(),
            ledger,
            probe,
        }
    }

    pub(crate) fn from_record(
        cache_file_path: &Path,
        record: CacheRecord,
        ledger: CreatedCodeLedger,
        probe: Arc<dyn ContentProbe>,
    ) -> Self {
        let files = record
            .files
            .into_iter()
            .map(|file| (file.path.clone(), file))
            .collect();
        Self {
            cache_file_path: cache_file_path.to_path_buf(),
            files,
            ledger,
            probe,
        }
    }

    pub(crate) fn to_record(&self) -> CacheRecord {
        let mut files: Vec<BuildFile> = self.files.values().cloned().collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        CacheRecord { files }
    }

    /// Where this cache was loaded from and is saved to by default.
    pub fn cache_file_path(&self) -> &Path {
        &self.cache_file_path
    }

    /// The generated-code ledger bound to this session.
    pub fn ledger(&self) -> &CreatedCodeLedger {
        &self.ledger
    }

    /// Mutable access to the ledger, for code generators recording output.
    pub fn ledger_mut(&mut self) -> &mut CreatedCodeLedger {
        &mut self.ledger
    }

    /// The content probe this cache was built with.
    pub fn probe(&self) -> &dyn ContentProbe {
        self.probe.as_ref()
    }

    /// Inserts or replaces the record for `path`.
    pub fn add_file(&mut self, path: impl Into<PathBuf>, file: BuildFile) {
        self.files.insert(path.into(), file);
    }

    /// Looks up the record for `path`.
    pub fn get_file(&self, path: &Path) -> Option<&BuildFile> {
        self.files.get(path)
    }

    /// Iterates over all tracked records in no particular order.
    pub fn files(&self) -> impl Iterator<Item = (&Path, &BuildFile)> {
        self.files.iter().map(|(path, file)| (path.as_path(), file))
    }

    /// Number of tracked paths.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if no path is tracked.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Returns `true` if any tracked file has a recorded output, i.e. a
    /// clean step would have something to remove.
    pub fn has_built_items(&self) -> bool {
        self.files.values().any(BuildFile::is_built)
    }

    /// Forgets every tracked file. Build outputs on disk are left alone.
    pub fn clear(&mut self) {
        debug!(files = self.files.len(), "clearing build cache");
        self.files.clear();
    }

    /// Hook for removing on-disk build artifacts. Currently does nothing.
    pub fn clean(&mut self) {
        debug!("clean requested, no artifacts removed");
    }

    /// Records the dependencies reported by a successful build.
    ///
    /// Each dependency is resolved against `import_dir`. Tracked paths are
    /// re-stamped with `build_id` and their current timestamps; untracked
    /// paths get a new record stamped the same way. Calling this twice with
    /// the same arguments yields the same state as calling it once.
    pub fn add_dependencies<I, P>(&mut self, build_id: BuildId, import_dir: &Path, dependencies: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let probe = self.probe.as_ref();
        for dependency in dependencies {
            let path = normalize_path(&import_dir.join(dependency));
            match self.files.entry(path) {
                Entry::Occupied(mut entry) => entry.get_mut().refresh(build_id, probe),
                Entry::Vacant(entry) => {
                    let file = BuildFile::refreshed(build_id, entry.key().clone(), probe);
                    entry.insert(file);
                }
            }
        }
    }

    /// Records a successful build of `input_path`.
    ///
    /// Stores the input's dependency edges (resolved against `import_dir`)
    /// and its refreshed output state, then registers the dependencies via
    /// [`add_dependencies`](Self::add_dependencies).
    pub fn register_build<I, P>(
        &mut self,
        build_id: BuildId,
        input_path: &Path,
        import_dir: &Path,
        dependencies: I,
        creates_user_content: bool,
    ) where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let dependencies: Vec<PathBuf> = dependencies
            .into_iter()
            .map(|dep| normalize_path(&import_dir.join(dep)))
            .collect();
        let input_path = normalize_path(input_path);
        let file = BuildFile::refreshed(build_id, input_path.as_path(), self.probe.as_ref())
            .with_dependencies(dependencies.clone())
            .with_user_content(creates_user_content);
        debug!(
            path = %input_path.display(),
            dependencies = dependencies.len(),
            built = file.is_built(),
            "registered build"
        );
        self.files.insert(input_path, file);
        self.add_dependencies(build_id, Path::new(""), &dependencies);
    }

    /// Decides whether `input_path`, or anything it transitively depends
    /// on, must be rebuilt.
    ///
    /// `relative_path` is the ledger key of the asset being asked about; it
    /// is carried unchanged through the recursion. `parent_modified` is the
    /// output time of a dependent, if the caller has one.
    pub fn needs_rebuild(
        &self,
        relative_path: &str,
        input_path: &Path,
        parent_modified: Option<SystemTime>,
    ) -> bool {
        let mut in_progress = HashSet::new();
        self.resolve(relative_path, input_path, parent_modified, &mut in_progress)
    }

    fn resolve<'a>(
        &'a self,
        relative_path: &str,
        input_path: &Path,
        parent_modified: Option<SystemTime>,
        in_progress: &mut HashSet<&'a Path>,
    ) -> bool {
        let Some((key, file)) = self.files.get_key_value(input_path) else {
            debug!(path = %input_path.display(), "untracked, needs rebuild");
            return true;
        };

        // Already being resolved further up: a dependency cycle.
        if !in_progress.insert(key.as_path()) {
            return false;
        }

        if let Some(reason) = file.staleness(self.probe.as_ref(), parent_modified) {
            debug!(path = %input_path.display(), %reason, "needs rebuild");
            in_progress.remove(key.as_path());
            return true;
        }

        let floor = parent_modified.max(file.output_modified_time);
        let dependency_stale = file
            .dependencies
            .iter()
            .any(|dep| self.resolve(relative_path, dep, floor, in_progress));
        in_progress.remove(key.as_path());
        if dependency_stale {
            return true;
        }

        match self.ledger.type_container_build_id(relative_path) {
            None => file.creates_user_content,
            Some(generated_by) => {
                let mismatch = generated_by != file.build_id;
                if mismatch {
                    debug!(
                        relative = relative_path,
                        built = %file.build_id,
                        generated = %generated_by,
                        "generated code from another build"
                    );
                }
                mismatch
            }
        }
    }

    /// Returns the items that need rebuilding, in input order.
    ///
    /// Verdicts are computed in parallel; the cache is only read.
    pub fn stale_files<'a>(&self, items: &'a [ContentItem]) -> Vec<&'a ContentItem> {
        items
            .par_iter()
            .filter(|item| self.needs_rebuild(&item.relative, &item.path, None))
            .collect()
    }
}

/// Lexically resolves `.` and `..` so equivalent dependency spellings map
/// to the same cache key.
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
