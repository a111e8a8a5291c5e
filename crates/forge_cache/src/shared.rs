//! A build cache shared between parallel asset builds.

use std::path::Path;
use std::sync::Arc;

use forge_common::BuildId;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::build_file::BuildFile;
use crate::cache::{BuildCache, ContentItem};

/// A [`BuildCache`] behind one coarse read-write lock.
///
/// Rebuild verdicts take the read lock and may run concurrently with each
/// other; registration and saving take the write lock, so a verdict never
/// observes a half-applied registration. Cloning shares the same cache.
#[derive(Debug, Clone)]
pub struct SharedBuildCache {
    inner: Arc<RwLock<BuildCache>>,
}

impl SharedBuildCache {
    /// Wraps `cache` for shared use.
    pub fn new(cache: BuildCache) -> Self {
        Self {
            inner: Arc::new(RwLock::new(cache)),
        }
    }

    /// See [`BuildCache::needs_rebuild`].
    pub fn needs_rebuild(&self, relative_path: &str, input_path: &Path) -> bool {
        self.inner.read().needs_rebuild(relative_path, input_path, None)
    }

    /// See [`BuildCache::stale_files`]. Returns owned items.
    pub fn stale_files(&self, items: &[ContentItem]) -> Vec<ContentItem> {
        self.inner
            .read()
            .stale_files(items)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Returns a copy of the record for `path`.
    pub fn get_file(&self, path: &Path) -> Option<BuildFile> {
        self.inner.read().get_file(path).cloned()
    }

    /// See [`BuildCache::register_build`].
    pub fn register_build<I, P>(
        &self,
        build_id: BuildId,
        input_path: &Path,
        import_dir: &Path,
        dependencies: I,
        creates_user_content: bool,
    ) where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.inner.write().register_build(
            build_id,
            input_path,
            import_dir,
            dependencies,
            creates_user_content,
        );
    }

    /// See [`BuildCache::add_dependencies`].
    pub fn add_dependencies<I, P>(&self, build_id: BuildId, import_dir: &Path, dependencies: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.inner
            .write()
            .add_dependencies(build_id, import_dir, dependencies);
    }

    /// See [`BuildCache::save`].
    pub fn save(&self) -> bool {
        self.inner.write().save()
    }

    /// Read access for anything not mirrored here.
    pub fn read(&self) -> RwLockReadGuard<'_, BuildCache> {
        self.inner.read()
    }

    /// Write access for anything not mirrored here.
    pub fn write(&self) -> RwLockWriteGuard<'_, BuildCache> {
        self.inner.write()
    }

    /// Unwraps the cache if this is the last handle.
    pub fn into_inner(self) -> Result<BuildCache, Self> {
        Arc::try_unwrap(self.inner)
            .map(RwLock::into_inner)
            .map_err(|inner| Self { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::CreatedCodeLedger;
    use crate::test_support::{at, FakeProbe};

    fn shared(probe: Arc<FakeProbe>) -> SharedBuildCache {
        SharedBuildCache::new(BuildCache::new(
            "/proj/obj/forge.cache",
            CreatedCodeLedger::new(BuildId::new()),
            probe,
        ))
    }

    #[test]
    fn parallel_registration_tracks_everything() {
        let probe = Arc::new(FakeProbe::default());
        let common = "/proj/Content/common.glsl";
        probe.set_source(common, at(10));
        let assets: Vec<String> = (0..16).map(|i| format!("/proj/Content/asset{i}.json")).collect();
        for asset in &assets {
            probe.set_source(asset, at(20));
            probe.set_output(asset, at(30));
        }

        let cache = shared(probe);
        let id = BuildId::new();
        std::thread::scope(|scope| {
            for asset in &assets {
                let cache = cache.clone();
                scope.spawn(move || {
                    cache.register_build(
                        id,
                        Path::new(asset),
                        Path::new("/proj/Content"),
                        ["common.glsl"],
                        false,
                    );
                    cache.needs_rebuild("asset", Path::new(asset));
                });
            }
        });

        assert_eq!(cache.read().len(), assets.len() + 1);
        for asset in &assets {
            assert!(!cache.needs_rebuild("asset", Path::new(asset)));
        }
        assert_eq!(cache.get_file(Path::new(common)).unwrap().build_id, id);
    }

    #[test]
    fn stale_files_returns_owned_items() {
        let cache = shared(Arc::new(FakeProbe::default()));
        let items = vec![ContentItem::new("a", "/proj/Content/a.png")];
        assert_eq!(cache.stale_files(&items), items);
    }

    #[test]
    fn into_inner_requires_last_handle() {
        let cache = shared(Arc::new(FakeProbe::default()));
        let other = cache.clone();
        let cache = cache.into_inner().unwrap_err();
        drop(other);
        assert!(cache.into_inner().is_ok());
    }
}
