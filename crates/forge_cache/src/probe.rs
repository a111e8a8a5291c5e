//! The asset-processing capability the cache queries.
//!
//! The cache never imports or processes an asset itself. It only needs to
//! know when a source was last modified and whether (and when) its processed
//! output was produced. [`ContentProbe`] is that narrow seam; the build driver
//! injects an implementation when it creates or loads a cache.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

/// Read-only view of source and output state for content paths.
///
/// Implementations must not mutate anything on disk. Errors are treated by
/// the cache as "needs rebuild".
pub trait ContentProbe: Send + Sync {
    /// Modification time of the source file at `path`.
    fn source_modified(&self, path: &Path) -> io::Result<SystemTime>;

    /// Modification time of the processed output produced for `path`, or
    /// `None` when no output exists for it.
    fn output_modified(&self, path: &Path) -> io::Result<Option<SystemTime>>;
}

/// A [`ContentProbe`] over the local filesystem.
///
/// A source at `<content_root>/<rel>.<ext>` is expected to produce
/// `<output_root>/<rel>.<output_extension>`. Paths outside the content root
/// (shared includes, external textures) produce no output of their own.
#[derive(Debug, Clone)]
pub struct FsContentProbe {
    content_root: PathBuf,
    output_root: PathBuf,
    output_extension: String,
}

impl FsContentProbe {
    /// Creates a probe for the given content and output roots.
    pub fn new(
        content_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        output_extension: impl Into<String>,
    ) -> Self {
        Self {
            content_root: content_root.into(),
            output_root: output_root.into(),
            output_extension: output_extension.into(),
        }
    }

    /// Location of the processed output for `source`, if it lives under the
    /// content root.
    pub fn output_path(&self, source: &Path) -> Option<PathBuf> {
        let relative = source.strip_prefix(&self.content_root).ok()?;
        if relative.as_os_str().is_empty() {
            return None;
        }
        Some(
            self.output_root
                .join(relative)
                .with_extension(&self.output_extension),
        )
    }
}

impl ContentProbe for FsContentProbe {
    fn source_modified(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }

    fn output_modified(&self, path: &Path) -> io::Result<Option<SystemTime>> {
        let Some(output) = self.output_path(path) else {
            return Ok(None);
        };
        match std::fs::metadata(&output) {
            Ok(meta) => meta.modified().map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Relative content key for `source`: the path under `content_root` with its
/// extension removed and `/` separators, e.g. `materials/stone`.
///
/// This is the key the generated-code ledger is indexed by. Returns `None`
/// for paths outside the content root.
pub fn content_key(content_root: &Path, source: &Path) -> Option<String> {
    let relative = source.strip_prefix(content_root).ok()?.with_extension("");
    let parts: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(dir: &Path) -> FsContentProbe {
        FsContentProbe::new(dir.join("Content"), dir.join("bin"), "ego")
    }

    #[test]
    fn output_path_mirrors_content_tree() {
        let p = FsContentProbe::new("/proj/Content", "/proj/bin", "ego");
        assert_eq!(
            p.output_path(Path::new("/proj/Content/models/tree.obj")),
            Some(PathBuf::from("/proj/bin/models/tree.ego"))
        );
    }

    #[test]
    fn output_path_outside_content_root_is_none() {
        let p = FsContentProbe::new("/proj/Content", "/proj/bin", "ego");
        assert!(p.output_path(Path::new("/shared/common.glsl")).is_none());
        assert!(p.output_path(Path::new("/proj/Content")).is_none());
    }

    #[test]
    fn missing_output_is_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = probe(dir.path());
        let src = dir.path().join("Content").join("a.png");
        assert!(p.output_modified(&src).unwrap().is_none());
    }

    #[test]
    fn existing_output_reports_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let p = probe(dir.path());
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin").join("a.ego"), b"out").unwrap();
        let src = dir.path().join("Content").join("a.png");
        assert!(p.output_modified(&src).unwrap().is_some());
    }

    #[test]
    fn missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = probe(dir.path());
        assert!(p.source_modified(&dir.path().join("nope.png")).is_err());
    }

    #[test]
    fn content_key_strips_extension_and_root() {
        let root = Path::new("/proj/Content");
        assert_eq!(
            content_key(root, Path::new("/proj/Content/materials/stone.json")).as_deref(),
            Some("materials/stone")
        );
        assert_eq!(
            content_key(root, Path::new("/proj/Content/shader.glsl")).as_deref(),
            Some("shader")
        );
        assert!(content_key(root, Path::new("/elsewhere/x.png")).is_none());
    }
}
