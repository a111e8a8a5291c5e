//! Shared helpers for CLI commands.
//!
//! Project root resolution, configuration loading, opening the build cache
//! for a session, and content file discovery.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use forge_cache::{
    content_key, ledger_path_for, BuildCache, ContentItem, CreatedCodeLedger, FsContentProbe,
    LoadStatus,
};
use forge_common::BuildId;
use forge_config::{ProjectConfig, CONFIG_FILE};

use crate::GlobalArgs;

/// A loaded project: its root directory and validated configuration.
pub struct Project {
    /// Directory containing `forge.toml`.
    pub root: PathBuf,
    /// Parsed configuration.
    pub config: ProjectConfig,
}

impl Project {
    /// Absolute content root.
    pub fn content_dir(&self) -> PathBuf {
        self.config.content_dir(&self.root)
    }

    /// Filesystem probe for this project's content and output trees.
    pub fn probe(&self) -> Arc<FsContentProbe> {
        Arc::new(FsContentProbe::new(
            self.content_dir(),
            self.config.output_dir(&self.root),
            self.config.cache.output_extension.clone(),
        ))
    }

    /// Loads the build cache for a session stamped with `build_id`.
    pub fn open_cache(&self, build_id: BuildId) -> (BuildCache, LoadStatus) {
        BuildCache::load_with_status(
            &self.config.cache_file(&self.root),
            build_id,
            self.probe(),
            self.config.cache.max_recovery_attempts,
        )
    }

    /// The build session recorded by the last save, if any.
    ///
    /// Successive `forge register` calls reuse it so that every asset of one
    /// build shares a build id. An unreadable ledger counts as no session.
    pub fn current_session(&self) -> Option<BuildId> {
        let ledger_path = ledger_path_for(&self.config.cache_file(&self.root));
        CreatedCodeLedger::try_load(&ledger_path)
            .ok()
            .flatten()
            .map(|ledger| ledger.session())
    }

    /// Resolves a path given on the command line against the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Walks up from `start` looking for the nearest directory containing `forge.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Locates and loads the project selected by the global CLI args.
///
/// `--config` may name a `forge.toml` file or the directory holding it;
/// otherwise the current directory and its parents are searched.
pub fn load_project(global: &GlobalArgs) -> Result<Project, Box<dyn std::error::Error>> {
    let (root, config) = match global.config {
        Some(ref config_path) if config_path.is_file() => {
            let root = config_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            (root, forge_config::load_config_file(config_path)?)
        }
        Some(ref dir) => (dir.clone(), forge_config::load_config(dir)?),
        None => {
            let root = find_project_root(&std::env::current_dir()?)?;
            let config = forge_config::load_config(&root)?;
            (root, config)
        }
    };
    Ok(Project { root, config })
}

/// Discovers content files under `dir` (recursive), sorted by path.
///
/// Hidden files and directories are skipped.
pub fn discover_content_files(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    walk_dir(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        if path.is_dir() {
            walk_dir(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

/// Content items for every file under the project's content root.
pub fn content_items(project: &Project) -> Result<Vec<ContentItem>, Box<dyn std::error::Error>> {
    let content_dir = project.content_dir();
    if !content_dir.is_dir() {
        return Err(format!("content directory {} not found", content_dir.display()).into());
    }
    Ok(discover_content_files(&content_dir)?
        .into_iter()
        .filter_map(|path| {
            let relative = content_key(&content_dir, &path)?;
            Some(ContentItem::new(relative, path))
        })
        .collect())
}
