//! Configuration types deserialized from `forge.toml`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// The top-level project configuration parsed from `forge.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Project metadata and content location.
    pub project: ProjectMeta,
    /// Incremental build cache settings.
    #[serde(default)]
    pub cache: CacheSettings,
    /// Diagnostic log settings.
    #[serde(default)]
    pub log: LogSettings,
}

/// Core project metadata required in every `forge.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// Directory holding the source assets, relative to the project root.
    #[serde(default = "default_content_root")]
    pub content_root: PathBuf,
}

/// Where the build cache and build outputs live.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Cache file path, relative to the project root. The generated-code
    /// ledger is stored next to it as `<stem>.CreatedCode.<ext>`.
    pub file: PathBuf,
    /// Root directory of processed build outputs, relative to the project root.
    pub output_dir: PathBuf,
    /// File extension given to every processed output.
    pub output_extension: String,
    /// How many times a corrupt cache file is discarded and reloaded before
    /// falling back to an empty cache.
    pub max_recovery_attempts: u32,
}

/// Log verbosity configured for the CLI.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// One of `error`, `warn`, `info`, `debug`, `trace`.
    pub level: String,
}

/// Log levels accepted in `[log] level`.
pub const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

fn default_content_root() -> PathBuf {
    PathBuf::from("Content")
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            file: PathBuf::from(".forge/forge.cache"),
            output_dir: PathBuf::from("bin/Content"),
            output_extension: "ego".to_string(),
            max_recovery_attempts: 2,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl ProjectConfig {
    /// Absolute content root for a project rooted at `project_dir`.
    pub fn content_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.project.content_root)
    }

    /// Absolute cache file location for a project rooted at `project_dir`.
    pub fn cache_file(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.cache.file)
    }

    /// Absolute build output root for a project rooted at `project_dir`.
    pub fn output_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.cache.output_dir)
    }
}
