//! Why a `forge.toml` could not be turned into a [`ProjectConfig`](crate::ProjectConfig).

use std::path::PathBuf;

/// A `forge.toml` that is unreadable, malformed, or describes an unusable
/// content or cache layout.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file at `path` could not be read.
    #[error("cannot read {path}: {source}")]
    Unreadable {
        /// The configuration file that was requested.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The content is not TOML, or does not have the `forge.toml` shape.
    #[error("malformed forge.toml: {0}")]
    Malformed(String),

    /// A setting the project cannot work without was left empty.
    #[error("forge.toml has an empty `{0}`")]
    EmptySetting(&'static str),

    /// A setting has a value the build cache cannot use.
    #[error("`{setting}` {problem}")]
    BadSetting {
        /// Dotted name of the setting, e.g. `cache.output_extension`.
        setting: &'static str,
        /// What is wrong with it.
        problem: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_setting_names_the_key() {
        let err = ConfigError::EmptySetting("project.name");
        assert_eq!(err.to_string(), "forge.toml has an empty `project.name`");
    }

    #[test]
    fn bad_setting_reads_as_a_sentence() {
        let err = ConfigError::BadSetting {
            setting: "cache.max_recovery_attempts",
            problem: "must be at least 1".to_string(),
        };
        assert_eq!(err.to_string(), "`cache.max_recovery_attempts` must be at least 1");
    }

    #[test]
    fn unreadable_mentions_the_file() {
        let err = ConfigError::Unreadable {
            path: PathBuf::from("/proj/forge.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let text = err.to_string();
        assert!(text.starts_with("cannot read /proj/forge.toml"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
