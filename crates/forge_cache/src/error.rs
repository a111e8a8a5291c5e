//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur while reading or writing persisted build state.
///
/// None of these reach the build driver through the decision or load APIs:
/// they are logged and converted into "rebuild" or "start fresh" outcomes.
/// [`BuildCache::try_save_to`](crate::BuildCache::try_save_to) is the one
/// place that hands them out, for callers that want to report save failures.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing a cache file.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The cache file does not start with a readable envelope header.
    #[error("invalid cache header in {path}: {reason}")]
    InvalidHeader {
        /// The cache file path.
        path: PathBuf,
        /// Description of the header problem.
        reason: String,
    },

    /// The stored checksum does not match the checksum of the payload.
    #[error("checksum mismatch in {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The cache file path.
        path: PathBuf,
        /// Checksum recorded in the header.
        expected: String,
        /// Checksum computed from the payload on disk.
        actual: String,
    },

    /// The file was written by an incompatible format or tool version.
    #[error("version mismatch in {path}: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The cache file path.
        path: PathBuf,
        /// Version this build understands.
        expected: String,
        /// Version found in the file.
        actual: String,
    },

    /// Encoding or decoding the cache payload failed.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// The generated-code ledger could not be parsed.
    #[error("failed to parse created-code ledger {path}: {reason}")]
    LedgerParse {
        /// The ledger file path.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },
}

impl CacheError {
    /// Returns `true` when the file is well-formed but was produced by a
    /// different format or tool version.
    pub fn is_incompatible(&self) -> bool {
        matches!(self, CacheError::VersionMismatch { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = CacheError::io(
            "/tmp/obj/forge.cache",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("cache I/O error"));
        assert!(msg.contains("forge.cache"));
    }

    #[test]
    fn checksum_mismatch_display() {
        let err = CacheError::ChecksumMismatch {
            path: PathBuf::from("forge.cache"),
            expected: "aabb".to_string(),
            actual: "ccdd".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("aabb"));
        assert!(msg.contains("ccdd"));
        assert!(!err.is_incompatible());
    }

    #[test]
    fn version_mismatch_is_incompatible() {
        let err = CacheError::VersionMismatch {
            path: PathBuf::from("old.cache"),
            expected: "2".to_string(),
            actual: "1".to_string(),
        };
        assert!(err.to_string().contains("expected 2"));
        assert!(err.is_incompatible());
    }

    #[test]
    fn ledger_parse_display() {
        let err = CacheError::LedgerParse {
            path: PathBuf::from("forge.CreatedCode.cache"),
            reason: "EOF while parsing".to_string(),
        };
        assert!(err.to_string().contains("created-code ledger"));
        assert!(!err.is_incompatible());
    }
}
