//! Build identifiers.
//!
//! Every build session is stamped with a [`BuildId`]. The cache records the
//! identifier a file was last built under and compares it against the one the
//! generated-code ledger holds, so a global regeneration (new identifier)
//! invalidates derived code even when timestamps look fresh.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An opaque token identifying one build session.
///
/// Generation and uniqueness are the build driver's responsibility; the
/// cache only stores and compares identifiers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildId(Uuid);

/// Error returned when a string is not a valid build identifier.
#[derive(Debug, thiserror::Error)]
#[error("invalid build id '{input}': {reason}")]
pub struct ParseBuildIdError {
    /// The rejected input.
    pub input: String,
    /// Why it was rejected.
    pub reason: String,
}

impl BuildId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The all-zero identifier. Never produced by [`BuildId::new`].
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Wraps an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns `true` for the all-zero identifier.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for BuildId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl fmt::Debug for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BuildId({})", self.0.simple())
    }
}

impl FromStr for BuildId {
    type Err = ParseBuildIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| ParseBuildIdError {
                input: s.to_string(),
                reason: e.to_string(),
            })
    }
}
