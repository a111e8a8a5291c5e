//! Payload checksums for persisted build state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 128-bit XXH3 checksum over an encoded payload.
///
/// Stored alongside every persisted cache blob so that a truncated or
/// bit-flipped file is rejected before its payload is decoded.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum([u8; 16]);

impl Checksum {
    /// Computes the checksum of `data`.
    pub fn of(data: &[u8]) -> Self {
        Self(xxhash_rust::xxh3::xxh3_128(data).to_le_bytes())
    }

    /// Returns the raw little-endian digest bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|byte| write!(f, "{byte:02x}"))
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_payload_same_checksum() {
        assert_eq!(Checksum::of(b"payload"), Checksum::of(b"payload"));
    }

    #[test]
    fn single_byte_change_is_detected() {
        assert_ne!(Checksum::of(b"payload"), Checksum::of(b"paylaod"));
    }

    #[test]
    fn display_is_lowercase_hex() {
        let s = Checksum::of(b"x").to_string();
        assert_eq!(s.len(), 32);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn json_roundtrip() {
        let c = Checksum::of(b"json");
        let json = serde_json::to_string(&c).unwrap();
        let back: Checksum = serde_json::from_str(&json).unwrap();
        assert_eq!(c, back);
    }
}
