//! Versioned on-disk encoding of the build cache.
//!
//! A cache file is laid out as:
//!
//! ```text
//! u32 LE header length | bincode EnvelopeHeader | bincode CacheRecord
//! ```
//!
//! The header carries magic bytes, the format version, the version of the
//! tool that wrote it, and a checksum of the payload. Decoding reports
//! incompatible files ([`CacheError::VersionMismatch`]) separately from
//! malformed ones, so recovery can tell the two apart without relying on a
//! deserializer failing halfway through.

use std::path::Path;

use forge_common::Checksum;
use serde::{Deserialize, Serialize};

use crate::build_file::BuildFile;
use crate::error::CacheError;

/// Magic bytes identifying a forge build cache.
const CACHE_MAGIC: [u8; 4] = *b"FBLD";

/// Current cache format version. Increment on breaking changes to the
/// header or payload layout.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Version of the tool writing cache files.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EnvelopeHeader {
    magic: [u8; 4],
    format_version: u32,
    tool_version: String,
    checksum: Checksum,
}

/// The persisted part of a build cache.
///
/// The ledger and the content probe are not part of it; they are session
/// resources, rebuilt on every load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Tracked files, sorted by path.
    pub files: Vec<BuildFile>,
}

/// Encodes `record` into a complete cache file image.
pub fn encode(record: &CacheRecord) -> Result<Vec<u8>, CacheError> {
    let config = bincode::config::standard();
    let payload = bincode::serde::encode_to_vec(record, config).map_err(|e| {
        CacheError::Serialization {
            reason: e.to_string(),
        }
    })?;

    let header = EnvelopeHeader {
        magic: CACHE_MAGIC,
        format_version: CACHE_FORMAT_VERSION,
        tool_version: TOOL_VERSION.to_string(),
        checksum: Checksum::of(&payload),
    };
    let header_bytes = bincode::serde::encode_to_vec(&header, config).map_err(|e| {
        CacheError::Serialization {
            reason: e.to_string(),
        }
    })?;

    let header_len = u32::try_from(header_bytes.len()).map_err(|_| CacheError::Serialization {
        reason: "cache header exceeds 4 GiB".to_string(),
    })?;
    let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
    output.extend_from_slice(&header_len.to_le_bytes());
    output.extend_from_slice(&header_bytes);
    output.extend_from_slice(&payload);
    Ok(output)
}

/// Decodes a cache file image read from `path`.
pub fn decode(path: &Path, raw: &[u8]) -> Result<CacheRecord, CacheError> {
    let invalid = |reason: &str| CacheError::InvalidHeader {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let Some((len_bytes, rest)) = raw.split_first_chunk::<4>() else {
        return Err(invalid("file shorter than header length prefix"));
    };
    let header_len = u32::from_le_bytes(*len_bytes) as usize;
    if rest.len() < header_len {
        return Err(invalid("truncated header"));
    }
    let (header_bytes, payload) = rest.split_at(header_len);

    let config = bincode::config::standard();
    let (header, _): (EnvelopeHeader, usize) =
        bincode::serde::decode_from_slice(header_bytes, config)
            .map_err(|e| invalid(&format!("undecodable header: {e}")))?;

    if header.magic != CACHE_MAGIC {
        return Err(invalid("bad magic bytes"));
    }
    if header.format_version != CACHE_FORMAT_VERSION {
        return Err(CacheError::VersionMismatch {
            path: path.to_path_buf(),
            expected: CACHE_FORMAT_VERSION.to_string(),
            actual: header.format_version.to_string(),
        });
    }
    if header.tool_version != TOOL_VERSION {
        return Err(CacheError::VersionMismatch {
            path: path.to_path_buf(),
            expected: TOOL_VERSION.to_string(),
            actual: header.tool_version,
        });
    }

    let actual = Checksum::of(payload);
    if actual != header.checksum {
        return Err(CacheError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: header.checksum.to_string(),
            actual: actual.to_string(),
        });
    }

    let (record, consumed): (CacheRecord, usize) =
        bincode::serde::decode_from_slice(payload, config).map_err(|e| {
            CacheError::Serialization {
                reason: e.to_string(),
            }
        })?;
    if consumed != payload.len() {
        return Err(CacheError::Serialization {
            reason: format!("{} trailing bytes after cache payload", payload.len() - consumed),
        });
    }
    Ok(record)
}
