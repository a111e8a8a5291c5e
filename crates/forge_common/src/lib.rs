//! Shared foundational types used across the forge content pipeline.
//!
//! This crate provides the opaque build identifier stamped on every build
//! session and the payload checksum used to validate persisted cache files.

#![warn(missing_docs)]

pub mod build_id;
pub mod checksum;

pub use build_id::{BuildId, ParseBuildIdError};
pub use checksum::Checksum;
