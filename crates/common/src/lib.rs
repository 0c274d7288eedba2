//! Shared types and utilities for guidfs.
//!
//! This crate provides common functionality used across the guidfs crates:
//! - Manifest and metadata record types
//! - Storage-URL parsing helpers
//! - Shared constants and error types

pub mod constants;
pub mod error;
pub mod object_url;
pub mod record;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::FetchError;
pub use object_url::{guid_segments, is_recognized_url, path_segments_from_urls};
pub use record::{parse_manifest, FileRecord, ManifestEntry};
