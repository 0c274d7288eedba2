//! Shared constants used across guidfs crates.

/// Maximum number of GUIDs submitted to the bulk metadata service in one
/// request. Bounds request size and amortizes latency for large manifests.
pub const BULK_METADATA_BATCH_SIZE: usize = 1000;

/// Timeout for small service calls: token acquisition and signed-URL
/// resolution (seconds).
pub const SHORT_CALL_TIMEOUT_SECS: u64 = 10;

/// Timeout for bulk metadata calls (seconds).
/// Generous because one call may describe up to a full batch of files.
pub const BULK_METADATA_TIMEOUT_SECS: u64 = 60;

/// Timeout for per-object external resolution calls (seconds).
pub const OBJECT_RESOLUTION_TIMEOUT_SECS: u64 = 4;

/// Timeout for ranged content downloads (seconds).
/// A single read may move an entire large file range.
pub const CONTENT_FETCH_TIMEOUT_SECS: u64 = 500;

/// Lifetime requested for access tokens (seconds).
pub const TOKEN_LIFETIME_SECS: u64 = 3600;

/// Validity requested for signed URLs (seconds).
pub const SIGNED_URL_EXPIRY_SECS: u64 = 900;
