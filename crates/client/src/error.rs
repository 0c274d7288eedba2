//! Error types for the service client crate.

use guidfs_common::FetchError;
use thiserror::Error;

/// Errors that can occur while talking to the remote services.
#[derive(Debug, Error, Clone)]
pub enum ClientError {
    /// A service responded non-2xx or the transport failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A response body could not be decoded.
    #[error("failed to decode response from {url}: {message}")]
    Decode {
        /// The URL that produced the undecodable body.
        url: String,
        /// Description of the decode failure.
        message: String,
    },

    /// A token endpoint returned an empty or unusable token.
    #[error("token service at {url} returned no usable token")]
    EmptyToken {
        /// The token endpoint that was called.
        url: String,
    },

    /// An external record lacks the access URLs needed to resolve a
    /// signed URL.
    #[error("object {guid} is from an external host but has no external access URLs")]
    MissingAccessUrls {
        /// The GUID of the record.
        guid: String,
    },
}

impl ClientError {
    /// Whether this failure indicates an expired signed URL (403 from
    /// storage).
    pub fn is_expired_url(&self) -> bool {
        matches!(self, ClientError::Fetch(fetch) if fetch.is_expired_url())
    }

    /// Whether this failure indicates rejected credentials (401).
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Fetch(fetch) if fetch.is_unauthorized())
    }
}
