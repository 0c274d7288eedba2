//! Shared error types used across guidfs crates.

use thiserror::Error;

/// A remote call that did not yield a usable response.
///
/// Carries the status code and target URL so callers can distinguish
/// failure classes (an expired signed URL rejects with 403) without
/// re-parsing error text.
#[derive(Debug, Error, Clone)]
pub enum FetchError {
    /// Non-2xx status from a service or storage backend.
    #[error("failed to fetch {url}: status code {status}")]
    Api {
        /// HTTP status code of the response.
        status: u16,
        /// The URL that was requested.
        url: String,
    },

    /// Network-level failure before any status was received.
    #[error("network error for {url}: {message}")]
    Network {
        /// The URL that was requested.
        url: String,
        /// Description of the transport failure.
        message: String,
    },
}

impl FetchError {
    /// Create an `Api` error from a status code and URL.
    pub fn api(status: u16, url: impl Into<String>) -> Self {
        Self::Api {
            status,
            url: url.into(),
        }
    }

    /// Create a `Network` error from a URL and message.
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Whether this failure indicates an expired signed URL.
    ///
    /// Storage backends reject stale signed URLs with 403; the read path
    /// recovers by re-resolving the URL once.
    pub fn is_expired_url(&self) -> bool {
        matches!(self, FetchError::Api { status: 403, .. })
    }

    /// Whether this failure indicates rejected credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, FetchError::Api { status: 401, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_url_is_403_only() {
        assert!(FetchError::api(403, "https://bucket/key").is_expired_url());
        assert!(!FetchError::api(401, "https://bucket/key").is_expired_url());
        assert!(!FetchError::network("https://bucket/key", "refused").is_expired_url());
    }

    #[test]
    fn test_unauthorized_is_401_only() {
        assert!(FetchError::api(401, "https://example.org/token").is_unauthorized());
        assert!(!FetchError::api(403, "https://example.org/token").is_unauthorized());
    }

    #[test]
    fn test_display_carries_status_and_url() {
        let err: FetchError = FetchError::api(503, "https://example.org/data");
        assert_eq!(
            err.to_string(),
            "failed to fetch https://example.org/data: status code 503"
        );
    }
}
