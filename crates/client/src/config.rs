//! Configuration for the remote services.
//!
//! An explicit configuration object is passed to each component
//! constructor; there is no process-wide configuration state.

use guidfs_common::{SIGNED_URL_EXPIRY_SECS, TOKEN_LIFETIME_SECS};
use serde::{Deserialize, Serialize};

/// Endpoints and authentication material for the remote services.
///
/// # Example
///
/// ```ignore
/// let config = ServiceConfig::default()
///     .with_hostname("https://data.example.org")
///     .with_token_service_url("http://localhost:8001");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the commons hosting the metadata and authorization
    /// services, e.g. `https://data.example.org`.
    pub hostname: String,

    /// Base URL of the token service.
    pub token_service_url: String,

    /// Path of the token endpoint on the token service.
    pub access_token_path: String,

    /// Path of the signed-URL endpoint on the authorization service.
    pub signed_url_path: String,

    /// Path of the bulk endpoint on the metadata service.
    pub bulk_metadata_path: String,

    /// Path of the API-key exchange endpoint on the authorization service.
    pub api_key_token_path: String,

    /// API key used to obtain the primary token instead of the token
    /// service. Takes precedence when set.
    pub api_key: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            token_service_url: String::new(),
            access_token_path: "/token".to_string(),
            signed_url_path: "/user/data/download".to_string(),
            bulk_metadata_path: "/index/bulk/documents".to_string(),
            api_key_token_path: "/user/credentials/api/access_token".to_string(),
            api_key: None,
        }
    }
}

impl ServiceConfig {
    /// Set the commons base URL.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Set the token service base URL.
    pub fn with_token_service_url(mut self, url: impl Into<String>) -> Self {
        self.token_service_url = url.into();
        self
    }

    /// Set the API key used for primary-token acquisition.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Full URL of the token endpoint, optionally scoped to an identity
    /// provider.
    pub fn token_url(&self, idp: Option<&str>) -> String {
        let mut url: String = format!(
            "{}{}?expires={}",
            self.token_service_url, self.access_token_path, TOKEN_LIFETIME_SECS
        );
        if let Some(idp) = idp {
            url.push_str(&format!("&idp={}", idp));
        }
        url
    }

    /// Full URL of the API-key exchange endpoint.
    pub fn api_key_token_url(&self) -> String {
        format!("{}{}", self.hostname, self.api_key_token_path)
    }

    /// Full URL of the signed-URL endpoint for one GUID.
    pub fn signed_url_endpoint(&self, guid: &str) -> String {
        format!(
            "{}{}/{}?expires_in={}",
            self.hostname, self.signed_url_path, guid, SIGNED_URL_EXPIRY_SECS
        )
    }

    /// Full URL of the bulk metadata endpoint.
    pub fn bulk_metadata_url(&self) -> String {
        format!("{}{}", self.hostname, self.bulk_metadata_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServiceConfig {
        ServiceConfig::default()
            .with_hostname("https://data.example.org")
            .with_token_service_url("http://localhost:8001")
    }

    #[test]
    fn test_token_url() {
        assert_eq!(
            config().token_url(None),
            "http://localhost:8001/token?expires=3600"
        );
        assert_eq!(
            config().token_url(Some("partner-google")),
            "http://localhost:8001/token?expires=3600&idp=partner-google"
        );
    }

    #[test]
    fn test_signed_url_endpoint() {
        assert_eq!(
            config().signed_url_endpoint("g1"),
            "https://data.example.org/user/data/download/g1?expires_in=900"
        );
    }

    #[test]
    fn test_service_urls() {
        assert_eq!(
            config().bulk_metadata_url(),
            "https://data.example.org/index/bulk/documents"
        );
        assert_eq!(
            config().api_key_token_url(),
            "https://data.example.org/user/credentials/api/access_token"
        );
    }

    #[test]
    fn test_api_key_precedence_flag() {
        let config: ServiceConfig = config().with_api_key("k-123");
        assert_eq!(config.api_key.as_deref(), Some("k-123"));
    }
}
