//! Service traits/interfaces for the remote protocols.

use async_trait::async_trait;

use crate::error::ClientError;
use crate::types::{BulkFileRecord, ObjectResolution};

/// Low-level service calls - implemented by the HTTP backend and by test
/// doubles.
///
/// Each method performs exactly one request; retry and token-refresh
/// policy lives in the orchestrators built on top of this trait.
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// GET a token endpoint, returning the issued bearer token.
    /// The call is authenticated with `bearer` when one is supplied.
    async fn fetch_token(&self, url: &str, bearer: Option<&str>) -> Result<String, ClientError>;

    /// POST an API key to a token-exchange endpoint, returning the issued
    /// bearer token.
    async fn exchange_api_key(&self, url: &str, api_key: &str) -> Result<String, ClientError>;

    /// GET a signed-URL endpoint with a bearer token, returning the
    /// signed URL.
    async fn fetch_signed_url(&self, url: &str, bearer: &str) -> Result<String, ClientError>;

    /// POST a batch of GUIDs to the bulk metadata service.
    async fn fetch_bulk_metadata(
        &self,
        url: &str,
        guids: &[String],
    ) -> Result<Vec<BulkFileRecord>, ClientError>;

    /// GET an object-resolution document for one external object.
    /// Unauthenticated.
    async fn fetch_object_resolution(&self, url: &str) -> Result<ObjectResolution, ClientError>;

    /// GET bytes from a signed URL, restricted to an inclusive byte range
    /// when one is supplied.
    async fn fetch_bytes(
        &self,
        url: &str,
        range: Option<(u64, u64)>,
    ) -> Result<Vec<u8>, ClientError>;
}
