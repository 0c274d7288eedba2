//! HTTP implementation of the service protocols.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, RANGE};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

use guidfs_common::{
    FetchError, BULK_METADATA_TIMEOUT_SECS, CONTENT_FETCH_TIMEOUT_SECS,
    OBJECT_RESOLUTION_TIMEOUT_SECS, SHORT_CALL_TIMEOUT_SECS,
};

use crate::error::ClientError;
use crate::traits::ServiceClient;
use crate::types::{BulkFileRecord, ObjectResolution};

/// Token-endpoint response body.
#[derive(Debug, Deserialize)]
struct TokenReply {
    #[serde(default)]
    token: String,
}

/// API-key exchange response body.
#[derive(Debug, Deserialize)]
struct ApiKeyTokenReply {
    #[serde(default)]
    access_token: String,
}

/// Signed-URL endpoint response body.
#[derive(Debug, Deserialize)]
struct SignedUrlReply {
    #[serde(default)]
    url: String,
}

/// `ServiceClient` implementation over plain HTTP/JSON.
///
/// One shared connection pool serves every service; timeouts are applied
/// per call class (short for token and signed-URL calls, long for bulk
/// metadata, very long for content downloads).
#[derive(Debug, Clone, Default)]
pub struct HttpServiceClient {
    http: reqwest::Client,
}

impl HttpServiceClient {
    /// Create a new HTTP service client.
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

/// Map a transport-level failure into the shared fetch error.
fn transport_error(url: &str, err: reqwest::Error) -> ClientError {
    FetchError::network(url, err.to_string()).into()
}

/// Pass 2xx responses through; log the body of anything else and surface
/// the status as a typed failure.
async fn require_success(response: Response) -> Result<Response, ClientError> {
    let status: u16 = response.status().as_u16();
    if response.status().is_success() {
        return Ok(response);
    }

    let url: String = response.url().to_string();
    let body: String = response.text().await.unwrap_or_default();
    warn!(%url, status, %body, "service call failed");
    Err(FetchError::api(status, url).into())
}

/// Decode a JSON response body.
async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let url: String = response.url().to_string();
    response
        .json::<T>()
        .await
        .map_err(|err| ClientError::Decode {
            url,
            message: err.to_string(),
        })
}

#[async_trait]
impl ServiceClient for HttpServiceClient {
    async fn fetch_token(&self, url: &str, bearer: Option<&str>) -> Result<String, ClientError> {
        let mut request = self
            .http
            .get(url)
            .timeout(Duration::from_secs(SHORT_CALL_TIMEOUT_SECS))
            .header(ACCEPT, "application/json");
        if let Some(bearer) = bearer {
            request = request.bearer_auth(bearer);
        }

        let response = request.send().await.map_err(|e| transport_error(url, e))?;
        let reply: TokenReply = decode_json(require_success(response).await?).await?;
        Ok(reply.token)
    }

    async fn exchange_api_key(&self, url: &str, api_key: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .post(url)
            .timeout(Duration::from_secs(SHORT_CALL_TIMEOUT_SECS))
            .json(&serde_json::json!({ "api_key": api_key }))
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;
        let reply: ApiKeyTokenReply = decode_json(require_success(response).await?).await?;
        Ok(reply.access_token)
    }

    async fn fetch_signed_url(&self, url: &str, bearer: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .get(url)
            .timeout(Duration::from_secs(SHORT_CALL_TIMEOUT_SECS))
            .bearer_auth(bearer)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;
        let reply: SignedUrlReply = decode_json(require_success(response).await?).await?;
        Ok(reply.url)
    }

    async fn fetch_bulk_metadata(
        &self,
        url: &str,
        guids: &[String],
    ) -> Result<Vec<BulkFileRecord>, ClientError> {
        let response = self
            .http
            .post(url)
            .timeout(Duration::from_secs(BULK_METADATA_TIMEOUT_SECS))
            .json(&guids)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;
        decode_json(require_success(response).await?).await
    }

    async fn fetch_object_resolution(&self, url: &str) -> Result<ObjectResolution, ClientError> {
        let response = self
            .http
            .get(url)
            .timeout(Duration::from_secs(OBJECT_RESOLUTION_TIMEOUT_SECS))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;
        decode_json(require_success(response).await?).await
    }

    async fn fetch_bytes(
        &self,
        url: &str,
        range: Option<(u64, u64)>,
    ) -> Result<Vec<u8>, ClientError> {
        let mut request = self
            .http
            .get(url)
            .timeout(Duration::from_secs(CONTENT_FETCH_TIMEOUT_SECS));
        if let Some((start, end)) = range {
            request = request.header(RANGE, format!("bytes={}-{}", start, end));
        }

        let response = request.send().await.map_err(|e| transport_error(url, e))?;
        let response = require_success(response).await?;
        let url: String = response.url().to_string();
        let body = response
            .bytes()
            .await
            .map_err(|err| transport_error(&url, err))?;
        Ok(body.to_vec())
    }
}
