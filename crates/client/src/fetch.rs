//! Signed-URL resolution and ranged content fetch.
//!
//! Two resolution paths exist, selected by where a record's metadata came
//! from: the default path asks the commons authorization service, the
//! external path asks the object's own access endpoint with an
//! identity-provider-scoped token. Both recover from a single 401 by
//! refreshing the relevant token and retrying exactly once.
//!
//! The ranged fetch itself never retries: an expired signed URL (403)
//! surfaces as a typed failure so the filesystem layer can re-resolve.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::ServiceConfig;
use crate::error::ClientError;
use crate::token::{idp_for_url, CredentialManager};
use crate::traits::ServiceClient;

/// Resolves signed URLs and reads byte ranges through them.
pub struct ContentFetcher {
    client: Arc<dyn ServiceClient>,
    config: ServiceConfig,
    credentials: Arc<CredentialManager>,
}

impl ContentFetcher {
    /// Create a fetcher over the given backend and credentials.
    pub fn new(
        client: Arc<dyn ServiceClient>,
        config: ServiceConfig,
        credentials: Arc<CredentialManager>,
    ) -> Self {
        Self {
            client,
            config,
            credentials,
        }
    }

    /// Resolve a signed URL for one object.
    ///
    /// # Arguments
    /// * `guid` - The object GUID
    /// * `from_external_host` - Selects the external resolution path
    /// * `external_access_urls` - Access endpoints for the external path
    pub async fn resolve_signed_url(
        &self,
        guid: &str,
        from_external_host: bool,
        external_access_urls: &[String],
    ) -> Result<String, ClientError> {
        if from_external_host {
            self.resolve_external(guid, external_access_urls).await
        } else {
            self.resolve_default(guid).await
        }
    }

    /// Default path: the commons authorization service, primary token.
    async fn resolve_default(&self, guid: &str) -> Result<String, ClientError> {
        let endpoint: String = self.config.signed_url_endpoint(guid);
        let token: String = self.credentials.primary_token().await?;

        match self.client.fetch_signed_url(&endpoint, &token).await {
            Ok(url) => ensure_signed_url(&endpoint, url),
            Err(err) if err.is_unauthorized() => {
                debug!(guid, "authorization service rejected the token, retrying once");
                let token: String = self.credentials.refresh_primary().await?;
                let url: String = self.client.fetch_signed_url(&endpoint, &token).await?;
                ensure_signed_url(&endpoint, url)
            }
            Err(err) => Err(err),
        }
    }

    /// External path: the object's own access endpoint, IDP-scoped token.
    async fn resolve_external(
        &self,
        guid: &str,
        access_urls: &[String],
    ) -> Result<String, ClientError> {
        let endpoint: &str = access_urls
            .first()
            .map(String::as_str)
            .ok_or_else(|| ClientError::MissingAccessUrls {
                guid: guid.to_string(),
            })?;

        let idp: Option<&str> = idp_for_url(endpoint);
        if idp.is_none() {
            warn!(guid, url = %endpoint, "no identity provider matches this access URL");
        }
        let token: String = match idp {
            Some(idp) => self.credentials.idp_token(idp).await?,
            None => self.credentials.primary_token().await?,
        };

        match self.client.fetch_signed_url(endpoint, &token).await {
            Ok(url) => ensure_signed_url(endpoint, url),
            Err(err) if err.is_unauthorized() => {
                debug!(guid, "external access endpoint rejected the token, retrying once");
                let token: String = match idp {
                    Some(idp) => self.credentials.refresh_idp(idp).await?,
                    None => self.credentials.refresh_primary().await?,
                };
                let url: String = self.client.fetch_signed_url(endpoint, &token).await?;
                ensure_signed_url(endpoint, url)
            }
            Err(err) => Err(err),
        }
    }

    /// Read the effective byte range `[offset, min(offset + length, size))`
    /// through a signed URL.
    ///
    /// An empty effective range returns zero bytes without a network call.
    /// A 403 from storage surfaces as a typed expired-URL failure; the
    /// caller owns re-resolution.
    pub async fn read_range(
        &self,
        signed_url: &str,
        offset: u64,
        length: u64,
        size: u64,
    ) -> Result<Vec<u8>, ClientError> {
        let end: u64 = offset.saturating_add(length).min(size);
        if offset >= end {
            return Ok(Vec::new());
        }

        let mut body: Vec<u8> = self
            .client
            .fetch_bytes(signed_url, Some((offset, end - 1)))
            .await?;
        body.truncate((end - offset) as usize);
        Ok(body)
    }
}

/// Reject empty signed-URL responses.
fn ensure_signed_url(endpoint: &str, url: String) -> Result<String, ClientError> {
    if url.is_empty() {
        return Err(ClientError::Decode {
            url: endpoint.to_string(),
            message: "response contained no signed url".to_string(),
        });
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use std::sync::Mutex;

    use guidfs_common::FetchError;

    use crate::types::{BulkFileRecord, ObjectResolution};

    /// `ServiceClient` double scripting the authorization and storage
    /// protocols.
    #[derive(Default)]
    struct StubAuthService {
        /// Replies for successive signed-URL calls.
        signed_replies: Mutex<Vec<Result<String, ClientError>>>,
        /// Bearer tokens seen by signed-URL calls.
        signed_bearers: Mutex<Vec<String>>,
        /// Token endpoint URLs seen.
        token_calls: Mutex<Vec<String>>,
        /// Content of the remote object served by `fetch_bytes`.
        content: Vec<u8>,
        /// Ranges requested from `fetch_bytes`.
        ranges: Mutex<Vec<Option<(u64, u64)>>>,
    }

    impl StubAuthService {
        fn with_signed_replies(replies: Vec<Result<String, ClientError>>) -> Arc<Self> {
            Arc::new(Self {
                signed_replies: Mutex::new(replies),
                ..Default::default()
            })
        }
    }

    #[async_trait]
    impl ServiceClient for StubAuthService {
        async fn fetch_token(
            &self,
            url: &str,
            _bearer: Option<&str>,
        ) -> Result<String, ClientError> {
            let calls: usize = {
                let mut token_calls = self.token_calls.lock().unwrap();
                token_calls.push(url.to_string());
                token_calls.len()
            };
            Ok(format!("tok-{}", calls))
        }

        async fn exchange_api_key(
            &self,
            _url: &str,
            _api_key: &str,
        ) -> Result<String, ClientError> {
            unimplemented!("not used by fetch tests")
        }

        async fn fetch_signed_url(&self, _url: &str, bearer: &str) -> Result<String, ClientError> {
            self.signed_bearers.lock().unwrap().push(bearer.to_string());
            self.signed_replies.lock().unwrap().remove(0)
        }

        async fn fetch_bulk_metadata(
            &self,
            _url: &str,
            _guids: &[String],
        ) -> Result<Vec<BulkFileRecord>, ClientError> {
            unimplemented!("not used by fetch tests")
        }

        async fn fetch_object_resolution(
            &self,
            _url: &str,
        ) -> Result<ObjectResolution, ClientError> {
            unimplemented!("not used by fetch tests")
        }

        async fn fetch_bytes(
            &self,
            url: &str,
            range: Option<(u64, u64)>,
        ) -> Result<Vec<u8>, ClientError> {
            if url == "expired" {
                return Err(FetchError::api(403, url).into());
            }
            self.ranges.lock().unwrap().push(range);
            match range {
                Some((start, end)) => {
                    let end: usize = (end as usize + 1).min(self.content.len());
                    Ok(self.content[start as usize..end].to_vec())
                }
                None => Ok(self.content.clone()),
            }
        }
    }

    fn fetcher(stub: Arc<StubAuthService>) -> ContentFetcher {
        let config = ServiceConfig::default()
            .with_hostname("https://data.example.org")
            .with_token_service_url("http://localhost:8001");
        let credentials = Arc::new(CredentialManager::new(stub.clone(), config.clone()));
        ContentFetcher::new(stub, config, credentials)
    }

    #[tokio::test]
    async fn test_signed_url_happy_path() {
        let stub = StubAuthService::with_signed_replies(vec![Ok("https://signed/1".into())]);
        let url = fetcher(stub.clone())
            .resolve_signed_url("g1", false, &[])
            .await
            .unwrap();

        assert_eq!(url, "https://signed/1");
        assert_eq!(stub.signed_bearers.lock().unwrap().len(), 1);
        // Exactly one token acquisition, no refresh.
        assert_eq!(stub.token_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_401_refreshes_token_and_retries_once() {
        let stub = StubAuthService::with_signed_replies(vec![
            Err(FetchError::api(401, "https://auth/g1").into()),
            Ok("https://signed/2".into()),
        ]);
        let url = fetcher(stub.clone())
            .resolve_signed_url("g1", false, &[])
            .await
            .unwrap();

        assert_eq!(url, "https://signed/2");
        let bearers = stub.signed_bearers.lock().unwrap().clone();
        assert_eq!(bearers, vec!["tok-1", "tok-2"]);
    }

    #[tokio::test]
    async fn test_second_401_surfaces_as_error() {
        let stub = StubAuthService::with_signed_replies(vec![
            Err(FetchError::api(401, "https://auth/g1").into()),
            Err(FetchError::api(401, "https://auth/g1").into()),
        ]);
        let result = fetcher(stub.clone())
            .resolve_signed_url("g1", false, &[])
            .await;

        assert!(matches!(result, Err(ref err) if err.is_unauthorized()));
        // One retry, never a third attempt.
        assert_eq!(stub.signed_bearers.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_non_401_fails_without_retry() {
        let stub = StubAuthService::with_signed_replies(vec![Err(FetchError::api(
            500,
            "https://auth/g1",
        )
        .into())]);
        let result = fetcher(stub.clone())
            .resolve_signed_url("g1", false, &[])
            .await;

        assert!(result.is_err());
        assert_eq!(stub.signed_bearers.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_external_path_uses_idp_token() {
        let stub = StubAuthService::with_signed_replies(vec![
            Err(FetchError::api(401, "https://jcoin.example.org/access").into()),
            Ok("https://signed/ext".into()),
        ]);
        let access = vec!["https://jcoin.example.org/objects/g1/access/s3".to_string()];
        let url = fetcher(stub.clone())
            .resolve_signed_url("g1", true, &access)
            .await
            .unwrap();

        assert_eq!(url, "https://signed/ext");
        let token_calls = stub.token_calls.lock().unwrap().clone();
        assert_eq!(token_calls.len(), 2);
        assert!(token_calls.iter().all(|u| u.contains("idp=jcoin-google")));
    }

    #[tokio::test]
    async fn test_external_path_requires_access_urls() {
        let stub = StubAuthService::with_signed_replies(Vec::new());
        let result = fetcher(stub).resolve_signed_url("g1", true, &[]).await;
        assert!(matches!(
            result,
            Err(ClientError::MissingAccessUrls { ref guid }) if guid == "g1"
        ));
    }

    #[tokio::test]
    async fn test_empty_signed_url_is_an_error() {
        let stub = StubAuthService::with_signed_replies(vec![Ok(String::new())]);
        let result = fetcher(stub).resolve_signed_url("g1", false, &[]).await;
        assert!(matches!(result, Err(ClientError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_read_range_clamps_to_size() {
        let stub = Arc::new(StubAuthService {
            content: (0u8..100).collect(),
            ..Default::default()
        });

        // offset + length beyond size: exactly size - offset bytes.
        let body = fetcher(stub.clone())
            .read_range("https://signed/1", 90, 50, 100)
            .await
            .unwrap();
        assert_eq!(body, (90u8..100).collect::<Vec<u8>>());
        assert_eq!(*stub.ranges.lock().unwrap(), vec![Some((90, 99))]);
    }

    #[tokio::test]
    async fn test_read_past_end_returns_empty_without_fetching() {
        let stub = Arc::new(StubAuthService {
            content: (0u8..100).collect(),
            ..Default::default()
        });

        let body = fetcher(stub.clone())
            .read_range("https://signed/1", 100, 10, 100)
            .await
            .unwrap();
        assert!(body.is_empty());
        assert!(stub.ranges.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_range_passes_403_through_typed() {
        let stub = Arc::new(StubAuthService::default());
        let result = fetcher(stub).read_range("expired", 0, 10, 100).await;
        assert!(matches!(result, Err(ref err) if err.is_expired_url()));
    }
}
