//! Bearer-token acquisition and refresh.
//!
//! One `CredentialManager` owns every token for a mount session: the
//! primary token used against the commons services, and one token per
//! external identity provider, populated lazily and refreshed
//! independently. Tokens are replaced wholesale under a lock; any valid
//! fresh value is acceptable, so concurrent refreshes simply race and the
//! last writer wins.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::config::ServiceConfig;
use crate::error::ClientError;
use crate::traits::ServiceClient;

/// Known external identity providers, keyed by a hostname fragment.
///
/// A URL matching no fragment proceeds with the primary token and is
/// expected to fail the same way an unrecognized record would.
const EXTERNAL_IDP_TABLE: &[(&str, &str)] = &[
    ("jcoin", "jcoin-google"),
    ("healdata", "externaldata-google"),
];

/// Identity provider responsible for a URL, if any.
pub fn idp_for_url(url: &str) -> Option<&'static str> {
    EXTERNAL_IDP_TABLE
        .iter()
        .find(|(fragment, _)| url.contains(fragment))
        .map(|(_, idp)| *idp)
}

/// Owns and refreshes the bearer tokens for a mount session.
pub struct CredentialManager {
    client: Arc<dyn ServiceClient>,
    config: ServiceConfig,
    /// Primary bearer token for the commons services.
    primary: RwLock<Option<String>>,
    /// Tokens for external hosts, keyed by identity provider name.
    idp_tokens: RwLock<HashMap<String, String>>,
}

impl CredentialManager {
    /// Create a manager with no tokens yet; tokens are fetched on first
    /// use.
    pub fn new(client: Arc<dyn ServiceClient>, config: ServiceConfig) -> Self {
        Self {
            client,
            config,
            primary: RwLock::new(None),
            idp_tokens: RwLock::new(HashMap::new()),
        }
    }

    /// The primary bearer token, fetching it when absent.
    pub async fn primary_token(&self) -> Result<String, ClientError> {
        if let Some(token) = self.primary.read().unwrap().clone() {
            return Ok(token);
        }
        self.refresh_primary().await
    }

    /// Fetch a fresh primary token and replace the cached one.
    ///
    /// When an API key is configured it is exchanged at the authorization
    /// service; otherwise the token service is asked directly,
    /// authenticated with the current token when one exists.
    pub async fn refresh_primary(&self) -> Result<String, ClientError> {
        let token: String = if let Some(api_key) = self.config.api_key.as_deref() {
            let url: String = self.config.api_key_token_url();
            self.client.exchange_api_key(&url, api_key).await?
        } else {
            let url: String = self.config.token_url(None);
            let current: Option<String> = self.primary.read().unwrap().clone();
            let token: String = self.client.fetch_token(&url, current.as_deref()).await?;
            if token.is_empty() {
                return Err(ClientError::EmptyToken { url });
            }
            token
        };

        debug!("refreshed primary access token");
        *self.primary.write().unwrap() = Some(token.clone());
        Ok(token)
    }

    /// The token for one identity provider, fetching it when absent.
    pub async fn idp_token(&self, idp: &str) -> Result<String, ClientError> {
        if let Some(token) = self.idp_tokens.read().unwrap().get(idp).cloned() {
            return Ok(token);
        }
        self.refresh_idp(idp).await
    }

    /// Fetch a fresh token for one identity provider and replace the
    /// cached one.
    pub async fn refresh_idp(&self, idp: &str) -> Result<String, ClientError> {
        let url: String = self.config.token_url(Some(idp));
        let current: Option<String> = self.primary.read().unwrap().clone();
        let token: String = self.client.fetch_token(&url, current.as_deref()).await?;
        if token.is_empty() {
            return Err(ClientError::EmptyToken { url });
        }

        debug!(idp, "refreshed identity-provider token");
        self.idp_tokens
            .write()
            .unwrap()
            .insert(idp.to_string(), token.clone());
        Ok(token)
    }

    /// Eagerly fetch tokens for every identity provider responsible for
    /// one of the given external hostnames.
    ///
    /// Failures are logged and skipped; the token is fetched again on
    /// first use.
    pub async fn prefetch_external_tokens<'a>(
        &self,
        hostnames: impl IntoIterator<Item = &'a str>,
    ) {
        let mut idps: Vec<&str> = hostnames
            .into_iter()
            .filter_map(idp_for_url)
            .collect();
        idps.sort_unstable();
        idps.dedup();

        for idp in idps {
            if let Err(err) = self.refresh_idp(idp).await {
                warn!(idp, error = %err, "failed to prefetch identity-provider token");
            }
        }
    }
}
