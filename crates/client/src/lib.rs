//! Remote-service clients for guidfs.
//!
//! This crate talks to the services behind a mount: the bulk metadata
//! service, per-object external resolution endpoints, the authorization
//! service issuing signed URLs, the token service, and object storage
//! itself. It provides:
//!
//! - `ServiceClient` - the low-level protocol trait, one request per
//!   method, implemented by `HttpServiceClient` and by test doubles
//! - `CredentialManager` - primary and identity-provider bearer tokens
//! - `MetadataResolver` - manifest entries to per-object file records
//! - `ContentFetcher` - signed-URL resolution and ranged byte reads
//!
//! Retry policy lives in the orchestrators: a 401 refreshes the relevant
//! token and retries exactly once; an expired signed URL (403) is
//! surfaced typed so the filesystem layer can re-resolve; everything else
//! fails immediately.

mod config;
mod error;
mod fetch;
mod http;
mod metadata;
mod token;
mod traits;
mod types;

pub use config::ServiceConfig;
pub use error::ClientError;
pub use fetch::ContentFetcher;
pub use http::HttpServiceClient;
pub use metadata::{normalize_commons_host, object_resolution_url, MetadataResolver};
pub use token::{idp_for_url, CredentialManager};
pub use traits::ServiceClient;
pub use types::{AccessMethod, AccessUrl, BulkFileRecord, ObjectResolution};
