//! Content access for file nodes.

use async_trait::async_trait;

use guidfs_client::{ClientError, ContentFetcher};

use crate::inode::FileMeta;

/// Resolves signed URLs and reads object bytes for the filesystem layer.
///
/// Implemented by `guidfs_client::ContentFetcher` in production and by
/// doubles in tests.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Resolve a fresh signed URL for one file.
    async fn signed_url(&self, meta: &FileMeta) -> Result<String, ClientError>;

    /// Read the effective byte range `[offset, min(offset + length, size))`
    /// through a signed URL.
    ///
    /// An expired signed URL surfaces as a typed 403 failure; the caller
    /// owns re-resolution.
    async fn read(
        &self,
        signed_url: &str,
        offset: u64,
        length: u64,
        size: u64,
    ) -> Result<Vec<u8>, ClientError>;
}

#[async_trait]
impl ContentSource for ContentFetcher {
    async fn signed_url(&self, meta: &FileMeta) -> Result<String, ClientError> {
        self.resolve_signed_url(
            &meta.guid,
            meta.from_external_host,
            &meta.external_access_urls,
        )
        .await
    }

    async fn read(
        &self,
        signed_url: &str,
        offset: u64,
        length: u64,
        size: u64,
    ) -> Result<Vec<u8>, ClientError> {
        self.read_range(signed_url, offset, length, size).await
    }
}
