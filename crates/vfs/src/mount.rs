//! Mount entry points and mount-time wiring.
//!
//! Mounting is strictly sequential: credentials are acquired, the
//! manifest is resolved into records, and the tree is fully built before
//! the filesystem becomes servable. Failures that indicate systemic
//! problems (bad bulk request, bad credentials) abort the mount;
//! failures scoped to one object never do.

use std::path::Path;
use std::sync::Arc;

use fuser::{BackgroundSession, MountOption};
use tracing::{info, warn};

use guidfs_client::{
    ContentFetcher, CredentialManager, HttpServiceClient, MetadataResolver, ServiceClient,
    ServiceConfig,
};
use guidfs_common::{parse_manifest, ManifestEntry};

use crate::builder::build_from_records;
use crate::error::VfsError;
use crate::fuse::GuidFs;
use crate::inode::InodeTable;
use crate::options::VfsOptions;

impl GuidFs {
    /// Resolve a manifest file and build a servable filesystem.
    ///
    /// # Arguments
    /// * `config` - Remote service endpoints and credentials
    /// * `manifest_path` - Path of the manifest JSON file
    /// * `options` - Mount presentation options
    pub async fn from_manifest(
        config: ServiceConfig,
        manifest_path: &Path,
        options: VfsOptions,
    ) -> Result<GuidFs, VfsError> {
        let text: String = std::fs::read_to_string(manifest_path).map_err(|err| {
            VfsError::MountFailed(format!(
                "failed to read manifest {}: {}",
                manifest_path.display(),
                err
            ))
        })?;
        let entries: Vec<ManifestEntry> = parse_manifest(&text)
            .map_err(|err| VfsError::MountFailed(format!("failed to parse manifest: {}", err)))?;

        let client: Arc<dyn ServiceClient> = Arc::new(HttpServiceClient::new());
        Self::from_entries(client, config, entries, options).await
    }

    /// Build a servable filesystem from parsed manifest entries over an
    /// explicit service backend.
    pub async fn from_entries(
        client: Arc<dyn ServiceClient>,
        config: ServiceConfig,
        entries: Vec<ManifestEntry>,
        options: VfsOptions,
    ) -> Result<GuidFs, VfsError> {
        if entries.is_empty() {
            warn!("no GUIDs were obtained from the manifest");
        }

        let credentials: Arc<CredentialManager> =
            Arc::new(CredentialManager::new(client.clone(), config.clone()));
        credentials.refresh_primary().await.map_err(|err| {
            VfsError::MountFailed(format!("failed to obtain an access token: {}", err))
        })?;

        let resolver = MetadataResolver::new(client.clone(), config.clone());
        let records = resolver
            .resolve(&entries)
            .await
            .map_err(|err| VfsError::MountFailed(format!("metadata resolution failed: {}", err)))?;

        credentials
            .prefetch_external_tokens(entries.iter().filter_map(|e| e.commons_url.as_deref()))
            .await;

        let table: InodeTable = build_from_records(&records);
        info!(
            objects = records.len(),
            nodes = table.len(),
            "resolved manifest into a servable tree"
        );

        let fetcher = Arc::new(ContentFetcher::new(client, config, credentials));
        GuidFs::new(table, fetcher, options)
    }
}

fn mount_options(options: &VfsOptions) -> Vec<MountOption> {
    let mut opts: Vec<MountOption> = vec![
        MountOption::FSName(options.fs_name.clone()),
        MountOption::RO,
        MountOption::AutoUnmount,
    ];
    if options.allow_other {
        opts.push(MountOption::AllowOther);
    }
    opts
}

/// Mount the filesystem and serve until it is unmounted.
///
/// # Arguments
/// * `fs` - The filesystem to mount
/// * `mountpoint` - Path to mount at
pub fn mount(fs: GuidFs, mountpoint: &Path) -> Result<(), VfsError> {
    let opts: Vec<MountOption> = mount_options(fs.options());
    fuser::mount2(fs, mountpoint, &opts).map_err(|err| VfsError::MountFailed(err.to_string()))
}

/// Mount the filesystem in the background.
///
/// # Returns
/// A session handle; dropping it unmounts the filesystem.
pub fn spawn_mount(fs: GuidFs, mountpoint: &Path) -> Result<BackgroundSession, VfsError> {
    let opts: Vec<MountOption> = mount_options(fs.options());
    fuser::spawn_mount2(fs, mountpoint, &opts)
        .map_err(|err| VfsError::MountFailed(err.to_string()))
}
