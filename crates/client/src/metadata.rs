//! Metadata resolution: manifest entries in, file records out.
//!
//! GUIDs are partitioned between the bulk metadata service (batched) and
//! per-GUID object resolution against each entry's own external commons
//! host. A failure scoped to one object drops that object with a warning;
//! a failure of a bulk call aborts resolution, since it signals a
//! systemic auth or configuration problem.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::warn;

use guidfs_common::{path_segments_from_urls, FileRecord, ManifestEntry, BULK_METADATA_BATCH_SIZE};

use crate::config::ServiceConfig;
use crate::error::ClientError;
use crate::traits::ServiceClient;

/// Object-resolution endpoint path on an external commons host.
const OBJECT_RESOLUTION_PATH: &str = "ga4gh/drs/v1/objects/";

/// Access-method type recognized in object-resolution documents.
const STORAGE_ACCESS_METHOD: &str = "s3";

/// Concurrent in-flight external resolutions.
const EXTERNAL_RESOLUTION_CONCURRENCY: usize = 10;

/// Normalize a manifest commons hostname into a base URL.
///
/// Prepends `https://` when no scheme is present and guarantees exactly
/// one trailing slash.
pub fn normalize_commons_host(host: &str) -> String {
    let mut base: String = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };
    if !base.ends_with('/') {
        base.push('/');
    }
    base
}

/// Object-resolution URL for one GUID on one commons host.
pub fn object_resolution_url(host: &str, guid: &str) -> String {
    format!("{}{}{}", normalize_commons_host(host), OBJECT_RESOLUTION_PATH, guid)
}

/// Resolves manifest entries into per-object file records.
pub struct MetadataResolver {
    client: Arc<dyn ServiceClient>,
    config: ServiceConfig,
}

impl MetadataResolver {
    /// Create a resolver over the given service backend.
    pub fn new(client: Arc<dyn ServiceClient>, config: ServiceConfig) -> Self {
        Self { client, config }
    }

    /// Resolve every manifest entry, returning records keyed by GUID.
    ///
    /// The returned map is ordered so downstream tree construction is
    /// deterministic. Objects that cannot be resolved individually are
    /// absent from the map; they never fail the call.
    ///
    /// # Errors
    /// Returns an error when a bulk metadata call fails.
    pub async fn resolve(
        &self,
        entries: &[ManifestEntry],
    ) -> Result<BTreeMap<String, FileRecord>, ClientError> {
        let mut internal: Vec<String> = Vec::new();
        let mut external: Vec<(String, String)> = Vec::new();
        for entry in entries {
            match entry.commons_url.as_deref() {
                Some(host) => external.push((entry.object_id.clone(), host.to_string())),
                None => internal.push(entry.object_id.clone()),
            }
        }

        let mut records: BTreeMap<String, FileRecord> = BTreeMap::new();

        for batch in internal.chunks(BULK_METADATA_BATCH_SIZE) {
            let url: String = self.config.bulk_metadata_url();
            for bulk in self.client.fetch_bulk_metadata(&url, batch).await? {
                if bulk.did.is_empty() {
                    warn!("bulk metadata record without a did; ignoring it");
                    continue;
                }
                if bulk.urls.is_empty() {
                    warn!(
                        guid = %bulk.did,
                        "metadata record has no file associated with it; ignoring it"
                    );
                    continue;
                }
                let filename: Option<String> =
                    Some(bulk.file_name).filter(|name| !name.is_empty());
                records.insert(
                    bulk.did.clone(),
                    FileRecord {
                        guid: bulk.did,
                        filename,
                        size: bulk.size,
                        urls: bulk.urls,
                        from_external_host: false,
                        external_access_urls: Vec::new(),
                    },
                );
            }
        }

        for guid in &internal {
            if !records.contains_key(guid) {
                warn!(%guid, "no metadata returned for manifest entry");
            }
        }

        let resolved: Vec<Option<FileRecord>> = stream::iter(external)
            .map(|(guid, host)| self.resolve_external(guid, host))
            .buffer_unordered(EXTERNAL_RESOLUTION_CONCURRENCY)
            .collect()
            .await;
        for record in resolved.into_iter().flatten() {
            records.insert(record.guid.clone(), record);
        }

        Ok(records)
    }

    /// Resolve one external object; any failure drops the object.
    async fn resolve_external(&self, guid: String, host: String) -> Option<FileRecord> {
        let url: String = object_resolution_url(&host, &guid);
        let doc = match self.client.fetch_object_resolution(&url).await {
            Ok(doc) => doc,
            Err(err) => {
                warn!(%guid, %url, error = %err, "failed to resolve external object");
                return None;
            }
        };

        // Only the first access method is consulted.
        let method = match doc.access_methods.into_iter().next() {
            Some(method) => method,
            None => {
                warn!(%guid, "object resolution carries no access methods");
                return None;
            }
        };
        if method.kind != STORAGE_ACCESS_METHOD {
            warn!(
                %guid,
                kind = %method.kind,
                "unrecognized access method in object resolution"
            );
            return None;
        }

        let access_url: Option<String> = method.access_url.map(|a| a.url);
        let filename: Option<String> = doc
            .name
            .filter(|name| !name.is_empty())
            .or_else(|| {
                let access_url: &str = access_url.as_deref()?;
                let segments: Vec<String> =
                    path_segments_from_urls(&[access_url.to_string()])?;
                Some(segments.join("_"))
            });
        let filename: String = match filename {
            Some(name) => name,
            None => {
                warn!(%guid, "external object has no usable display name");
                return None;
            }
        };

        let urls: Vec<String> = vec![format!("{}/access/{}", url, STORAGE_ACCESS_METHOD)];
        Some(FileRecord {
            guid,
            filename: Some(filename),
            size: doc.size.unwrap_or(0),
            urls: urls.clone(),
            from_external_host: true,
            external_access_urls: urls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use std::sync::Mutex;

    use guidfs_common::FetchError;

    use crate::types::{BulkFileRecord, ObjectResolution};

    /// `ServiceClient` double answering metadata calls from a script.
    #[derive(Default)]
    struct StubMetadataService {
        bulk_batches: Mutex<Vec<Vec<String>>>,
        bulk_fails: bool,
        resolutions: Mutex<Vec<(String, Result<ObjectResolution, ClientError>)>>,
    }

    impl StubMetadataService {
        fn batch_sizes(&self) -> Vec<usize> {
            self.bulk_batches.lock().unwrap().iter().map(Vec::len).collect()
        }

        fn push_resolution(&self, url_suffix: &str, doc: ObjectResolution) {
            self.resolutions
                .lock()
                .unwrap()
                .push((url_suffix.to_string(), Ok(doc)));
        }
    }

    #[async_trait]
    impl ServiceClient for StubMetadataService {
        async fn fetch_token(
            &self,
            _url: &str,
            _bearer: Option<&str>,
        ) -> Result<String, ClientError> {
            unimplemented!("not used by metadata tests")
        }

        async fn exchange_api_key(
            &self,
            _url: &str,
            _api_key: &str,
        ) -> Result<String, ClientError> {
            unimplemented!("not used by metadata tests")
        }

        async fn fetch_signed_url(&self, _url: &str, _bearer: &str) -> Result<String, ClientError> {
            unimplemented!("not used by metadata tests")
        }

        async fn fetch_bulk_metadata(
            &self,
            url: &str,
            guids: &[String],
        ) -> Result<Vec<BulkFileRecord>, ClientError> {
            if self.bulk_fails {
                return Err(FetchError::api(401, url).into());
            }
            self.bulk_batches.lock().unwrap().push(guids.to_vec());
            Ok(guids
                .iter()
                .filter(|guid| !guid.starts_with("missing"))
                .map(|guid| BulkFileRecord {
                    file_name: String::new(),
                    size: 42,
                    did: guid.clone(),
                    urls: if guid.starts_with("urlless") {
                        Vec::new()
                    } else {
                        vec![format!("s3://bucket/dir/{}.bin", guid)]
                    },
                })
                .collect())
        }

        async fn fetch_object_resolution(
            &self,
            url: &str,
        ) -> Result<ObjectResolution, ClientError> {
            let scripted = self
                .resolutions
                .lock()
                .unwrap()
                .iter()
                .find(|(suffix, _)| url.ends_with(suffix))
                .map(|(_, reply)| reply.clone());
            match scripted {
                Some(reply) => reply,
                None => Err(FetchError::api(404, url).into()),
            }
        }

        async fn fetch_bytes(
            &self,
            _url: &str,
            _range: Option<(u64, u64)>,
        ) -> Result<Vec<u8>, ClientError> {
            unimplemented!("not used by metadata tests")
        }
    }

    fn resolver(stub: Arc<StubMetadataService>) -> MetadataResolver {
        let config = ServiceConfig::default().with_hostname("https://data.example.org");
        MetadataResolver::new(stub, config)
    }

    fn object_doc(name: Option<&str>, kind: &str, access_url: Option<&str>) -> ObjectResolution {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "size": 7,
            "access_methods": [{
                "type": kind,
                "access_url": access_url.map(|u| serde_json::json!({"url": u})),
            }],
        }))
        .unwrap()
    }

    #[test]
    fn test_normalize_commons_host() {
        assert_eq!(
            normalize_commons_host("external.example.org"),
            "https://external.example.org/"
        );
        assert_eq!(
            normalize_commons_host("https://external.example.org/"),
            "https://external.example.org/"
        );
        assert_eq!(
            normalize_commons_host("http://external.example.org"),
            "http://external.example.org/"
        );
    }

    #[test]
    fn test_object_resolution_url() {
        assert_eq!(
            object_resolution_url("external.example.org", "g1"),
            "https://external.example.org/ga4gh/drs/v1/objects/g1"
        );
    }

    #[tokio::test]
    async fn test_bulk_resolution_batches_by_1000() {
        let stub = Arc::new(StubMetadataService::default());
        let entries: Vec<ManifestEntry> = (0..2500)
            .map(|i| ManifestEntry::internal(format!("g{:04}", i)))
            .collect();

        let records = resolver(stub.clone()).resolve(&entries).await.unwrap();

        assert_eq!(stub.batch_sizes(), vec![1000, 1000, 500]);
        assert_eq!(records.len(), 2500);
        let record = &records["g0000"];
        assert_eq!(record.size, 42);
        assert_eq!(record.urls, vec!["s3://bucket/dir/g0000.bin"]);
        assert!(!record.from_external_host);
    }

    #[tokio::test]
    async fn test_bulk_failure_aborts_resolution() {
        let stub = Arc::new(StubMetadataService {
            bulk_fails: true,
            ..Default::default()
        });
        let entries = vec![ManifestEntry::internal("g1")];

        let result = resolver(stub).resolve(&entries).await;
        assert!(matches!(result, Err(ref err) if err.is_unauthorized()));
    }

    #[tokio::test]
    async fn test_unresolvable_objects_are_dropped_not_fatal() {
        let stub = Arc::new(StubMetadataService::default());
        let entries = vec![
            ManifestEntry::internal("g1"),
            ManifestEntry::internal("missing-g2"),
            ManifestEntry::internal("urlless-g3"),
            // External entry with no scripted resolution: 404, skipped.
            ManifestEntry::external("g4", "external.example.org"),
        ];

        let records = resolver(stub).resolve(&entries).await.unwrap();
        assert_eq!(records.keys().collect::<Vec<_>>(), vec!["g1"]);
    }

    #[tokio::test]
    async fn test_external_resolution_builds_access_urls() {
        let stub = Arc::new(StubMetadataService::default());
        stub.push_resolution(
            "/objects/g-ext",
            object_doc(Some("reads.bam"), "s3", Some("s3://bucket/reads.bam")),
        );
        let entries = vec![ManifestEntry::external("g-ext", "external.example.org")];

        let records = resolver(stub).resolve(&entries).await.unwrap();
        let record = &records["g-ext"];
        assert_eq!(record.filename.as_deref(), Some("reads.bam"));
        assert_eq!(record.size, 7);
        assert!(record.from_external_host);
        let expected =
            "https://external.example.org/ga4gh/drs/v1/objects/g-ext/access/s3";
        assert_eq!(record.urls, vec![expected]);
        assert_eq!(record.external_access_urls, vec![expected]);
    }

    #[tokio::test]
    async fn test_external_name_falls_back_to_access_url_path() {
        let stub = Arc::new(StubMetadataService::default());
        stub.push_resolution(
            "/objects/g-ext",
            object_doc(None, "s3", Some("s3://bucket/dir/reads.bam")),
        );
        let entries = vec![ManifestEntry::external("g-ext", "external.example.org")];

        let records = resolver(stub).resolve(&entries).await.unwrap();
        assert_eq!(
            records["g-ext"].filename.as_deref(),
            Some("dir_reads.bam")
        );
    }

    #[tokio::test]
    async fn test_unrecognized_access_method_drops_object() {
        let stub = Arc::new(StubMetadataService::default());
        stub.push_resolution(
            "/objects/g-ext",
            object_doc(Some("reads.bam"), "gs", Some("gs://bucket/reads.bam")),
        );
        let entries = vec![ManifestEntry::external("g-ext", "external.example.org")];

        let records = resolver(stub).resolve(&entries).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_nameless_external_object_is_dropped() {
        let stub = Arc::new(StubMetadataService::default());
        stub.push_resolution("/objects/g-ext", object_doc(None, "s3", None));
        let entries = vec![ManifestEntry::external("g-ext", "external.example.org")];

        let records = resolver(stub).resolve(&entries).await.unwrap();
        assert!(records.is_empty());
    }
}
