//! Manifest and metadata record types shared by the service clients and
//! the filesystem layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// One entry of the user-supplied manifest.
///
/// An entry names an object by GUID and optionally points at the external
/// commons host that owns its metadata. Entries without a commons hostname
/// are resolved through the bulk metadata service instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// The object GUID.
    pub object_id: String,
    /// Hostname of the external commons owning this object's metadata.
    pub commons_url: Option<String>,
}

impl ManifestEntry {
    /// Create an entry resolved through the bulk metadata service.
    pub fn internal(object_id: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            commons_url: None,
        }
    }

    /// Create an entry resolved through an external commons host.
    pub fn external(object_id: impl Into<String>, commons_url: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            commons_url: Some(commons_url.into()),
        }
    }
}

/// Parse manifest text into entries.
///
/// The manifest is a JSON array of records. Records are decoded leniently:
/// a missing or malformed field falls back to its default rather than
/// rejecting the whole manifest. Entries without an object identifier are
/// dropped with a warning. An empty manifest yields no entries.
///
/// # Errors
/// Returns an error only when the text is not a JSON array at all.
pub fn parse_manifest(text: &str) -> Result<Vec<ManifestEntry>, serde_json::Error> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let values: Vec<Value> = serde_json::from_str(text)?;
    let mut entries: Vec<ManifestEntry> = Vec::with_capacity(values.len());
    for value in values {
        let object_id: &str = value
            .get("object_id")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if object_id.is_empty() {
            warn!("skipping manifest entry without an object_id");
            continue;
        }

        let commons_url: Option<String> = value
            .get("commons_url")
            .and_then(Value::as_str)
            .filter(|host| !host.is_empty())
            .map(str::to_string);

        entries.push(ManifestEntry {
            object_id: object_id.to_string(),
            commons_url,
        });
    }
    Ok(entries)
}

/// Resolved metadata for one remote object.
///
/// Produced once per mount by the metadata resolver and immutable
/// thereafter; the filesystem layer keys all views off these records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRecord {
    /// The object GUID (unique key).
    pub guid: String,
    /// Explicit display filename, when the metadata service provided one.
    pub filename: Option<String>,
    /// Object size in bytes.
    pub size: u64,
    /// Storage URIs for the object, in service order.
    pub urls: Vec<String>,
    /// Whether metadata came from an external commons host.
    pub from_external_host: bool,
    /// URLs that yield a signed URL through the external access path.
    pub external_access_urls: Vec<String>,
}
