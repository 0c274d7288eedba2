//! Wire types for the remote service protocols.
//!
//! Every struct decodes leniently: absent or null fields fall back to
//! their defaults so a single sparse record never fails a whole response.

use serde::Deserialize;

/// One record of a bulk metadata response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BulkFileRecord {
    /// Display filename, possibly empty.
    pub file_name: String,
    /// Object size in bytes.
    pub size: u64,
    /// The object GUID.
    pub did: String,
    /// Storage URIs for the object.
    pub urls: Vec<String>,
}

/// Object-resolution document for one external object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ObjectResolution {
    /// Display name of the object.
    pub name: Option<String>,
    /// Object size in bytes.
    pub size: Option<u64>,
    /// Access method descriptors; only the first is consulted.
    pub access_methods: Vec<AccessMethod>,
}

/// One access method of an object-resolution document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccessMethod {
    /// Access method type; `s3` is the only recognized value.
    #[serde(rename = "type")]
    pub kind: String,
    /// Where a signed URL for this method can be fetched.
    pub access_url: Option<AccessUrl>,
}

/// Nested access-URL descriptor of an access method.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccessUrl {
    /// The URL itself.
    pub url: String,
}
