//! Storage-URL parsing helpers.
//!
//! Object metadata carries storage URIs (`s3://bucket/dir/file.txt`); the
//! tree builder derives display names and by-filepath placement from them.
//! All helpers are lexical and never touch the network.

use tracing::warn;
use url::Url;

/// URL schemes the tree builder understands.
const RECOGNIZED_SCHEMES: &[&str] = &["s3", "gcs", "http", "https"];

/// Whether a URI parses and carries one of the recognized storage schemes.
pub fn is_recognized_url(uri: &str) -> bool {
    match Url::parse(uri) {
        Ok(parsed) => RECOGNIZED_SCHEMES.contains(&parsed.scheme()),
        Err(_) => false,
    }
}

/// Bucket-relative path segments of the first recognized URL.
///
/// The leading bucket/host segment is dropped: `s3://bucket/dir/file.txt`
/// yields `["dir", "file.txt"]`. Unrecognized URLs are skipped with a
/// warning. Returns `None` when no URL in the list yields a usable path.
pub fn path_segments_from_urls(urls: &[String]) -> Option<Vec<String>> {
    let mut valid: Option<Url> = None;
    for uri in urls {
        match Url::parse(uri) {
            Ok(parsed) if RECOGNIZED_SCHEMES.contains(&parsed.scheme()) => {
                valid = Some(parsed);
                break;
            }
            _ => warn!(url = %uri, "skipping url, protocol not supported"),
        }
    }

    let segments: Vec<String> = valid?
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();

    if segments.is_empty() {
        return None;
    }
    Some(segments)
}

/// Split a GUID into path segments.
///
/// GUIDs may contain `/`, in which case the prefix segments become
/// intermediate directories under the by-guid view.
pub fn guid_segments(guid: &str) -> Vec<String> {
    guid.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}
