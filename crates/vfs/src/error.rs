//! Error types for the VFS crate.

use std::fmt;

use guidfs_client::ClientError;

/// Errors that can occur during filesystem operations.
#[derive(Debug)]
pub enum VfsError {
    /// Inode not found.
    InodeNotFound(u64),

    /// No child with this name under the parent.
    ChildNotFound { parent: u64, name: String },

    /// Operation requires a directory.
    NotADirectory(u64),

    /// Operation requires a file.
    NotAFile(u64),

    /// Directory listing offset beyond the child count.
    BadListingOffset { inode: u64, offset: u64 },

    /// Signed-URL resolution or content fetch failed.
    ContentFetchFailed { guid: String, source: ClientError },

    /// Mount operation failed.
    MountFailed(String),
}

impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VfsError::InodeNotFound(id) => write!(f, "Inode not found: {}", id),
            VfsError::ChildNotFound { parent, name } => {
                write!(f, "No entry named {:?} under inode {}", name, parent)
            }
            VfsError::NotADirectory(id) => write!(f, "Not a directory: {}", id),
            VfsError::NotAFile(id) => write!(f, "Not a file: {}", id),
            VfsError::BadListingOffset { inode, offset } => {
                write!(f, "Listing offset {} out of range for inode {}", offset, inode)
            }
            VfsError::ContentFetchFailed { guid, source } => {
                write!(f, "Content fetch failed for {}: {}", guid, source)
            }
            VfsError::MountFailed(msg) => write!(f, "Mount failed: {}", msg),
        }
    }
}

impl std::error::Error for VfsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VfsError::ContentFetchFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
