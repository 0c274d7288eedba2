//! FUSE-based read-only virtual filesystem over remote objects.
//!
//! This crate mounts a manifest of remotely-stored objects as a local
//! directory. Files appear under three naming views but content stays
//! remote: reads fetch byte ranges on demand through short-lived signed
//! URLs.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: FUSE Interface (fuser::Filesystem impl)
//! Layer 2: Operation Layer (lookup, readdir, open, read)
//! Layer 1: Primitives (InodeTable, ContentSource)
//! ```
//!
//! The tree exposes each object under three fixed views:
//!
//! - `by-guid/` - one entry per object GUID; GUIDs containing `/` create
//!   intermediate directories
//! - `by-filename/` - flat, one entry per display filename
//! - `by-filepath/` - the bucket-relative storage path of each object

pub mod builder;
pub mod content;
pub mod error;
pub mod fuse;
pub mod inode;
pub mod mount;
pub mod options;

pub use builder::{build_from_records, BY_FILENAME, BY_FILEPATH, BY_GUID};
pub use content::ContentSource;
pub use error::VfsError;
pub use fuse::GuidFs;
pub use inode::{DirEntry, FileMeta, Inode, InodeKind, InodeTable, ROOT_INODE};
pub use mount::{mount, spawn_mount};
pub use options::VfsOptions;
