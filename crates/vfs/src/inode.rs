//! The inode table: the in-memory tree served by the filesystem layer.
//!
//! Nodes are created once by the builder and immutable afterward, with a
//! single exception: the per-file cached signed URL, which lives behind
//! its own lock and is replaced wholesale (any validly-resolved URL is
//! equally usable, so concurrent resolvers may race and the last writer
//! wins).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Inode id of the tree root (matches the kernel's root inode id).
pub const ROOT_INODE: u64 = 1;

/// File or directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeKind {
    /// A synthesized directory.
    Directory,
    /// A remote object exposed as a regular file.
    File,
}

/// One directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// 1-based listing offset, stable for the directory's lifetime so
    /// listings are resumable.
    pub offset: u64,
    /// Inode id of the child.
    pub id: u64,
    /// Child name within the directory.
    pub name: String,
    /// Whether the child is a file or a directory.
    pub kind: InodeKind,
}

/// Metadata of one file node.
///
/// Every view leaf of the same object shares one `FileMeta`, so a signed
/// URL resolved through any view serves the others.
#[derive(Debug)]
pub struct FileMeta {
    /// The object GUID.
    pub guid: String,
    /// Object size in bytes.
    pub size: u64,
    /// Whether metadata came from an external commons host.
    pub from_external_host: bool,
    /// URLs that yield a signed URL through the external access path.
    pub external_access_urls: Vec<String>,
    /// Lazily resolved signed URL.
    signed_url: RwLock<Option<String>>,
}

impl FileMeta {
    /// Create metadata with no signed URL yet.
    pub fn new(
        guid: impl Into<String>,
        size: u64,
        from_external_host: bool,
        external_access_urls: Vec<String>,
    ) -> Self {
        Self {
            guid: guid.into(),
            size,
            from_external_host,
            external_access_urls,
            signed_url: RwLock::new(None),
        }
    }

    /// The cached signed URL, if one has been resolved.
    pub fn signed_url(&self) -> Option<String> {
        self.signed_url.read().unwrap().clone()
    }

    /// Replace the cached signed URL.
    pub fn set_signed_url(&self, url: impl Into<String>) {
        *self.signed_url.write().unwrap() = Some(url.into());
    }
}

/// One node of the synthesized tree.
#[derive(Debug)]
pub struct Inode {
    id: u64,
    name: String,
    /// Children in creation order; empty for files.
    children: Vec<DirEntry>,
    /// File metadata; `None` marks a directory.
    file: Option<Arc<FileMeta>>,
}

impl Inode {
    /// Create a directory node with no children yet.
    pub fn directory(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            children: Vec::new(),
            file: None,
        }
    }

    /// Create a file node backed by shared object metadata.
    pub fn file(id: u64, name: impl Into<String>, meta: Arc<FileMeta>) -> Self {
        Self {
            id,
            name: name.into(),
            children: Vec::new(),
            file: Some(meta),
        }
    }

    /// Inode id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Node name (the root is named `root`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this node is a directory.
    pub fn is_dir(&self) -> bool {
        self.file.is_none()
    }

    /// The node kind.
    pub fn kind(&self) -> InodeKind {
        if self.is_dir() {
            InodeKind::Directory
        } else {
            InodeKind::File
        }
    }

    /// File size in bytes; directories report zero.
    pub fn size(&self) -> u64 {
        self.file.as_ref().map(|meta| meta.size).unwrap_or(0)
    }

    /// File metadata, when this node is a file.
    pub fn meta(&self) -> Option<&Arc<FileMeta>> {
        self.file.as_ref()
    }

    /// Children in creation order.
    pub fn children(&self) -> &[DirEntry] {
        &self.children
    }

    /// First child entry with the given name.
    pub fn lookup_child(&self, name: &str) -> Option<&DirEntry> {
        self.children.iter().find(|entry| entry.name == name)
    }

    /// Append a child entry with the next sequential offset.
    pub(crate) fn push_child(&mut self, id: u64, name: impl Into<String>, kind: InodeKind) {
        let offset: u64 = self.children.len() as u64 + 1;
        self.children.push(DirEntry {
            offset,
            id,
            name: name.into(),
            kind,
        });
    }

    /// Re-point an existing child entry at another inode, keeping its
    /// offset. Used for last-write-wins name collisions.
    pub(crate) fn repoint_child(&mut self, name: &str, id: u64, kind: InodeKind) -> bool {
        match self.children.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => {
                entry.id = id;
                entry.kind = kind;
                true
            }
            None => false,
        }
    }
}

/// Immutable id-keyed table of every node in the tree.
#[derive(Debug)]
pub struct InodeTable {
    nodes: HashMap<u64, Arc<Inode>>,
}

impl InodeTable {
    /// Freeze a built node map into a table.
    pub(crate) fn from_nodes(nodes: HashMap<u64, Inode>) -> Self {
        Self {
            nodes: nodes
                .into_iter()
                .map(|(id, node)| (id, Arc::new(node)))
                .collect(),
        }
    }

    /// Node by id.
    pub fn get(&self, id: u64) -> Option<Arc<Inode>> {
        self.nodes.get(&id).cloned()
    }

    /// The root node.
    pub fn root(&self) -> Arc<Inode> {
        self.nodes[&ROOT_INODE].clone()
    }

    /// Number of nodes in the table.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the table is empty (never true for a built tree).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_offsets_are_sequential_from_one() {
        let mut dir: Inode = Inode::directory(1, "root");
        dir.push_child(2, "a", InodeKind::Directory);
        dir.push_child(3, "b", InodeKind::File);
        dir.push_child(4, "c", InodeKind::File);

        let offsets: Vec<u64> = dir.children().iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![1, 2, 3]);
    }

    #[test]
    fn test_repoint_child_keeps_offset() {
        let mut dir: Inode = Inode::directory(1, "root");
        dir.push_child(2, "a", InodeKind::File);
        dir.push_child(3, "b", InodeKind::File);

        assert!(dir.repoint_child("a", 9, InodeKind::File));
        let entry: &DirEntry = dir.lookup_child("a").unwrap();
        assert_eq!(entry.id, 9);
        assert_eq!(entry.offset, 1);

        assert!(!dir.repoint_child("missing", 9, InodeKind::File));
    }

    #[test]
    fn test_signed_url_cache_replaced_wholesale() {
        let meta: FileMeta = FileMeta::new("g1", 42, false, Vec::new());
        assert!(meta.signed_url().is_none());

        meta.set_signed_url("https://signed/1");
        assert_eq!(meta.signed_url().as_deref(), Some("https://signed/1"));

        meta.set_signed_url("https://signed/2");
        assert_eq!(meta.signed_url().as_deref(), Some("https://signed/2"));
    }
}
