//! Tree construction from resolved file records.
//!
//! The builder creates the root, the three view directories, and one
//! file leaf per view for every placeable object. Intermediate
//! directories are found-or-reused through a path map, so objects
//! sharing a path prefix share directory nodes. Construction iterates
//! the record map in key order, making the resulting tree deterministic
//! for a given record set.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, warn};

use guidfs_common::{guid_segments, path_segments_from_urls, FileRecord};

use crate::inode::{FileMeta, Inode, InodeKind, InodeTable, ROOT_INODE};

/// Name of the view addressing objects by GUID.
pub const BY_GUID: &str = "by-guid";
/// Name of the flat view addressing objects by display filename.
pub const BY_FILENAME: &str = "by-filename";
/// Name of the view mirroring bucket-relative storage paths.
pub const BY_FILEPATH: &str = "by-filepath";

/// Inode id of the by-filename view directory.
const BY_FILENAME_INODE: u64 = ROOT_INODE + 2;

/// Build the inode table for a record map.
///
/// Objects that cannot be placed (no URLs, no recognized storage scheme,
/// nameless external records) are skipped with a warning and appear in
/// no view.
pub fn build_from_records(records: &BTreeMap<String, FileRecord>) -> InodeTable {
    let mut builder: TreeBuilder = TreeBuilder::new();
    for (guid, record) in records {
        builder.place_record(guid, record);
    }
    debug!(nodes = builder.nodes.len(), "initialized inodes");
    InodeTable::from_nodes(builder.nodes)
}

struct TreeBuilder {
    nodes: HashMap<u64, Inode>,
    /// View-relative path of every placed node, for find-or-reuse.
    path_ids: HashMap<String, u64>,
    next_id: u64,
}

impl TreeBuilder {
    /// Create the root and the three view directories.
    fn new() -> Self {
        let mut builder = Self {
            nodes: HashMap::new(),
            path_ids: HashMap::new(),
            next_id: ROOT_INODE,
        };

        let root_id: u64 = builder.allocate_id();
        builder.nodes.insert(root_id, Inode::directory(root_id, "root"));
        for view in [BY_GUID, BY_FILENAME, BY_FILEPATH] {
            let id: u64 = builder.allocate_id();
            builder.nodes.insert(id, Inode::directory(id, view));
            builder
                .nodes
                .get_mut(&root_id)
                .unwrap_or_else(|| panic!("root inode missing"))
                .push_child(id, view, InodeKind::Directory);
            builder.path_ids.insert(view.to_string(), id);
        }
        builder
    }

    fn allocate_id(&mut self) -> u64 {
        let id: u64 = self.next_id;
        self.next_id += 1;
        id
    }

    /// Place one record under all three views.
    fn place_record(&mut self, guid: &str, record: &FileRecord) {
        if record.urls.is_empty() {
            warn!(%guid, "record has no urls; object not placed in any view");
            return;
        }

        // Derive storage path segments up front so an unusable object
        // lands in no view at all.
        let storage_segments: Vec<String> = if record.from_external_host {
            match record.filename.as_deref().filter(|name| !name.is_empty()) {
                Some(name) => vec![name.to_string()],
                None => {
                    warn!(%guid, "external record lacks a filename; object not placed in any view");
                    return;
                }
            }
        } else {
            match path_segments_from_urls(&record.urls) {
                Some(segments) => segments,
                None => {
                    warn!(%guid, "no storage url with a recognized scheme; object not placed in any view");
                    return;
                }
            }
        };

        // One shared FileMeta per object: a signed URL resolved through
        // any view serves the others.
        let meta: Arc<FileMeta> = Arc::new(FileMeta::new(
            guid,
            record.size,
            record.from_external_host,
            record.external_access_urls.clone(),
        ));

        // by-guid: GUID prefixes become intermediate directories.
        let mut chain: Vec<String> = vec![BY_GUID.to_string()];
        chain.extend(guid_segments(guid));
        self.create_chain(&chain, &meta);

        // by-filename: flat; the explicit filename wins over the derived
        // basename.
        let basename: String = storage_segments
            .last()
            .cloned()
            .unwrap_or_default();
        let filename: String = record
            .filename
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or(basename);
        self.add_flat_file(BY_FILENAME_INODE, &filename, &meta);

        // by-filepath: the bucket-relative storage path.
        let mut chain: Vec<String> = vec![BY_FILEPATH.to_string()];
        chain.extend(storage_segments);
        self.create_chain(&chain, &meta);
    }

    /// Create or reuse the directory chain for `segments`, terminating
    /// in a file leaf carrying `meta`.
    ///
    /// The first segment must already exist (it names a view directory);
    /// a missing parent further down is a construction-order bug and
    /// panics.
    fn create_chain(&mut self, segments: &[String], meta: &Arc<FileMeta>) {
        for (index, segment) in segments.iter().enumerate() {
            let full_path: String = segments[..=index].join("/");
            if self.path_ids.contains_key(&full_path) {
                if index == segments.len() - 1 {
                    warn!(
                        path = %full_path,
                        guid = %meta.guid,
                        "path already occupied; keeping the existing node"
                    );
                }
                continue;
            }

            let parent_path: String = segments[..index].join("/");
            let parent_id: u64 = match self.path_ids.get(&parent_path) {
                Some(id) => *id,
                None => panic!(
                    "tree construction invariant violated: missing parent directory {:?} for {:?}",
                    parent_path, segment
                ),
            };
            if !self.nodes[&parent_id].is_dir() {
                warn!(
                    path = %parent_path,
                    guid = %meta.guid,
                    "parent path is occupied by a file; object not placed here"
                );
                return;
            }

            let id: u64 = if index == segments.len() - 1 {
                self.add_node(parent_id, segment, Some(meta.clone()))
            } else {
                self.add_node(parent_id, segment, None)
            };
            self.path_ids.insert(full_path, id);
        }
    }

    /// Create a node and link it under its parent.
    fn add_node(&mut self, parent_id: u64, name: &str, meta: Option<Arc<FileMeta>>) -> u64 {
        let id: u64 = self.allocate_id();
        let kind: InodeKind = match meta {
            Some(meta) => {
                self.nodes.insert(id, Inode::file(id, name, meta));
                InodeKind::File
            }
            None => {
                self.nodes.insert(id, Inode::directory(id, name));
                InodeKind::Directory
            }
        };
        self.parent_mut(parent_id).push_child(id, name, kind);
        id
    }

    /// Create a file leaf in a flat view; a name collision re-points the
    /// existing entry (last write wins).
    fn add_flat_file(&mut self, parent_id: u64, name: &str, meta: &Arc<FileMeta>) {
        let id: u64 = self.allocate_id();
        self.nodes.insert(id, Inode::file(id, name, meta.clone()));
        let parent: &mut Inode = self.parent_mut(parent_id);
        if !parent.repoint_child(name, id, InodeKind::File) {
            parent.push_child(id, name, InodeKind::File);
        }
    }

    fn parent_mut(&mut self, parent_id: u64) -> &mut Inode {
        self.nodes.get_mut(&parent_id).unwrap_or_else(|| {
            panic!(
                "tree construction invariant violated: no inode for parent {}",
                parent_id
            )
        })
    }
}
