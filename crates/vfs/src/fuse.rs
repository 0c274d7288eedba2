//! The filesystem operation layer and its FUSE adapter.
//!
//! `GuidFs` answers kernel-style calls against the built inode table.
//! The operation methods are plain (async) functions so they can be
//! exercised without a kernel mount; the `fuser::Filesystem` impl is a
//! thin adapter that maps results onto replies and errnos. Tree-only
//! operations are answered inline; network-bound operations (open, read)
//! are dispatched onto the tokio runtime so concurrent calls proceed
//! independently.

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyData, ReplyDirectory, ReplyEntry, ReplyOpen,
    ReplyStatfs, Request,
};
use tokio::runtime::Handle;
use tracing::{debug, error};

use crate::content::ContentSource;
use crate::error::VfsError;
use crate::inode::{DirEntry, FileMeta, Inode, InodeKind, InodeTable};
use crate::options::VfsOptions;

/// Read-only filesystem over a built inode table.
///
/// Cloning is cheap; every clone serves the same tree through the same
/// content source.
#[derive(Clone)]
pub struct GuidFs {
    inodes: Arc<InodeTable>,
    source: Arc<dyn ContentSource>,
    options: VfsOptions,
    runtime: Handle,
}

impl GuidFs {
    /// Create a filesystem over a built table.
    ///
    /// # Errors
    /// Fails when called outside a tokio runtime.
    pub fn new(
        inodes: InodeTable,
        source: Arc<dyn ContentSource>,
        options: VfsOptions,
    ) -> Result<Self, VfsError> {
        let runtime: Handle = Handle::try_current()
            .map_err(|err| VfsError::MountFailed(format!("no tokio runtime: {}", err)))?;
        Ok(Self {
            inodes: Arc::new(inodes),
            source,
            options,
            runtime,
        })
    }

    /// Mount-time options.
    pub fn options(&self) -> &VfsOptions {
        &self.options
    }

    /// Number of nodes in the served tree.
    pub fn inode_count(&self) -> usize {
        self.inodes.len()
    }

    fn node(&self, id: u64) -> Result<Arc<Inode>, VfsError> {
        self.inodes.get(id).ok_or(VfsError::InodeNotFound(id))
    }

    /// Convert an inode to kernel file attributes.
    ///
    /// Objects have no meaningful persisted mtime, so every timestamp is
    /// patched to the current time on every call.
    fn attr_for(&self, node: &Inode) -> FileAttr {
        let now: SystemTime = SystemTime::now();
        let is_dir: bool = node.is_dir();
        let size: u64 = node.size();

        FileAttr {
            ino: node.id(),
            size,
            blocks: (size + 511) / 512,
            atime: now,
            mtime: now,
            ctime: now,
            crtime: now,
            kind: if is_dir {
                FileType::Directory
            } else {
                FileType::RegularFile
            },
            perm: if is_dir { 0o555 } else { 0o444 },
            nlink: 1,
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }

    // ------------------------------------------------------------------
    // Operation layer
    // ------------------------------------------------------------------

    /// Look up a child by name, returning its attributes.
    pub fn lookup(&self, parent: u64, name: &str) -> Result<FileAttr, VfsError> {
        let parent_node: Arc<Inode> = self.node(parent)?;
        let entry: DirEntry = parent_node
            .lookup_child(name)
            .cloned()
            .ok_or_else(|| VfsError::ChildNotFound {
                parent,
                name: name.to_string(),
            })?;
        let child: Arc<Inode> = self.node(entry.id)?;
        Ok(self.attr_for(&child))
    }

    /// Attributes of one inode.
    pub fn getattr(&self, id: u64) -> Result<FileAttr, VfsError> {
        let node: Arc<Inode> = self.node(id)?;
        Ok(self.attr_for(&node))
    }

    /// Open a directory; always succeeds for a known directory id.
    pub fn open_dir(&self, id: u64) -> Result<(), VfsError> {
        let node: Arc<Inode> = self.node(id)?;
        if !node.is_dir() {
            return Err(VfsError::NotADirectory(id));
        }
        Ok(())
    }

    /// Directory entries starting at the given stored offset.
    ///
    /// Offsets are the sequential values assigned at construction, so a
    /// listing is resumable across calls with increasing offsets. An
    /// offset beyond the child count is an error.
    pub fn read_dir(&self, id: u64, offset: u64) -> Result<Vec<DirEntry>, VfsError> {
        let node: Arc<Inode> = self.node(id)?;
        if !node.is_dir() {
            return Err(VfsError::NotADirectory(id));
        }

        let children: &[DirEntry] = node.children();
        if offset > children.len() as u64 {
            return Err(VfsError::BadListingOffset { inode: id, offset });
        }
        Ok(children[offset as usize..].to_vec())
    }

    /// Open a file, resolving and caching a signed URL when none is
    /// cached yet.
    pub async fn open_file(&self, id: u64) -> Result<(), VfsError> {
        let node: Arc<Inode> = self.node(id)?;
        let meta: &Arc<FileMeta> = node.meta().ok_or(VfsError::NotAFile(id))?;

        if meta.signed_url().is_none() {
            self.resolve_and_cache(meta).await?;
        }
        Ok(())
    }

    /// Read the effective byte range `[offset, min(offset + length, size))`
    /// of one file.
    ///
    /// A fully-out-of-range read returns zero bytes. When storage rejects
    /// the cached signed URL as expired, the URL is re-resolved and the
    /// fetch retried exactly once.
    pub async fn read_file(&self, id: u64, offset: u64, length: u64) -> Result<Vec<u8>, VfsError> {
        let node: Arc<Inode> = self.node(id)?;
        let meta: &Arc<FileMeta> = node.meta().ok_or(VfsError::NotAFile(id))?;

        let url: String = match meta.signed_url() {
            Some(url) => url,
            None => self.resolve_and_cache(meta).await?,
        };

        debug!(guid = %meta.guid, offset, length, "reading object range");
        match self.source.read(&url, offset, length, meta.size).await {
            Ok(body) => Ok(body),
            Err(err) if err.is_expired_url() => {
                debug!(guid = %meta.guid, "signed url expired, resolving a fresh one");
                let url: String = self.resolve_and_cache(meta).await?;
                self.source
                    .read(&url, offset, length, meta.size)
                    .await
                    .map_err(|source| VfsError::ContentFetchFailed {
                        guid: meta.guid.clone(),
                        source,
                    })
            }
            Err(source) => Err(VfsError::ContentFetchFailed {
                guid: meta.guid.clone(),
                source,
            }),
        }
    }

    /// Resolve a fresh signed URL and cache it on the node.
    async fn resolve_and_cache(&self, meta: &Arc<FileMeta>) -> Result<String, VfsError> {
        let url: String =
            self.source
                .signed_url(meta)
                .await
                .map_err(|source| VfsError::ContentFetchFailed {
                    guid: meta.guid.clone(),
                    source,
                })?;
        meta.set_signed_url(url.clone());
        Ok(url)
    }

    fn attr_ttl(&self) -> Duration {
        Duration::from_secs(self.options.attr_timeout_secs)
    }
}

/// Map an operation failure onto a protocol errno.
fn errno(err: &VfsError) -> i32 {
    match err {
        VfsError::InodeNotFound(_) | VfsError::ChildNotFound { .. } => libc::ENOENT,
        VfsError::NotAFile(_) => libc::EISDIR,
        VfsError::NotADirectory(_)
        | VfsError::BadListingOffset { .. }
        | VfsError::ContentFetchFailed { .. }
        | VfsError::MountFailed(_) => libc::EIO,
    }
}

fn file_type(kind: InodeKind) -> FileType {
    match kind {
        InodeKind::Directory => FileType::Directory,
        InodeKind::File => FileType::RegularFile,
    }
}

impl Filesystem for GuidFs {
    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let name_str: &str = match name.to_str() {
            Some(name) => name,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        match GuidFs::lookup(self, parent, name_str) {
            Ok(attr) => reply.entry(&self.attr_ttl(), &attr, 0),
            Err(err) => reply.error(errno(&err)),
        }
    }

    fn getattr(&mut self, _req: &Request, ino: u64, reply: ReplyAttr) {
        match GuidFs::getattr(self, ino) {
            Ok(attr) => reply.attr(&self.attr_ttl(), &attr),
            Err(err) => reply.error(errno(&err)),
        }
    }

    fn opendir(&mut self, _req: &Request, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.open_dir(ino) {
            Ok(()) => reply.opened(0, 0),
            Err(err) => reply.error(errno(&err)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let entries: Vec<DirEntry> = match self.read_dir(ino, offset.max(0) as u64) {
            Ok(entries) => entries,
            Err(err) => {
                reply.error(errno(&err));
                return;
            }
        };

        for entry in entries {
            let full: bool = reply.add(
                entry.id,
                entry.offset as i64,
                file_type(entry.kind),
                &entry.name,
            );
            if full {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, _req: &Request, ino: u64, _flags: i32, reply: ReplyOpen) {
        let fs: GuidFs = self.clone();
        self.runtime.spawn(async move {
            match fs.open_file(ino).await {
                Ok(()) => reply.opened(0, 0),
                Err(err) => {
                    error!(ino, error = %err, "open failed");
                    reply.error(errno(&err));
                }
            }
        });
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let fs: GuidFs = self.clone();
        self.runtime.spawn(async move {
            match fs.read_file(ino, offset.max(0) as u64, size as u64).await {
                Ok(body) => reply.data(&body),
                Err(err) => {
                    error!(ino, error = %err, "read failed");
                    reply.error(errno(&err));
                }
            }
        });
    }

    fn statfs(&mut self, _req: &Request, _ino: u64, reply: ReplyStatfs) {
        reply.statfs(0, 0, 0, 0, 0, 512, 255, 0);
    }
}
