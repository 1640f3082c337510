pub mod inode;

use std::ffi::OsStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use fuser::{
    consts::FOPEN_KEEP_CACHE, FileAttr, FileType as FuseFileType, Filesystem, ReplyAttr,
    ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, Request,
};
use tracing::{debug, error, trace, warn};

use crate::error::{DriveFsError, Result};
use crate::vfs::{DriveFs, FileType, Node, NodeAttr, OpenHandle};

use self::inode::{InodeTable, ROOT_INODE};

/// Generation number (not used, always 0)
const GENERATION: u64 = 0;

/// Block size for reporting
const BLOCK_SIZE: u32 = 4096;

/// Maximum name length reported by statfs
const MAX_NAME_LEN: u32 = 255;

/// Errno-carrying result used by the request handlers
type OpResult<T> = std::result::Result<T, i32>;

/// Convert our FileType to FUSE FileType
fn to_fuse_file_type(ft: FileType) -> FuseFileType {
    match ft {
        FileType::File => FuseFileType::RegularFile,
        FileType::Directory => FuseFileType::Directory,
    }
}

/// Convert NodeAttr to FileAttr
fn node_attr_to_file_attr(ino: u64, attr: &NodeAttr, uid: u32, gid: u32) -> FileAttr {
    let nlink = match attr.file_type {
        FileType::Directory => 2,
        FileType::File => 1,
    };

    FileAttr {
        ino,
        size: attr.size,
        blocks: attr.size.div_ceil(BLOCK_SIZE as u64),
        atime: attr.mtime,
        mtime: attr.mtime,
        ctime: attr.mtime,
        crtime: attr.mtime,
        kind: to_fuse_file_type(attr.file_type),
        perm: attr.perm,
        nlink,
        uid,
        gid,
        rdev: 0,
        blksize: BLOCK_SIZE,
        flags: 0,
    }
}

/// Whether open flags request write access
fn wants_write(flags: i32) -> bool {
    flags & libc::O_ACCMODE != libc::O_RDONLY
}

/// One entry of a readdir reply
#[derive(Debug, Clone, PartialEq, Eq)]
struct DirSlot {
    ino: u64,
    /// Cookie the kernel passes back to resume after this entry
    offset: i64,
    kind: FuseFileType,
    name: String,
}

/// Lay out `.`, `..` and the children, skipping what the kernel already has.
///
/// Each slot's offset is its 1-based position, so resuming at `offset`
/// starts with the slot at index `offset`.
fn plan_readdir(
    ino: u64,
    parent_ino: u64,
    children: Vec<(u64, FuseFileType, String)>,
    offset: i64,
) -> Vec<DirSlot> {
    let dots = [
        (ino, FuseFileType::Directory, ".".to_string()),
        (parent_ino, FuseFileType::Directory, "..".to_string()),
    ];

    dots.into_iter()
        .chain(children)
        .enumerate()
        .skip(offset.max(0) as usize)
        .map(|(idx, (ino, kind, name))| DirSlot {
            ino,
            offset: idx as i64 + 1,
            kind,
            name,
        })
        .collect()
}

/// FUSE filesystem that delegates to the Drive node protocol
pub struct FuseAdapter {
    inodes: InodeTable,
    /// Open read sessions by file handle
    handles: DashMap<u64, OpenHandle>,
    next_fh: AtomicU64,
    /// Dedicated runtime for FUSE async operations
    runtime: tokio::runtime::Runtime,
    /// How long the kernel may cache attributes and entries
    attr_ttl: Duration,
    /// User ID to report for all entries
    uid: u32,
    /// Group ID to report for all entries
    gid: u32,
}

impl FuseAdapter {
    /// Create a new FuseAdapter serving `fs`
    ///
    /// # Arguments
    /// * `fs` - Filesystem whose root becomes inode 1
    /// * `attr_ttl` - Attribute/entry cache TTL handed to the kernel
    /// * `uid` - Optional user ID to report (defaults to process uid)
    /// * `gid` - Optional group ID to report (defaults to process gid)
    pub fn new(
        fs: &DriveFs,
        attr_ttl: Duration,
        uid: Option<u32>,
        gid: Option<u32>,
    ) -> Result<Self> {
        // FUSE callbacks arrive on the session thread; drive async work there
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .thread_name("drivefs-fuse")
            .enable_all()
            .build()
            .map_err(DriveFsError::Io)?;

        // Use configured uid/gid or fall back to process owner
        let uid = uid.unwrap_or_else(|| unsafe { libc::getuid() });
        let gid = gid.unwrap_or_else(|| unsafe { libc::getgid() });

        Ok(Self {
            inodes: InodeTable::new(Node::Dir(fs.root())),
            handles: DashMap::new(),
            next_fh: AtomicU64::new(1),
            runtime,
            attr_ttl,
            uid,
            gid,
        })
    }

    /// Get node for inode, returning ENOENT if not found
    fn inode_to_node(&self, ino: u64) -> OpResult<Node> {
        self.inodes.get_node(ino).ok_or(libc::ENOENT)
    }

    fn file_attr(&self, ino: u64, node: &Node) -> FileAttr {
        node_attr_to_file_attr(ino, &node.attr(), self.uid, self.gid)
    }

    /// Run an async operation on the dedicated FUSE runtime and wait for the result.
    fn run_async<F, T>(&self, future: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        self.runtime.block_on(future)
    }

    fn do_lookup(&self, parent: u64, name: &str) -> OpResult<FileAttr> {
        let parent_node = self.inode_to_node(parent)?;
        let dir = parent_node.as_dir().ok_or(libc::ENOTDIR)?;

        trace!("lookup: {:?} in {:?}", name, dir.name());

        match dir.lookup(name) {
            Ok(node) => {
                let attr = node.attr();
                let ino = self.inodes.register(node);
                Ok(node_attr_to_file_attr(ino, &attr, self.uid, self.gid))
            }
            Err(DriveFsError::NotFound(_)) => Err(libc::ENOENT),
            Err(e) => {
                error!("lookup error for {:?}: {}", name, e);
                Err(e.to_errno())
            }
        }
    }

    /// Open a read session, returning the file handle and open flags
    fn do_open(&self, ino: u64, flags: i32) -> OpResult<(u64, u32)> {
        if wants_write(flags) {
            return Err(libc::EROFS);
        }

        let node = self.inode_to_node(ino)?;
        let file = node.as_file().ok_or(libc::EISDIR)?;

        debug!("open: {:?} (ino={})", file.entry().name(), ino);

        let opened = self.run_async(file.open()).map_err(|e| {
            error!("open error for {:?}: {}", file.entry().name(), e);
            e.to_errno()
        })?;

        let fh = self.next_fh.fetch_add(1, Ordering::SeqCst);
        self.handles.insert(fh, opened.handle);
        let open_flags = if opened.keep_cache { FOPEN_KEEP_CACHE } else { 0 };
        Ok((fh, open_flags))
    }

    /// Read the next chunk of a handle's stream.
    ///
    /// The stream cannot seek, so an offset other than the handle's
    /// current position fails with EIO rather than returning bytes from
    /// the wrong place.
    fn do_read(&self, fh: u64, offset: i64, size: u32) -> OpResult<Bytes> {
        let mut handle = self.handles.get_mut(&fh).ok_or(libc::EBADF)?;

        if offset < 0 || offset as u64 != handle.position() {
            warn!(
                "non-sequential read of {:?}: offset={} but stream is at {}",
                handle.name(),
                offset,
                handle.position()
            );
            return Err(libc::EIO);
        }

        self.run_async(handle.value_mut().read(size)).map_err(|e| {
            error!("read error for {:?}: {}", handle.name(), e);
            e.to_errno()
        })
    }

    /// Close and forget a handle; `false` if it was unknown
    fn do_release(&self, fh: u64) -> bool {
        match self.handles.remove(&fh) {
            Some((_, mut handle)) => handle.release(),
            None => false,
        }
    }

    fn do_readdir(&self, ino: u64, offset: i64) -> OpResult<Vec<DirSlot>> {
        let node = self.inode_to_node(ino)?;
        let dir = node.as_dir().ok_or(libc::ENOTDIR)?;

        trace!("readdir: {:?} offset={}", dir.name(), offset);

        let entries = self.run_async(dir.read_dir_all()).map_err(|e| {
            error!("readdir error for {:?}: {}", dir.name(), e);
            e.to_errno()
        })?;

        // The root's parent lies outside the mount
        let parent_ino = dir
            .entry()
            .parent_id()
            .and_then(|id| self.inodes.get_inode(id))
            .unwrap_or(ROOT_INODE);

        let children = entries
            .into_iter()
            .map(|entry| {
                (
                    self.inodes.get_or_create_inode(&entry.id),
                    to_fuse_file_type(entry.file_type),
                    entry.name,
                )
            })
            .collect();

        Ok(plan_readdir(ino, parent_ino, children, offset))
    }
}

impl Filesystem for FuseAdapter {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        // Drive names are UTF-8; anything else cannot match
        let Some(name) = name.to_str() else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.do_lookup(parent, name) {
            Ok(attr) => reply.entry(&self.attr_ttl, &attr, GENERATION),
            Err(e) => reply.error(e),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        match self.inode_to_node(ino) {
            Ok(node) => {
                trace!("getattr: {:?} (ino={})", node.name(), ino);
                reply.attr(&self.attr_ttl, &self.file_attr(ino, &node));
            }
            Err(e) => reply.error(e),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        match self.do_open(ino, flags) {
            Ok((fh, open_flags)) => reply.opened(fh, open_flags),
            Err(e) => reply.error(e),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        trace!("read: ino={} fh={} offset={} size={}", ino, fh, offset, size);

        match self.do_read(fh, offset, size) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        // Unknown handles were already released
        self.do_release(fh);
        reply.ok();
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.inode_to_node(ino) {
            Ok(Node::Dir(_)) => reply.opened(0, 0),
            Ok(Node::File(_)) => reply.error(libc::ENOTDIR),
            Err(e) => reply.error(e),
        }
    }

    fn releasedir(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        reply: ReplyEmpty,
    ) {
        // Stateless - nothing to do
        reply.ok();
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let slots = match self.do_readdir(ino, offset) {
            Ok(slots) => slots,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        for slot in slots {
            if reply.add(slot.ino, slot.offset, slot.kind, &slot.name) {
                // Buffer full
                break;
            }
        }

        reply.ok();
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        if self.inode_to_node(ino).is_err() {
            reply.error(libc::ENOENT);
            return;
        }

        if mask & libc::W_OK != 0 {
            reply.error(libc::EROFS);
        } else {
            reply.ok();
        }
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: fuser::ReplyStatfs) {
        // Remote capacity is not queried; report a full, read-only filesystem
        reply.statfs(
            0,                        // blocks
            0,                        // bfree
            0,                        // bavail
            self.inodes.len() as u64, // files
            0,                        // ffree
            BLOCK_SIZE,               // bsize
            MAX_NAME_LEN,             // namelen
            BLOCK_SIZE,               // frsize
        );
    }
}
