//! Filesystem node protocol over remote entries
//!
//! Each node wraps exactly one [`RemoteEntry`] and translates filesystem
//! calls (attributes, directory enumeration, name lookup, open) into
//! remote-node operations. Nodes are cheap to create and carry the
//! session cancellation token so every remote call they make can be
//! aborted on shutdown.

pub mod handle;

use std::sync::Arc;
use std::time::SystemTime;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::error::{DriveFsError, Result};
use crate::remote::{cancellable, RemoteEntry, RemoteStore};

pub use handle::OpenHandle;

/// Permission bits reported for directories (r-x------)
pub const DIR_MODE: u16 = 0o500;
/// Permission bits reported for files (r--------)
pub const FILE_MODE: u16 = 0o400;

/// File type as seen by the filesystem protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
}

/// Attributes synthesized for a node
#[derive(Debug, Clone)]
pub struct NodeAttr {
    pub file_type: FileType,
    pub size: u64,
    pub perm: u16,
    /// Query time; remote modification times are not consulted
    pub mtime: SystemTime,
}

/// Directory entry returned by [`DirNode::read_dir_all`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Remote ID, stable for the session
    pub id: String,
    pub name: String,
    pub file_type: FileType,
}

fn file_type_of(entry: &RemoteEntry) -> FileType {
    if entry.is_dir() {
        FileType::Directory
    } else {
        FileType::File
    }
}

fn attr_of(entry: &RemoteEntry) -> NodeAttr {
    let file_type = file_type_of(entry);
    let perm = match file_type {
        FileType::Directory => DIR_MODE,
        FileType::File => FILE_MODE,
    };

    NodeAttr {
        file_type,
        size: entry.size(),
        perm,
        mtime: SystemTime::now(),
    }
}

/// Mounted filesystem: owns the root entry and the session token
pub struct DriveFs {
    root: Arc<RemoteEntry>,
    cancel: CancellationToken,
}

impl DriveFs {
    /// Fetch the root identity and build the filesystem.
    ///
    /// Failure is fatal: there is no filesystem without a root.
    pub async fn new(store: Arc<RemoteStore>, cancel: CancellationToken) -> Result<Self> {
        let identity = cancellable(&cancel, store.api().fetch_root_identity(&cancel)).await?;
        info!("Root folder {:?} ({})", identity.name, identity.id);

        Ok(Self {
            root: Arc::new(RemoteEntry::root(store, identity)),
            cancel,
        })
    }

    /// Directory node for the mount root
    pub fn root(&self) -> DirNode {
        DirNode::new(self.root.clone(), self.cancel.clone())
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Directory or file node
#[derive(Clone)]
pub enum Node {
    Dir(DirNode),
    File(FileNode),
}

impl Node {
    fn from_entry(entry: Arc<RemoteEntry>, cancel: CancellationToken) -> Self {
        if entry.is_dir() {
            Node::Dir(DirNode::new(entry, cancel))
        } else {
            Node::File(FileNode::new(entry, cancel))
        }
    }

    pub fn entry(&self) -> &Arc<RemoteEntry> {
        match self {
            Node::Dir(d) => &d.entry,
            Node::File(f) => &f.entry,
        }
    }

    pub fn id(&self) -> &str {
        self.entry().id()
    }

    pub fn name(&self) -> &str {
        self.entry().name()
    }

    pub fn attr(&self) -> NodeAttr {
        attr_of(self.entry())
    }

    pub fn as_dir(&self) -> Option<&DirNode> {
        match self {
            Node::Dir(d) => Some(d),
            Node::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            Node::File(f) => Some(f),
            Node::Dir(_) => None,
        }
    }
}

/// Node wrapping a directory entry
#[derive(Clone)]
pub struct DirNode {
    entry: Arc<RemoteEntry>,
    cancel: CancellationToken,
}

impl DirNode {
    fn new(entry: Arc<RemoteEntry>, cancel: CancellationToken) -> Self {
        Self { entry, cancel }
    }

    pub fn entry(&self) -> &Arc<RemoteEntry> {
        &self.entry
    }

    pub fn name(&self) -> &str {
        self.entry.name()
    }

    pub fn attr(&self) -> NodeAttr {
        attr_of(&self.entry)
    }

    /// Enumerate children in listing order
    pub async fn read_dir_all(&self) -> Result<Vec<DirEntry>> {
        let listing = self.entry.list_children(&self.cancel).await?;

        Ok(listing
            .entries()
            .iter()
            .map(|child| DirEntry {
                id: child.id().to_string(),
                name: child.name().to_string(),
                file_type: file_type_of(child),
            })
            .collect())
    }

    /// Look up a child by exact name among the children as last listed.
    ///
    /// Does not list on its own; the protocol driver enumerates first.
    /// With duplicate sibling names the first entry in listing order wins.
    pub fn lookup(&self, name: &str) -> Result<Node> {
        trace!("lookup: {:?} in {:?}", name, self.entry.name());

        let child = self
            .entry
            .cached_children()
            .and_then(|listing| listing.entries().iter().find(|e| e.name() == name).cloned());

        match child {
            Some(entry) => Ok(Node::from_entry(entry, self.cancel.clone())),
            None => Err(DriveFsError::NotFound(format!(
                "{}/{}",
                self.entry.name(),
                name
            ))),
        }
    }
}

/// Result of a successful open
pub struct Opened {
    pub handle: OpenHandle,
    /// Ask the protocol layer to keep cached content across opens
    pub keep_cache: bool,
}

/// Node wrapping a regular file or native document
#[derive(Clone)]
pub struct FileNode {
    entry: Arc<RemoteEntry>,
    cancel: CancellationToken,
}

impl FileNode {
    fn new(entry: Arc<RemoteEntry>, cancel: CancellationToken) -> Self {
        Self { entry, cancel }
    }

    pub fn entry(&self) -> &Arc<RemoteEntry> {
        &self.entry
    }

    pub fn attr(&self) -> NodeAttr {
        attr_of(&self.entry)
    }

    /// Open a new read session; each call gets its own stream
    pub async fn open(&self) -> Result<Opened> {
        let stream = self.entry.open_content(&self.cancel).await?;
        debug!("Opened {}", self.entry);

        Ok(Opened {
            handle: OpenHandle::new(self.entry.name(), stream),
            keep_cache: true,
        })
    }
}
