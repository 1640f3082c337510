//! Inode management for remote ID <-> inode mapping
//!
//! The FUSE interface works with inodes while the filesystem nodes are
//! identified by remote IDs. Inode numbers are allocated once per ID and
//! never reused within a mount session, so the kernel sees stable
//! identifiers even when a directory is re-listed.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::vfs::Node;

/// Root directory inode (always 1 in FUSE)
pub const ROOT_INODE: u64 = 1;

/// Maps remote IDs to inodes and inodes to the latest looked-up node
pub struct InodeTable {
    /// Maps remote ID -> inode
    id_to_inode: DashMap<String, u64>,
    /// Maps inode -> node (registered on lookup)
    nodes: DashMap<u64, Node>,
    /// Next inode number to allocate
    next_inode: AtomicU64,
}

impl InodeTable {
    /// Create a new inode table with the root node pre-registered
    pub fn new(root: Node) -> Self {
        let table = Self {
            id_to_inode: DashMap::new(),
            nodes: DashMap::new(),
            next_inode: AtomicU64::new(ROOT_INODE + 1),
        };

        table.id_to_inode.insert(root.id().to_string(), ROOT_INODE);
        table.nodes.insert(ROOT_INODE, root);

        table
    }

    /// Get inode for a remote ID, allocating one if it doesn't exist
    pub fn get_or_create_inode(&self, id: &str) -> u64 {
        if let Some(inode) = self.id_to_inode.get(id) {
            return *inode;
        }

        *self
            .id_to_inode
            .entry(id.to_string())
            .or_insert_with(|| self.next_inode.fetch_add(1, Ordering::SeqCst))
    }

    /// Get inode for a remote ID (without creating)
    pub fn get_inode(&self, id: &str) -> Option<u64> {
        self.id_to_inode.get(id).map(|i| *i)
    }

    /// Register a node, replacing any older node for the same ID
    pub fn register(&self, node: Node) -> u64 {
        let inode = self.get_or_create_inode(node.id());
        self.nodes.insert(inode, node);
        inode
    }

    /// Get the node registered for an inode
    pub fn get_node(&self, inode: u64) -> Option<Node> {
        self.nodes.get(&inode).map(|n| n.clone())
    }

    /// Number of allocated inodes
    pub fn len(&self) -> usize {
        self.id_to_inode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_inode.is_empty()
    }
}
