//! Remote node: one directory or file of the remote store
//!
//! Directories fetch their children lazily and keep the last complete
//! listing for the store's freshness window. A refresh builds a new
//! [`ChildListing`] and swaps it in whole, so readers only ever observe
//! a snapshot of one listing call.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{cancellable, ContentStream, EntryKind, RemoteItem, RemoteStore, RootIdentity};
use crate::error::{DriveFsError, Result};

/// Snapshot of one complete child listing
#[derive(Debug)]
pub struct ChildListing {
    entries: Vec<Arc<RemoteEntry>>,
    fetched_at: Instant,
}

impl ChildListing {
    /// Entries in the order returned by the remote API
    pub fn entries(&self) -> &[Arc<RemoteEntry>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// In-memory representation of one remote entry
pub struct RemoteEntry {
    store: Arc<RemoteStore>,
    id: String,
    name: String,
    kind: EntryKind,
    size: u64,
    parent_id: Option<String>,
    parent_name: Option<String>,
    /// Last successful listing (directories only)
    children: RwLock<Option<Arc<ChildListing>>>,
}

impl RemoteEntry {
    /// Create the root entry from the mount-time identity fetch
    pub fn root(store: Arc<RemoteStore>, identity: RootIdentity) -> Self {
        Self {
            store,
            id: identity.id,
            name: identity.name,
            kind: EntryKind::Directory,
            size: 0,
            parent_id: None,
            parent_name: None,
            children: RwLock::new(None),
        }
    }

    fn child_of(parent: &RemoteEntry, item: RemoteItem) -> Self {
        let size = if item.kind.is_dir() { 0 } else { item.size };
        Self {
            store: parent.store.clone(),
            id: item.id,
            name: item.name,
            kind: item.kind,
            size,
            parent_id: Some(parent.id.clone()),
            parent_name: Some(parent.name.clone()),
            children: RwLock::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn parent_name(&self) -> Option<&str> {
        self.parent_name.as_deref()
    }

    /// Children as last fetched, without contacting the remote API
    pub fn cached_children(&self) -> Option<Arc<ChildListing>> {
        self.children.read().clone()
    }

    /// List the direct children of this directory.
    ///
    /// Returns the cached listing while it is younger than the store's
    /// freshness window; otherwise walks every page of a fresh listing.
    /// A failed refresh leaves the previous listing in place.
    pub async fn list_children(&self, cancel: &CancellationToken) -> Result<Arc<ChildListing>> {
        if !self.is_dir() {
            return Err(DriveFsError::NotADirectory(self.name.clone()));
        }

        if let Some(listing) = self.cached_children() {
            if listing.fetched_at.elapsed() < self.store.listing_ttl() {
                trace!("list_children: cache hit for {:?} ({})", self.name, self.id);
                return Ok(listing);
            }
        }

        debug!("Listing children of {:?} ({})", self.name, self.id);

        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = cancellable(
                cancel,
                self.store
                    .api()
                    .list_children_page(&self.id, page_token.as_deref(), cancel),
            )
            .await?;

            entries.extend(
                page.items
                    .into_iter()
                    .map(|item| Arc::new(RemoteEntry::child_of(self, item))),
            );

            match page.next_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        let listing = Arc::new(ChildListing {
            entries,
            fetched_at: Instant::now(),
        });
        *self.children.write() = Some(listing.clone());

        debug!("Listed {} children of {:?}", listing.len(), self.name);
        Ok(listing)
    }

    /// Open a stream positioned at the start of this entry's content
    pub async fn open_content(&self, cancel: &CancellationToken) -> Result<ContentStream> {
        if self.is_dir() {
            return Err(DriveFsError::NotAFile(self.name.clone()));
        }

        trace!("open_content: {:?} ({})", self.name, self.id);
        cancellable(cancel, self.store.api().open_content_stream(&self.id, cancel)).await
    }
}

impl fmt::Display for RemoteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} => kind: {:?}, ID: {}, size: {} KB",
            self.parent_name.as_deref().unwrap_or(""),
            self.name,
            self.kind,
            self.id,
            self.size / 1024
        )
    }
}

impl fmt::Debug for RemoteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("size", &self.size)
            .field("parent_id", &self.parent_id)
            .finish_non_exhaustive()
    }
}
