//! In-memory fake of the remote API for unit tests

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::{
    ContentStream, EntryKind, ListPage, RemoteApi, RemoteEntry, RemoteItem, RemoteStore,
    RootIdentity,
};
use crate::error::{DriveFsError, Result};

pub(crate) const FILE_A_CONTENT: &[u8] = b"fileA contents";

pub(crate) fn file_item(id: &str, name: &str, size: u64) -> RemoteItem {
    RemoteItem {
        id: id.to_string(),
        name: name.to_string(),
        size,
        kind: EntryKind::RegularFile,
    }
}

pub(crate) fn dir_item(id: &str, name: &str) -> RemoteItem {
    RemoteItem {
        id: id.to_string(),
        name: name.to_string(),
        size: 0,
        kind: EntryKind::Directory,
    }
}

pub(crate) fn doc_item(id: &str, name: &str) -> RemoteItem {
    RemoteItem {
        id: id.to_string(),
        name: name.to_string(),
        size: 0,
        kind: EntryKind::NativeDocument,
    }
}

/// Fake remote store with scripted pages and failure switches
pub(crate) struct FakeRemote {
    root: RootIdentity,
    pages: Mutex<HashMap<String, Vec<Vec<RemoteItem>>>>,
    contents: Mutex<HashMap<String, Vec<u8>>>,
    list_calls: AtomicUsize,
    fail_root: AtomicBool,
    fail_listing: AtomicBool,
    fail_on_page: Mutex<Option<usize>>,
    hang: AtomicBool,
}

impl FakeRemote {
    pub(crate) fn new() -> Self {
        Self {
            root: RootIdentity {
                id: "root".to_string(),
                name: "My Drive".to_string(),
            },
            pages: Mutex::new(HashMap::new()),
            contents: Mutex::new(HashMap::new()),
            list_calls: AtomicUsize::new(0),
            fail_root: AtomicBool::new(false),
            fail_listing: AtomicBool::new(false),
            fail_on_page: Mutex::new(None),
            hang: AtomicBool::new(false),
        }
    }

    /// Root with `file-a` (regular file) and `dir-b` (empty directory)
    pub(crate) fn sample() -> Self {
        Self::new()
            .with_children(
                "root",
                vec![
                    file_item("fid2", "file-a", FILE_A_CONTENT.len() as u64),
                    dir_item("did3", "dir-b"),
                ],
            )
            .with_children("did3", vec![])
            .with_content("fid2", FILE_A_CONTENT)
    }

    pub(crate) fn with_children(self, parent: &str, items: Vec<RemoteItem>) -> Self {
        self.with_pages(parent, vec![items])
    }

    pub(crate) fn with_pages(self, parent: &str, pages: Vec<Vec<RemoteItem>>) -> Self {
        self.pages.lock().insert(parent.to_string(), pages);
        self
    }

    pub(crate) fn with_content(self, id: &str, content: &[u8]) -> Self {
        self.contents.lock().insert(id.to_string(), content.to_vec());
        self
    }

    pub(crate) fn set_fail_root(&self, fail: bool) {
        self.fail_root.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_on_page(&self, page: Option<usize>) {
        *self.fail_on_page.lock() = page;
    }

    /// Make every subsequent call block until cancelled
    pub(crate) fn set_hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn into_store(self) -> (Arc<FakeRemote>, Arc<RemoteStore>) {
        let fake = Arc::new(self);
        let store = Arc::new(RemoteStore::new(fake.clone()));
        (fake, store)
    }

    pub(crate) async fn into_root(self) -> (Arc<FakeRemote>, RemoteEntry) {
        self.into_root_with_ttl(super::DEFAULT_LISTING_TTL).await
    }

    pub(crate) async fn into_root_with_ttl(
        self,
        listing_ttl: Duration,
    ) -> (Arc<FakeRemote>, RemoteEntry) {
        let fake = Arc::new(self);
        let store = Arc::new(RemoteStore::with_listing_ttl(fake.clone(), listing_ttl));
        let identity = fake
            .fetch_root_identity(&CancellationToken::new())
            .await
            .unwrap();
        (fake, RemoteEntry::root(store, identity))
    }

    async fn maybe_hang(&self) {
        if self.hang.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl RemoteApi for FakeRemote {
    async fn fetch_root_identity(&self, _cancel: &CancellationToken) -> Result<RootIdentity> {
        self.maybe_hang().await;
        if self.fail_root.load(Ordering::SeqCst) {
            return Err(DriveFsError::RemoteUnavailable("root unavailable".to_string()));
        }
        Ok(self.root.clone())
    }

    async fn list_children_page(
        &self,
        parent_id: &str,
        page_token: Option<&str>,
        _cancel: &CancellationToken,
    ) -> Result<ListPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_hang().await;
        // Let concurrent listings interleave between pages
        tokio::task::yield_now().await;
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(DriveFsError::RemoteUnavailable("listing failed".to_string()));
        }

        let index = page_token
            .and_then(|t| t.strip_prefix("page-"))
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(0);
        if *self.fail_on_page.lock() == Some(index) {
            return Err(DriveFsError::RemoteUnavailable(format!(
                "page {} failed",
                index
            )));
        }

        let pages = self.pages.lock();
        let parent_pages = pages.get(parent_id).cloned().unwrap_or_default();
        let items = parent_pages.get(index).cloned().unwrap_or_default();
        let next_token = if index + 1 < parent_pages.len() {
            Some(format!("page-{}", index + 1))
        } else {
            None
        };

        Ok(ListPage { items, next_token })
    }

    async fn open_content_stream(
        &self,
        id: &str,
        _cancel: &CancellationToken,
    ) -> Result<ContentStream> {
        self.maybe_hang().await;
        match self.contents.lock().get(id) {
            Some(content) => Ok(Box::pin(Cursor::new(content.clone()))),
            None => Err(DriveFsError::RemoteUnavailable(format!(
                "{} is not downloadable",
                id
            ))),
        }
    }
}
