//! Remote store abstraction
//!
//! The remote API client is path-less: entries are addressed by their
//! remote-assigned IDs and traversal is strictly top-down from the root.
//! [`RemoteEntry`] layers the lazily fetched, time-cached child listing
//! on top of a [`RemoteApi`] implementation.

pub mod entry;
pub mod gdrive;
#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use crate::error::{DriveFsError, Result};

pub use entry::{ChildListing, RemoteEntry};

/// Default freshness window for cached directory listings (60 minutes)
pub const DEFAULT_LISTING_TTL: Duration = Duration::from_secs(60 * 60);

/// Classification of a remote entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    RegularFile,
    /// Remote-native document with no raw byte representation
    NativeDocument,
}

impl EntryKind {
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }
}

/// Identity of the root entry, fetched once at mount time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootIdentity {
    pub id: String,
    pub name: String,
}

/// One item of a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub kind: EntryKind,
}

/// One page of a paginated child listing
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub items: Vec<RemoteItem>,
    /// Continuation token; `None` when the listing is complete
    pub next_token: Option<String>,
}

/// Readable byte stream over an entry's content
pub type ContentStream = Pin<Box<dyn AsyncRead + Send>>;

/// Remote API client used by the remote node layer
///
/// Every call receives the session cancellation token and must return
/// [`DriveFsError::Cancelled`] promptly once it fires.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Fetch the identity of the root entry
    async fn fetch_root_identity(&self, cancel: &CancellationToken) -> Result<RootIdentity>;

    /// Fetch one page of the direct children of `parent_id`
    async fn list_children_page(
        &self,
        parent_id: &str,
        page_token: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ListPage>;

    /// Open a stream over the raw content of entry `id`
    async fn open_content_stream(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<ContentStream>;
}

/// Process-wide remote handle shared by every entry of a mount
pub struct RemoteStore {
    api: Arc<dyn RemoteApi>,
    listing_ttl: Duration,
}

impl RemoteStore {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self::with_listing_ttl(api, DEFAULT_LISTING_TTL)
    }

    pub fn with_listing_ttl(api: Arc<dyn RemoteApi>, listing_ttl: Duration) -> Self {
        Self { api, listing_ttl }
    }

    pub fn api(&self) -> &dyn RemoteApi {
        self.api.as_ref()
    }

    pub fn listing_ttl(&self) -> Duration {
        self.listing_ttl
    }
}

/// Race `fut` against the cancellation token.
///
/// Cancellation wins ties so a fired token never lets new work complete.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DriveFsError::Cancelled),
        res = fut => res,
    }
}
