//! Google Drive implementation of the remote API
//!
//! Entries are addressed by Drive file IDs. Listings query
//! `'<id>' in parents` page by page; content is streamed from the
//! `alt=media` download endpoint without buffering the whole file.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use google_drive3::api::{File, Scope};
use google_drive3::DriveHub;
use http_body_util::BodyStream;
use hyper_util::client::legacy::connect::HttpConnector;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::{cancellable, ContentStream, EntryKind, ListPage, RemoteApi, RemoteItem, RootIdentity};
use crate::auth::TokenProviderWrapper;
use crate::config::GDriveConfig;
use crate::error::{DriveFsError, Result};

/// MIME type for Google Drive folders
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Prefix shared by all Google-native document MIME types
const GOOGLE_APPS_MIME_PREFIX: &str = "application/vnd.google-apps.";

/// Fields to request for the root entry
const ROOT_FIELDS: &str = "id, name";

/// Fields to request for file list
const LIST_FIELDS: &str = "nextPageToken, files(id, name, size, mimeType)";

type DriveClient = DriveHub<hyper_rustls::HttpsConnector<HttpConnector>>;

/// Classify a Drive MIME type
pub fn classify_mime_type(mime_type: Option<&str>) -> EntryKind {
    match mime_type {
        Some(FOLDER_MIME_TYPE) => EntryKind::Directory,
        Some(m) if m.starts_with(GOOGLE_APPS_MIME_PREFIX) => EntryKind::NativeDocument,
        _ => EntryKind::RegularFile,
    }
}

/// Convert a Drive `File` into a listing item, skipping entries without an ID
fn file_to_item(file: File) -> Option<RemoteItem> {
    let id = file.id?;
    let kind = classify_mime_type(file.mime_type.as_deref());
    let size = match kind {
        EntryKind::Directory => 0,
        _ => file.size.unwrap_or(0).max(0) as u64,
    };

    Some(RemoteItem {
        id,
        name: file.name.unwrap_or_default(),
        size,
        kind,
    })
}

fn remote_error(context: &str, e: google_drive3::Error) -> DriveFsError {
    DriveFsError::RemoteUnavailable(format!("{}: {}", context, e))
}

/// Google Drive remote API client
pub struct GDriveApi {
    hub: Arc<DriveClient>,
    root_folder_id: String,
    page_size: i32,
}

impl GDriveApi {
    /// Create a Drive client authenticated by `auth`
    pub fn new(config: &GDriveConfig, auth: TokenProviderWrapper) -> Result<Self> {
        // Create HTTPS connector
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| DriveFsError::Config(format!("Failed to load TLS roots: {}", e)))?
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();

        let client =
            hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
                .build(https);

        let hub = DriveHub::new(client, auth);

        Ok(Self {
            hub: Arc::new(hub),
            root_folder_id: config.root_folder_id.clone(),
            page_size: config.page_size as i32,
        })
    }
}

#[async_trait]
impl RemoteApi for GDriveApi {
    async fn fetch_root_identity(&self, cancel: &CancellationToken) -> Result<RootIdentity> {
        debug!("Fetching root folder {:?}", self.root_folder_id);

        let request = self
            .hub
            .files()
            .get(&self.root_folder_id)
            .add_scope(Scope::Full)
            .param("fields", ROOT_FIELDS)
            .doit();

        let (_, root) = cancellable(cancel, async {
            request
                .await
                .map_err(|e| remote_error("Drive root fetch error", e))
        })
        .await?;

        let id = root.id.ok_or_else(|| {
            DriveFsError::RemoteUnavailable("Root folder has no ID".to_string())
        })?;

        Ok(RootIdentity {
            id,
            name: root.name.unwrap_or_default(),
        })
    }

    async fn list_children_page(
        &self,
        parent_id: &str,
        page_token: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ListPage> {
        trace!("list_children_page: {} token={:?}", parent_id, page_token);

        let query = format!("'{}' in parents and trashed = false", parent_id);
        let mut request = self
            .hub
            .files()
            .list()
            .q(&query)
            .add_scope(Scope::Full)
            .param("fields", LIST_FIELDS)
            .page_size(self.page_size);

        if let Some(token) = page_token {
            request = request.page_token(token);
        }

        let (_, list) = cancellable(cancel, async {
            request
                .doit()
                .await
                .map_err(|e| remote_error("Drive list error", e))
        })
        .await?;

        let files = list.files.unwrap_or_default();
        let total = files.len();
        let items: Vec<RemoteItem> = files.into_iter().filter_map(file_to_item).collect();
        if items.len() != total {
            warn!(
                "Skipped {} entries without an ID under {}",
                total - items.len(),
                parent_id
            );
        }

        Ok(ListPage {
            items,
            next_token: list.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn open_content_stream(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<ContentStream> {
        debug!("Opening content stream for {}", id);

        let request = self
            .hub
            .files()
            .get(id)
            .add_scope(Scope::Full)
            .param("alt", "media")
            .doit();

        let (response, _) = cancellable(cancel, async {
            request
                .await
                .map_err(|e| remote_error("Drive download error", e))
        })
        .await?;

        let stream = BodyStream::new(response.into_body())
            .try_filter_map(|frame| async move { Ok(frame.into_data().ok()) })
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));

        Ok(Box::pin(StreamReader::new(Box::pin(stream))))
    }
}
