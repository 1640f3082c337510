//! drivefs: mount a Google Drive folder as a read-only FUSE filesystem
//!
//! # Architecture
//!
//! - **Remote**: `RemoteApi` abstracts the three Drive calls the filesystem
//!   needs (root identity, paginated child listing, content download).
//!   `RemoteEntry` wraps one remote item and owns its listing cache.
//! - **VFS**: `DriveFs` exposes directory and file nodes with attributes,
//!   enumeration, lookup and open/read/release semantics.
//! - **FUSE Adapter**: translates kernel requests into node operations,
//!   managing inode allocation and open file handles.
//! - **Mount**: background FUSE session for a single mount point.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use drivefs::auth::build_token_provider;
//! use drivefs::config::Config;
//! use drivefs::remote::gdrive::GDriveApi;
//! use drivefs::remote::RemoteStore;
//! use drivefs::vfs::DriveFs;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_file(&"config.yaml".into())?;
//! let auth = build_token_provider(&config.gdrive.auth).await?;
//! let api = GDriveApi::new(&config.gdrive, auth)?;
//! let store = RemoteStore::with_listing_ttl(Arc::new(api), config.listing.ttl);
//!
//! let fs = DriveFs::new(Arc::new(store), CancellationToken::new()).await?;
//! for entry in fs.root().read_dir_all().await? {
//!     println!("{}", entry.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod env;
pub mod error;
pub mod fuse;
pub mod mount;
pub mod remote;
pub mod vfs;

pub use error::{DriveFsError, Result};
