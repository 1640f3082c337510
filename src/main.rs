//! drivefs daemon entry point

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use drivefs::auth::build_token_provider;
use drivefs::config::Config;
use drivefs::fuse::FuseAdapter;
use drivefs::mount;
use drivefs::remote::gdrive::GDriveApi;
use drivefs::remote::RemoteStore;
use drivefs::vfs::DriveFs;

/// Print usage information
fn print_usage() {
    eprintln!("Usage: drivefs <config.yaml>");
    eprintln!();
    eprintln!("drivefs - Mount a Google Drive folder as a read-only filesystem");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  config.yaml    Path to configuration file");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  drivefs /etc/drivefs/config.yaml");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        print_usage();
        std::process::exit(1);
    }

    let config_path = PathBuf::from(&args[1]);

    // Load configuration
    let config = match Config::from_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("drivefs starting");
    info!("Loaded configuration from {:?}", config_path);

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    // Cancelled on shutdown; aborts in-flight remote calls
    let cancel = CancellationToken::new();
    let c = cancel.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        c.cancel();
    })?;

    let auth = build_token_provider(&config.gdrive.auth).await?;
    let api = GDriveApi::new(&config.gdrive, auth)?;
    let store = Arc::new(RemoteStore::with_listing_ttl(
        Arc::new(api),
        config.listing.ttl,
    ));

    // Without a root there is nothing to mount
    let fs = match DriveFs::new(store, cancel.clone()).await {
        Ok(fs) => fs,
        Err(e) => {
            error!("Failed to fetch Drive root: {}", e);
            std::process::exit(1);
        }
    };
    info!("Drive root is {:?}", fs.root().name());

    let mount_path = config.mount.path.clone();
    if !mount_path.exists() {
        debug!("Creating mount point directory {:?}", mount_path);
        std::fs::create_dir_all(&mount_path)?;
    }

    // The adapter owns a runtime, which must not be dropped on an async thread
    let mount_config = config.mount.clone();
    let attr_ttl = config.attr_ttl;
    let mounted = tokio::task::spawn_blocking(move || {
        let adapter = FuseAdapter::new(&fs, attr_ttl, mount_config.uid, mount_config.gid)?;
        mount::mount(&mount_config.path, adapter, mount_config.allow_other)
    })
    .await?;

    let mut active = match mounted {
        Ok(m) => m,
        Err(e) => {
            error!("Failed to mount {:?}: {}", mount_path, e);
            std::process::exit(1);
        }
    };

    info!("Press Ctrl+C to unmount and exit");
    cancel.cancelled().await;

    info!("Shutting down");
    let active = tokio::task::spawn_blocking(move || {
        active.unmount();
        active
    })
    .await?;
    info!("Unmounted {:?}, exiting", active.path);

    Ok(())
}
