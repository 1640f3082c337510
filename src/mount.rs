//! Mount lifecycle

use std::path::{Path, PathBuf};

use fuser::MountOption;
use tracing::info;

use crate::error::{DriveFsError, Result};
use crate::fuse::FuseAdapter;

/// Represents an active mount
pub struct ActiveMount {
    /// Mount path
    pub path: PathBuf,
    /// Session handle (for unmounting)
    session: Option<fuser::BackgroundSession>,
}

impl ActiveMount {
    /// Unmount this filesystem
    pub fn unmount(&mut self) {
        if let Some(session) = self.session.take() {
            info!("Unmounting {:?}", self.path);
            drop(session);
        }
    }
}

impl Drop for ActiveMount {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Mount options for a read-only Drive mount
fn mount_options(allow_other: bool) -> Vec<MountOption> {
    let mut options = vec![
        MountOption::FSName("drivefs".to_string()),
        MountOption::Subtype("drivefs".to_string()),
        MountOption::AutoUnmount,
        MountOption::RO,
        MountOption::NoExec,
    ];

    if allow_other {
        options.push(MountOption::AllowOther);
    }

    options
}

/// Mount `adapter` at `path` in a background session
pub fn mount(path: &Path, adapter: FuseAdapter, allow_other: bool) -> Result<ActiveMount> {
    info!("Mounting at {:?}", path);

    if !path.exists() {
        return Err(DriveFsError::NotFound(format!(
            "Mount point does not exist: {:?}",
            path
        )));
    }

    if !path.is_dir() {
        return Err(DriveFsError::NotADirectory(format!(
            "Mount point is not a directory: {:?}",
            path
        )));
    }

    let session = fuser::spawn_mount2(adapter, path, &mount_options(allow_other))
        .map_err(DriveFsError::Io)?;

    info!("Successfully mounted at {:?}", path);
    Ok(ActiveMount {
        path: path.to_path_buf(),
        session: Some(session),
    })
}
