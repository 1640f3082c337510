use std::io;
use thiserror::Error;

/// Main error type for drivefs operations
#[derive(Error, Debug)]
pub enum DriveFsError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Not a file: {0}")]
    NotAFile(String),

    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),
}

impl DriveFsError {
    /// Convert error to libc errno for FUSE responses
    pub fn to_errno(&self) -> i32 {
        match self {
            DriveFsError::NotFound(_) => libc::ENOENT,
            DriveFsError::NotADirectory(_) => libc::ENOTDIR,
            DriveFsError::NotAFile(_) => libc::EISDIR,
            DriveFsError::RemoteUnavailable(_) => libc::EIO,
            DriveFsError::Cancelled => libc::EINTR,
            DriveFsError::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
            DriveFsError::Config(_) => libc::EINVAL,
            DriveFsError::Auth(_) => libc::EACCES,
        }
    }
}

/// Result type alias for drivefs operations
pub type Result<T> = std::result::Result<T, DriveFsError>;
