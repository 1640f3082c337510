//! Open file handles
//!
//! A handle supports exactly one forward linear read pass over the
//! content stream. Protocol offsets are not used to seek: every read
//! continues from where the previous one stopped.

use std::io;

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tracing::{debug, trace};

use crate::error::{DriveFsError, Result};
use crate::remote::ContentStream;

/// One in-progress read session over a file's content
pub struct OpenHandle {
    name: String,
    /// `None` once released
    stream: Option<ContentStream>,
    /// Bytes handed out so far
    position: u64,
}

impl OpenHandle {
    pub(crate) fn new(name: impl Into<String>, stream: ContentStream) -> Self {
        Self {
            name: name.into(),
            stream: Some(stream),
            position: 0,
        }
    }

    /// Name of the file this handle reads
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logical stream position: total bytes returned by `read`
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read up to `size` bytes from the current stream position.
    ///
    /// Fewer bytes than requested are returned only at end of stream;
    /// an empty buffer means the content is exhausted.
    pub async fn read(&mut self, size: u32) -> Result<Bytes> {
        let stream = self.stream.as_mut().ok_or_else(|| {
            DriveFsError::Io(io::Error::from_raw_os_error(libc::EBADF))
        })?;

        let size = size as usize;
        let mut buf = vec![0u8; size];
        let mut filled = 0;
        while filled < size {
            let n = stream.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);

        self.position += filled as u64;
        trace!("read {} of {} bytes from {:?}", filled, size, self.name);
        Ok(Bytes::from(buf))
    }

    /// Close the underlying stream.
    ///
    /// Returns `false` if the handle was already released.
    pub fn release(&mut self) -> bool {
        match self.stream.take() {
            Some(stream) => {
                drop(stream);
                debug!("file handle for {:?} closed after {} bytes", self.name, self.position);
                true
            }
            None => false,
        }
    }
}

impl Drop for OpenHandle {
    fn drop(&mut self) {
        self.release();
    }
}
