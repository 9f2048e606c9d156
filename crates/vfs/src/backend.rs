//! The backend trait: one listing/streaming contract, two implementations.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::entry::DirEntry;
use crate::error::VfsError;
use crate::path::TreePath;

/// Block size for download streams. Bounds per-request memory regardless of
/// file size.
pub const DOWNLOAD_BLOCK_SIZE: usize = 8192;

/// A pull-based, finite sequence of byte blocks.
///
/// The underlying backend resource (file descriptor or FTP data connection)
/// is released when the stream is dropped, whether it was drained to the end
/// or abandoned mid-transfer.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// An open file ready for download.
///
/// `file_name` and `file_size` are available before any byte is read, so the
/// caller can emit response headers up front. Draining `stream` yields
/// exactly `file_size` bytes, in order. The handle is owned by the request
/// that created it and lives for at most one response.
pub struct FileHandle {
    /// Name of the file (final path segment).
    pub file_name: String,
    /// Total size in bytes.
    pub file_size: u64,
    /// The byte channel.
    pub stream: ByteStream,
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("file_name", &self.file_name)
            .field("file_size", &self.file_size)
            .finish_non_exhaustive()
    }
}

/// A tree backend: lists directories and opens files for streaming.
///
/// Both operations take a normalized [`TreePath`] and fail with the shared
/// [`VfsError`] taxonomy, so callers never branch on the backend kind.
#[async_trait]
pub trait Backend: Send + Sync {
    /// List the immediate children of the directory at `path`.
    ///
    /// Fails with [`VfsError::NotFound`] when the path does not exist and
    /// [`VfsError::NotADirectory`] when it exists but is not a directory.
    /// The returned sequence is finite and fully drained by the caller
    /// before the backend is reused.
    async fn list(&self, path: &TreePath) -> Result<Vec<DirEntry>, VfsError>;

    /// Open the file at `path` for a streamed download.
    ///
    /// Fails with [`VfsError::NotFound`] when the path does not exist (or
    /// cannot be sized) and [`VfsError::IsADirectory`] when it resolves to a
    /// directory.
    async fn open(&self, path: &TreePath) -> Result<FileHandle, VfsError>;
}
