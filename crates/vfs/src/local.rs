//! Local filesystem backend.
//!
//! Paths resolve under a configured root directory. Filesystem calls are
//! plain blocking syscalls issued through `tokio::fs`; independent handles
//! are safely concurrent, so no serialization is needed here.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::backend::{Backend, FileHandle, DOWNLOAD_BLOCK_SIZE};
use crate::entry::{format_modified, DirEntry, EntryType};
use crate::error::VfsError;
use crate::path::TreePath;
use crate::size::FileSize;

/// Backend serving a subtree of the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create a backend rooted at `root`. The root itself is not checked
    /// until the first operation touches it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The configured root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn metadata_of(&self, fs_path: &Path, tree_path: &TreePath) -> Result<std::fs::Metadata, VfsError> {
        fs::metadata(fs_path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                VfsError::NotFound(tree_path.full_path().to_string())
            } else {
                VfsError::Io(e)
            }
        })
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn list(&self, path: &TreePath) -> Result<Vec<DirEntry>, VfsError> {
        let fs_path = path.to_fs_path(&self.root);
        let metadata = self.metadata_of(&fs_path, path).await?;

        if !metadata.is_dir() {
            return Err(VfsError::NotADirectory(path.full_path().to_string()));
        }

        let mut dir = fs::read_dir(&fs_path).await?;
        let mut entries = Vec::new();

        while let Some(child) = dir.next_entry().await? {
            let name = child.file_name().to_string_lossy().to_string();
            // Follow symlinks, like a plain stat would.
            let child_meta = fs::metadata(child.path()).await?;

            let modified: DateTime<Utc> = child_meta.modified()?.into();

            entries.push(DirEntry {
                entry_type: EntryType::from_metadata(&child_meta),
                name,
                size: FileSize::new(child_meta.len()),
                modified: format_modified(modified),
            });
        }

        // Enumeration order is OS-dependent; sort by name so responses are
        // deterministic.
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(path = %path, count = entries.len(), "listed local directory");
        Ok(entries)
    }

    async fn open(&self, path: &TreePath) -> Result<FileHandle, VfsError> {
        let fs_path = path.to_fs_path(&self.root);
        let metadata = self.metadata_of(&fs_path, path).await?;

        if metadata.is_dir() {
            return Err(VfsError::IsADirectory(path.full_path().to_string()));
        }

        let file = fs::File::open(&fs_path).await?;
        let stream = ReaderStream::with_capacity(file, DOWNLOAD_BLOCK_SIZE).boxed();

        debug!(path = %path, size = metadata.len(), "opened local file for download");
        Ok(FileHandle {
            file_name: path.file_name().to_string(),
            file_size: metadata.len(),
            stream,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;
    use tempfile::TempDir;

    fn create_test_tree(dir: &Path) {
        std::fs::create_dir_all(dir.join("A")).unwrap();
        std::fs::write(dir.join("A/B.mp4"), vec![0u8; 2048]).unwrap();
        std::fs::write(dir.join("C.mkv"), b"not really a video").unwrap();
    }

    #[tokio::test]
    async fn test_list_root() {
        let temp_dir = TempDir::new().unwrap();
        create_test_tree(temp_dir.path());

        let backend = LocalBackend::new(temp_dir.path());
        let entries = backend.list(&TreePath::new("/")).await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "A");
        assert!(entries[0].is_directory());
        assert_eq!(entries[1].name, "C.mkv");
        assert!(entries[1].is_file());
        assert_eq!(entries[1].size.bytes(), 18);
    }

    #[tokio::test]
    async fn test_list_subdirectory() {
        let temp_dir = TempDir::new().unwrap();
        create_test_tree(temp_dir.path());

        let backend = LocalBackend::new(temp_dir.path());
        let entries = backend.list(&TreePath::new("A")).await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "B.mp4");
        assert!(entries[0].is_file());
        assert_eq!(entries[0].size.bytes(), 2048);
        // 2024-ish timestamp, formatted as YYYY-MM-DD HH:MM:SS.
        assert_eq!(entries[0].modified.len(), 19);
    }

    #[tokio::test]
    async fn test_list_missing_path_is_not_found() {
        let temp_dir = TempDir::new().unwrap();

        let backend = LocalBackend::new(temp_dir.path());
        let result = backend.list(&TreePath::new("nope")).await;

        assert!(matches!(result, Err(VfsError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_file_is_not_a_directory() {
        let temp_dir = TempDir::new().unwrap();
        create_test_tree(temp_dir.path());

        let backend = LocalBackend::new(temp_dir.path());
        let result = backend.list(&TreePath::new("C.mkv")).await;

        assert!(matches!(result, Err(VfsError::NotADirectory(_))));
    }

    #[tokio::test]
    async fn test_list_entries_sorted_by_name() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("zebra.txt"), "z").unwrap();
        std::fs::write(temp_dir.path().join("apple.txt"), "a").unwrap();
        std::fs::write(temp_dir.path().join("mango.txt"), "m").unwrap();

        let backend = LocalBackend::new(temp_dir.path());
        let entries = backend.list(&TreePath::new("/")).await.unwrap();

        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["apple.txt", "mango.txt", "zebra.txt"]);
    }

    #[tokio::test]
    async fn test_open_exposes_name_and_size_up_front() {
        let temp_dir = TempDir::new().unwrap();
        create_test_tree(temp_dir.path());

        let backend = LocalBackend::new(temp_dir.path());
        let handle = backend.open(&TreePath::new("A/B.mp4")).await.unwrap();

        assert_eq!(handle.file_name, "B.mp4");
        assert_eq!(handle.file_size, 2048);
    }

    #[tokio::test]
    async fn test_open_missing_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();

        let backend = LocalBackend::new(temp_dir.path());
        let result = backend.open(&TreePath::new("missing.bin")).await;

        assert!(matches!(result, Err(VfsError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_open_directory_is_a_directory() {
        let temp_dir = TempDir::new().unwrap();
        create_test_tree(temp_dir.path());

        let backend = LocalBackend::new(temp_dir.path());
        let result = backend.open(&TreePath::new("A")).await;

        assert!(matches!(result, Err(VfsError::IsADirectory(_))));
    }

    #[tokio::test]
    async fn test_drained_stream_yields_exactly_file_size_bytes() {
        let temp_dir = TempDir::new().unwrap();
        // Larger than one block so the stream has to chunk.
        let content: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(temp_dir.path().join("big.bin"), &content).unwrap();

        let backend = LocalBackend::new(temp_dir.path());
        let handle = backend.open(&TreePath::new("big.bin")).await.unwrap();
        assert_eq!(handle.file_size, content.len() as u64);

        let blocks: Vec<bytes::Bytes> = handle.stream.try_collect().await.unwrap();
        assert!(blocks.len() > 1);
        let drained: Vec<u8> = blocks.concat();
        assert_eq!(drained, content);
    }
}
