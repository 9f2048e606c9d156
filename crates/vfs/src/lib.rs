//! # Treeserve VFS Library
//!
//! This crate provides the core of Treeserve: a single contract for listing
//! and downloading files from a remote tree, served by two structurally
//! different backends (local filesystem and FTP) with identical semantics.
//!
//! ## Overview
//!
//! - **Path normalization**: [`TreePath`] wraps a user-supplied relative path
//!   into a canonical `/`-delimited form and derives the breadcrumb trail
//!   used for navigation.
//! - **Entry listing**: [`Backend::list`] produces directory entries with
//!   type, name, human-readable size and UTC modification time.
//! - **File streaming**: [`Backend::open`] yields a [`FileHandle`] whose name
//!   and size are known up front and whose bytes arrive in bounded blocks,
//!   so arbitrarily large files never sit in memory.
//! - **Error taxonomy**: [`VfsError`] is shared by both backends and maps
//!   one-to-one onto the HTTP status contract of the daemon crate.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 TreePath                     │  normalize + breadcrumbs
//! ├──────────────────────┬───────────────────────┤
//! │     LocalBackend     │      FtpBackend       │  impl Backend
//! │  (stat / read_dir /  │  (MLSD / SIZE / RETR  │
//! │   ReaderStream)      │   over FtpSession)    │
//! ├──────────────────────┴───────────────────────┤
//! │        DirEntry · FileHandle · VfsError      │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`path`]: Normalized path value object
//! - [`size`]: Human-readable file size formatting with a bounded memo table
//! - [`entry`]: Entry type and directory entry model
//! - [`backend`]: The `Backend` trait and streaming file handles
//! - [`local`]: Local filesystem backend
//! - [`ftp`]: FTP backend and the shared control-connection session
//! - [`error`]: Error types

pub mod backend;
pub mod entry;
pub mod error;
pub mod ftp;
pub mod local;
pub mod path;
pub mod size;

pub use backend::{Backend, ByteStream, FileHandle, DOWNLOAD_BLOCK_SIZE};
pub use entry::{DirEntry, EntryType};
pub use error::VfsError;
pub use ftp::{FtpBackend, FtpConfig, FtpSession};
pub use local::LocalBackend;
pub use path::TreePath;
pub use size::FileSize;
