//! Error types shared by all backends.

use thiserror::Error;

/// Failure modes of listing and download operations.
///
/// Both backends speak this vocabulary, so the boundary layer can map errors
/// to status codes without knowing which backend served the request. Errors
/// propagate unchanged; no operation retries internally.
#[derive(Debug, Error)]
pub enum VfsError {
    /// The target path does not exist, or a file could not be sized.
    #[error("path does not exist: {0}")]
    NotFound(String),

    /// A listing was requested on something that is not a directory.
    #[error("path is not a directory: {0}")]
    NotADirectory(String),

    /// A download was requested on a directory.
    #[error("path is a directory: {0}")]
    IsADirectory(String),

    /// The backend returned malformed or unrecognized entry metadata.
    /// A single bad entry aborts the whole listing.
    #[error("malformed listing entry: {0}")]
    Parse(String),

    /// The backend violated its protocol (unexpected FTP reply, truncated
    /// exchange, refused transfer).
    #[error("backend protocol error: {0}")]
    Protocol(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
