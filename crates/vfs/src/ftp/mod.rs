//! FTP backend: MLSD listings and streamed RETR downloads.
//!
//! All control-channel traffic goes through the shared [`FtpSession`];
//! transfers run on transient passive-mode data connections. Download
//! streams serve fixed 8192-byte blocks and keep the session locked until
//! the transfer completes or the consumer drops the stream, so concurrent
//! requests serialize instead of corrupting each other's exchange.

mod session;

pub use session::{FtpConfig, FtpSession};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDateTime;
use futures_util::stream;
use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use crate::backend::{Backend, ByteStream, FileHandle, DOWNLOAD_BLOCK_SIZE};
use crate::entry::{DirEntry, EntryType, MODIFIED_FORMAT};
use crate::error::VfsError;
use crate::path::TreePath;
use crate::size::FileSize;

use session::FtpConnection;

/// Backend serving a tree hosted on an FTP server.
#[derive(Clone)]
pub struct FtpBackend {
    session: FtpSession,
    base_dir: String,
}

impl FtpBackend {
    /// Wrap an established session. `base_dir` is prefixed onto every path;
    /// a trailing slash on it is dropped so joins stay single-slashed.
    pub fn new(session: FtpSession, base_dir: impl Into<String>) -> Self {
        let base_dir = base_dir.into().trim_end_matches('/').to_string();
        Self { session, base_dir }
    }

    /// The remote form of a tree path, suitable for `SIZE`/`RETR`
    /// (no trailing slash).
    fn remote_file_path(&self, path: &TreePath) -> String {
        let remote = path.with_root(&self.base_dir);
        let trimmed = remote.trim_end_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        }
    }
}

#[async_trait]
impl Backend for FtpBackend {
    async fn list(&self, path: &TreePath) -> Result<Vec<DirEntry>, VfsError> {
        let mut conn = self.session.acquire().await?;
        let remote = path.with_root(&self.base_dir);

        let data = conn.open_data_connection().await?;
        let reply = conn.command(&format!("MLSD {remote}")).await?;
        match reply.code {
            150 | 125 => {}
            550 => return Err(VfsError::NotFound(path.full_path().to_string())),
            _ => {
                return Err(VfsError::Protocol(format!(
                    "MLSD refused: {} {}",
                    reply.code, reply.text
                )));
            }
        }

        let mut lines = BufReader::new(data).lines();
        let mut raw_lines = Vec::new();
        while let Some(line) = lines.next_line().await? {
            if !line.is_empty() {
                raw_lines.push(line);
            }
        }

        let completion = conn.read_reply().await?;
        if completion.code != 226 && completion.code != 250 {
            return Err(VfsError::Protocol(format!(
                "MLSD did not complete: {} {}",
                completion.code, completion.text
            )));
        }
        drop(conn);

        // Parse only after the protocol exchange finished, so a bad line
        // cannot leave the control channel mid-transfer.
        let entries = raw_lines
            .iter()
            .map(|line| parse_mlsd_line(line))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(path = %path, count = entries.len(), "listed FTP directory");
        Ok(entries)
    }

    async fn open(&self, path: &TreePath) -> Result<FileHandle, VfsError> {
        let mut conn = self.session.acquire().await?;
        let remote = self.remote_file_path(path);

        // FTP cannot stat: any SIZE refusal (missing file, directory,
        // permission) surfaces as NotFound.
        let reply = conn.command(&format!("SIZE {remote}")).await?;
        if reply.code != 213 {
            return Err(VfsError::NotFound(path.full_path().to_string()));
        }
        let file_size: u64 = reply.text.trim().parse().map_err(|_| {
            VfsError::Protocol(format!("unparsable SIZE reply: {}", reply.text))
        })?;

        debug!(path = %path, size = file_size, "opening FTP download");
        Ok(FileHandle {
            file_name: path.file_name().to_string(),
            file_size,
            stream: retr_stream(conn, remote),
        })
    }
}

/// Parse one MLSD line: `type=file;size=23095254;modify=20240101123005; B.mp4`.
///
/// The `type`, `size` and `modify` facts are all required; a missing or
/// malformed fact aborts the listing.
fn parse_mlsd_line(line: &str) -> Result<DirEntry, VfsError> {
    let (facts, name) = line
        .split_once(' ')
        .ok_or_else(|| VfsError::Parse(format!("MLSD line has no name: {line:?}")))?;

    let mut entry_type = None;
    let mut size = None;
    let mut modified = None;

    for fact in facts.split(';').filter(|fact| !fact.is_empty()) {
        let (key, value) = fact
            .split_once('=')
            .ok_or_else(|| VfsError::Parse(format!("malformed MLSD fact: {fact:?}")))?;
        match key.to_ascii_lowercase().as_str() {
            "type" => entry_type = Some(EntryType::parse_mlsd_fact(value)?),
            "size" => {
                size = Some(value.parse::<u64>().map_err(|_| {
                    VfsError::Parse(format!("malformed MLSD size fact: {value:?}"))
                })?);
            }
            "modify" => modified = Some(parse_modify_fact(value)?),
            _ => {}
        }
    }

    Ok(DirEntry {
        entry_type: entry_type
            .ok_or_else(|| VfsError::Parse(format!("MLSD line missing type fact: {line:?}")))?,
        name: name.to_string(),
        size: FileSize::new(size.ok_or_else(|| {
            VfsError::Parse(format!("MLSD line missing size fact: {line:?}"))
        })?),
        modified: modified.ok_or_else(|| {
            VfsError::Parse(format!("MLSD line missing modify fact: {line:?}"))
        })?,
    })
}

/// Parse a `modify` fact (`YYYYMMDDHHMMSS`, UTC) into the listing timestamp
/// format.
fn parse_modify_fact(value: &str) -> Result<String, VfsError> {
    let parsed = NaiveDateTime::parse_from_str(value, "%Y%m%d%H%M%S")
        .map_err(|_| VfsError::Parse(format!("malformed MLSD modify fact: {value:?}")))?;
    Ok(parsed.format(MODIFIED_FORMAT).to_string())
}

/// State machine backing an FTP download stream.
enum RetrState {
    /// Nothing sent yet; the data connection opens on the first poll.
    Start {
        conn: OwnedMutexGuard<FtpConnection>,
        remote: String,
    },
    /// Mid-transfer.
    Transfer {
        conn: OwnedMutexGuard<FtpConnection>,
        data: TcpStream,
    },
    Finished,
}

/// Build the pull-based byte stream for a `RETR` transfer.
///
/// The session guard rides inside the stream state: dropping the stream at
/// any point closes the data connection and releases the control channel,
/// with the owed completion reply drained by the next operation.
fn retr_stream(conn: OwnedMutexGuard<FtpConnection>, remote: String) -> ByteStream {
    stream::unfold(RetrState::Start { conn, remote }, |state| async move {
        match state {
            RetrState::Start { mut conn, remote } => {
                match begin_transfer(&mut conn, &remote).await {
                    Ok(data) => read_block(conn, data).await,
                    Err(e) => Some((
                        Err(std::io::Error::other(e.to_string())),
                        RetrState::Finished,
                    )),
                }
            }
            RetrState::Transfer { conn, data } => read_block(conn, data).await,
            RetrState::Finished => None,
        }
    })
    .boxed()
}

async fn begin_transfer(
    conn: &mut FtpConnection,
    remote: &str,
) -> Result<TcpStream, VfsError> {
    let data = conn.open_data_connection().await?;
    conn.send_command(&format!("RETR {remote}")).await?;
    let reply = conn.read_reply().await?;
    if reply.code != 150 && reply.code != 125 {
        return Err(VfsError::Protocol(format!(
            "RETR refused: {} {}",
            reply.code, reply.text
        )));
    }
    // From here on a completion reply is owed on the control channel.
    conn.pending_transfer = true;
    Ok(data)
}

async fn read_block(
    mut conn: OwnedMutexGuard<FtpConnection>,
    mut data: TcpStream,
) -> Option<(std::io::Result<Bytes>, RetrState)> {
    let mut block = vec![0u8; DOWNLOAD_BLOCK_SIZE];
    match data.read(&mut block).await {
        Ok(0) => {
            // End of stream: close the data connection, then settle the
            // control channel before releasing it.
            drop(data);
            match conn.finish_transfer().await {
                Ok(()) => None,
                Err(e) => Some((
                    Err(std::io::Error::other(e.to_string())),
                    RetrState::Finished,
                )),
            }
        }
        Ok(n) => {
            block.truncate(n);
            Some((
                Ok(Bytes::from(block)),
                RetrState::Transfer { conn, data },
            ))
        }
        Err(e) => Some((Err(e), RetrState::Finished)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mlsd_file_line() {
        let entry =
            parse_mlsd_line("type=file;size=23095254;modify=20240101123005; B.mp4").unwrap();
        assert_eq!(entry.entry_type, EntryType::File);
        assert_eq!(entry.name, "B.mp4");
        assert_eq!(entry.size.bytes(), 23095254);
        assert_eq!(entry.modified, "2024-01-01 12:30:05");
    }

    #[test]
    fn test_parse_mlsd_directory_line() {
        let entry = parse_mlsd_line("type=dir;size=4096;modify=20231224180000; Season 1").unwrap();
        assert_eq!(entry.entry_type, EntryType::Directory);
        // Names may contain spaces; everything after the facts belongs to it.
        assert_eq!(entry.name, "Season 1");
    }

    #[test]
    fn test_parse_mlsd_fact_order_does_not_matter() {
        let entry =
            parse_mlsd_line("modify=20240101000000;type=file;size=7; x.txt").unwrap();
        assert_eq!(entry.size.bytes(), 7);
    }

    #[test]
    fn test_parse_mlsd_unknown_type_fact_is_parse_error() {
        let result = parse_mlsd_line("type=cdir;size=0;modify=20240101000000; .");
        assert!(matches!(result, Err(VfsError::Parse(_))));
    }

    #[test]
    fn test_parse_mlsd_missing_facts_are_parse_errors() {
        for line in [
            "size=1;modify=20240101000000; no-type",
            "type=file;modify=20240101000000; no-size",
            "type=file;size=1; no-modify",
        ] {
            assert!(
                matches!(parse_mlsd_line(line), Err(VfsError::Parse(_))),
                "line {line:?}"
            );
        }
    }

    #[test]
    fn test_parse_mlsd_malformed_values_are_parse_errors() {
        for line in [
            "type=file;size=big;modify=20240101000000; x",
            "type=file;size=1;modify=January; x",
            "type=file;size=1;modify=20240101000000.000; x",
            "nofacts",
        ] {
            assert!(
                matches!(parse_mlsd_line(line), Err(VfsError::Parse(_))),
                "line {line:?}"
            );
        }
    }
}
