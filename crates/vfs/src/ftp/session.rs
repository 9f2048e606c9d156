//! The shared FTP control-connection session.
//!
//! One control connection serves every request for the lifetime of the
//! process. The FTP protocol is strictly request/reply on that channel, so
//! the connection lives behind a mutex and every operation runs under the
//! lock; downloads hold it for the whole transfer. A `pending_transfer`
//! flag records that a completion reply is still owed (a consumer walked
//! away mid-download), and the next operation drains it before issuing its
//! own command.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, trace, warn};

use crate::error::VfsError;

/// Connection settings for the FTP backend.
#[derive(Debug, Clone)]
pub struct FtpConfig {
    /// Server host name or address.
    pub host: String,
    /// Control-connection port.
    pub port: u16,
    /// Login user, e.g. `anonymous`.
    pub user: String,
    /// Login password. May be empty for anonymous servers.
    pub password: String,
    /// Base directory prefixed onto every tree path.
    pub base_dir: String,
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 21,
            user: "anonymous".to_string(),
            password: String::new(),
            base_dir: String::new(),
        }
    }
}

/// A parsed control-channel reply.
#[derive(Debug)]
pub(crate) struct Reply {
    pub code: u16,
    pub text: String,
}

/// The raw control connection. Only reachable through the session mutex.
pub(crate) struct FtpConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    /// True while a data transfer's completion reply has not been read yet.
    pub(crate) pending_transfer: bool,
}

impl FtpConnection {
    /// Send one command line.
    pub(crate) async fn send_command(&mut self, command: &str) -> Result<(), VfsError> {
        trace!(command, "ftp >");
        self.writer
            .write_all(format!("{command}\r\n").as_bytes())
            .await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Read one (possibly multi-line) reply.
    pub(crate) async fn read_reply(&mut self) -> Result<Reply, VfsError> {
        let first = self.read_control_line().await?;
        if first.len() < 3 {
            return Err(VfsError::Protocol(format!("short FTP reply: {first:?}")));
        }
        let code: u16 = first[..3]
            .parse()
            .map_err(|_| VfsError::Protocol(format!("unparsable FTP reply: {first:?}")))?;

        let mut text = first[3..].trim_start_matches([' ', '-']).to_string();

        // Multi-line replies run until a line that repeats the code followed
        // by a space.
        if first.as_bytes().get(3) == Some(&b'-') {
            let terminator = format!("{code} ");
            loop {
                let line = self.read_control_line().await?;
                let done = line.starts_with(&terminator);
                text.push('\n');
                text.push_str(line.trim_start_matches(&terminator));
                if done {
                    break;
                }
            }
        }

        trace!(code, "ftp <");
        Ok(Reply { code, text })
    }

    async fn read_control_line(&mut self) -> Result<String, VfsError> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(VfsError::Protocol(
                "FTP control connection closed by server".to_string(),
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Send a command and read its reply.
    pub(crate) async fn command(&mut self, command: &str) -> Result<Reply, VfsError> {
        self.send_command(command).await?;
        self.read_reply().await
    }

    /// Drain the completion reply left behind by an abandoned transfer.
    ///
    /// The server sends `426` (aborted) or `226` once it notices the closed
    /// data connection; either way the channel is clean afterwards.
    pub(crate) async fn resync(&mut self) -> Result<(), VfsError> {
        if self.pending_transfer {
            let reply = self.read_reply().await?;
            debug!(code = reply.code, "drained stale transfer reply");
            self.pending_transfer = false;
        }
        Ok(())
    }

    /// Enter passive mode and open the data connection the server offers.
    pub(crate) async fn open_data_connection(&mut self) -> Result<TcpStream, VfsError> {
        let reply = self.command("PASV").await?;
        if reply.code != 227 {
            return Err(VfsError::Protocol(format!(
                "PASV refused: {} {}",
                reply.code, reply.text
            )));
        }
        let (host, port) = parse_pasv(&reply.text).ok_or_else(|| {
            VfsError::Protocol(format!("unparsable PASV reply: {}", reply.text))
        })?;

        let data = TcpStream::connect((host.as_str(), port)).await?;
        Ok(data)
    }

    /// Consume the completion reply of a finished transfer.
    pub(crate) async fn finish_transfer(&mut self) -> Result<(), VfsError> {
        let reply = self.read_reply().await?;
        self.pending_transfer = false;
        if reply.code != 226 && reply.code != 250 {
            warn!(code = reply.code, text = %reply.text, "unexpected transfer completion reply");
        }
        Ok(())
    }
}

/// Extract host and port from a `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)`
/// reply. Tolerates servers that omit the parentheses.
fn parse_pasv(text: &str) -> Option<(String, u16)> {
    let numbers: Vec<u16> = text
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse().ok())
        .collect();
    let fields = numbers.windows(6).last()?;
    let &[h1, h2, h3, h4, p1, p2] = fields else {
        return None;
    };
    if h1 > 255 || h2 > 255 || h3 > 255 || h4 > 255 || p1 > 255 || p2 > 255 {
        return None;
    }
    Some((format!("{h1}.{h2}.{h3}.{h4}"), p1 * 256 + p2))
}

/// An explicitly owned FTP session, shared across requests.
///
/// Created once at startup and torn down with [`quit`](Self::quit) at
/// shutdown. Cloning is cheap; all clones share the one control connection.
#[derive(Clone)]
pub struct FtpSession {
    conn: Arc<Mutex<FtpConnection>>,
}

impl FtpSession {
    /// Connect and log in.
    ///
    /// Performs the greeting, `USER`/`PASS` exchange, switches to binary
    /// transfers (`TYPE I`) and offers UTF-8 on the control channel.
    pub async fn connect(config: &FtpConfig) -> Result<Self, VfsError> {
        let stream = TcpStream::connect((config.host.as_str(), config.port)).await?;
        let (read_half, write_half) = stream.into_split();
        let mut conn = FtpConnection {
            reader: BufReader::new(read_half),
            writer: write_half,
            pending_transfer: false,
        };

        let greeting = conn.read_reply().await?;
        if greeting.code != 220 {
            return Err(VfsError::Protocol(format!(
                "unexpected FTP greeting: {} {}",
                greeting.code, greeting.text
            )));
        }

        let reply = conn.command(&format!("USER {}", config.user)).await?;
        match reply.code {
            230 => {}
            331 => {
                let reply = conn.command(&format!("PASS {}", config.password)).await?;
                if reply.code != 230 {
                    return Err(VfsError::Protocol(format!(
                        "FTP login refused: {} {}",
                        reply.code, reply.text
                    )));
                }
            }
            _ => {
                return Err(VfsError::Protocol(format!(
                    "FTP USER refused: {} {}",
                    reply.code, reply.text
                )));
            }
        }

        // Sizes and downloads assume binary mode.
        let reply = conn.command("TYPE I").await?;
        if reply.code != 200 {
            return Err(VfsError::Protocol(format!(
                "TYPE I refused: {} {}",
                reply.code, reply.text
            )));
        }

        // Best effort; listing names default to the server's local encoding
        // otherwise.
        let _ = conn.command("OPTS UTF8 ON").await?;

        debug!(host = %config.host, port = config.port, "FTP session established");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Take the control connection, draining any stale transfer reply first.
    ///
    /// The guard is owned, so download streams can carry it across the whole
    /// transfer; everyone else queues behind them.
    pub(crate) async fn acquire(&self) -> Result<OwnedMutexGuard<FtpConnection>, VfsError> {
        let mut guard = self.conn.clone().lock_owned().await;
        guard.resync().await?;
        Ok(guard)
    }

    /// Close the session politely.
    pub async fn quit(&self) -> Result<(), VfsError> {
        let mut conn = self.acquire().await?;
        conn.send_command("QUIT").await?;
        // 221 expected, but we are leaving either way.
        let _ = conn.read_reply().await;
        Ok(())
    }
}
