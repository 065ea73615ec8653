use std::fmt;
use std::io::ErrorKind;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::address::PeerAddress;
use crate::diagnostics::{Diagnostics, Direction};
use crate::error::{Result, TransportError};

const DRAIN_CHUNK_SIZE: usize = 4 * 1024;

/// One live TCP connection to a peer.
///
/// Any stream-level failure observed while reading or writing closes the
/// connection; a closed connection is never reopened.
pub struct Connection {
    stream: TcpStream,
    addr: PeerAddress,
    idle_timeout: Duration,
    diagnostics: Diagnostics,
    open: bool,
}

impl Connection {
    /// Connect to `address` (`host:port`) with the default diagnostics hook.
    pub async fn open(address: &str, idle_timeout: Duration) -> Result<Self> {
        Self::open_with_diagnostics(address, idle_timeout, Diagnostics::default()).await
    }

    /// Connect to `address` with an explicit diagnostics hook.
    ///
    /// The idle timeout bounds how long the connect may take.
    pub async fn open_with_diagnostics(
        address: &str,
        idle_timeout: Duration,
        diagnostics: Diagnostics,
    ) -> Result<Self> {
        let addr = PeerAddress::parse(address)?;
        Self::connect(addr, idle_timeout, diagnostics).await
    }

    /// Connect to an already parsed address.
    pub async fn connect(
        addr: PeerAddress,
        idle_timeout: Duration,
        diagnostics: Diagnostics,
    ) -> Result<Self> {
        let connect = TcpStream::connect((addr.host(), addr.port()));
        let stream = match tokio::time::timeout(idle_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(TransportError::Connect {
                    addr: addr.to_string(),
                    source,
                })
            }
            Err(_) => {
                return Err(TransportError::ConnectTimeout {
                    addr: addr.to_string(),
                    timeout: idle_timeout,
                })
            }
        };

        if let Err(err) = stream.set_nodelay(true) {
            debug!(%addr, error = %err, "failed to set TCP_NODELAY");
        }

        info!(%addr, ?idle_timeout, "connected to peer");

        Ok(Self {
            stream,
            addr,
            idle_timeout,
            diagnostics,
            open: true,
        })
    }

    /// Write a complete buffer and flush it.
    pub async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.diagnostics.observe(Direction::Outbound, bytes);

        let written = async {
            self.stream.write_all(bytes).await?;
            self.stream.flush().await
        }
        .await;

        if let Err(err) = written {
            self.teardown(&err).await;
            return Err(TransportError::Io(err));
        }
        Ok(())
    }

    /// Read whatever the peer has sent next and append it to `buf`.
    ///
    /// Returns the number of bytes appended; `0` means the peer closed the
    /// stream, in which case the connection is closed too. Cancel safe: if the
    /// future is dropped before completion no bytes are lost.
    pub async fn read_chunk(&mut self, buf: &mut BytesMut) -> Result<usize> {
        self.ensure_open()?;

        let start = buf.len();
        match self.stream.read_buf(buf).await {
            Ok(0) => {
                self.teardown(&"peer closed the stream").await;
                Ok(0)
            }
            Ok(n) => {
                self.diagnostics.observe(Direction::Inbound, &buf[start..]);
                Ok(n)
            }
            Err(err) => {
                self.teardown(&err).await;
                Err(TransportError::Io(err))
            }
        }
    }

    /// Discard bytes that already arrived without waiting for more.
    ///
    /// Returns how many bytes were dropped. Hitting end-of-stream closes the
    /// connection.
    pub async fn discard_buffered(&mut self) -> Result<usize> {
        self.ensure_open()?;

        let mut scratch = [0u8; DRAIN_CHUNK_SIZE];
        let mut discarded = 0usize;
        loop {
            match self.stream.try_read(&mut scratch) {
                Ok(0) => {
                    self.teardown(&"peer closed the stream").await;
                    break;
                }
                Ok(n) => {
                    self.diagnostics.observe(Direction::Inbound, &scratch[..n]);
                    discarded += n;
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.teardown(&err).await;
                    return Err(TransportError::Io(err));
                }
            }
        }
        Ok(discarded)
    }

    /// Gracefully half-close the stream. Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;

        match self.stream.shutdown().await {
            Ok(()) => {
                info!(addr = %self.addr, "connection closed");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(TransportError::Shutdown(err)),
        }
    }

    /// Whether the connection is still usable.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The peer this connection was opened to.
    pub fn peer_addr(&self) -> &PeerAddress {
        &self.addr
    }

    /// Idle timeout the connection was opened with.
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Diagnostics attached to this connection.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Toggle raw byte diagnostics.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.diagnostics.set_enabled(verbose);
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(TransportError::Closed)
        }
    }

    async fn teardown(&mut self, cause: &(dyn fmt::Display + Sync)) {
        if !self.open {
            return;
        }
        warn!(addr = %self.addr, %cause, "stream error, closing connection");
        self.open = false;
        let _ = self.stream.shutdown().await;
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("addr", &self.addr)
            .field("idle_timeout", &self.idle_timeout)
            .field("open", &self.open)
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}
