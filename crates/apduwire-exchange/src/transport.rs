use std::future::Future;
use std::time::Duration;

use apduwire_transport::{Connection, Discovery, PeerAddress};
use bytes::Bytes;
use tracing::debug;

use crate::config::TransportConfig;
use crate::controller::{ExchangeController, ExchangeState};
use crate::error::Result;

/// Request/response transport to one APDU peer.
pub trait ApduTransport {
    /// Send one APDU and wait for the response payload.
    fn exchange(&mut self, apdu: &[u8]) -> impl Future<Output = Result<Bytes>> + Send;

    /// Close the underlying connection. Idempotent.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Store an application scramble key. Never used for framing.
    fn set_scramble_key(&mut self, key: Option<String>);

    /// Whether raw bytes are passed to the diagnostics hook.
    fn verbose(&self) -> bool;

    /// Toggle raw byte diagnostics.
    fn set_verbose(&mut self, verbose: bool);
}

/// APDU transport over a persistent TCP connection.
///
/// # Example
///
/// ```no_run
/// # async fn demo() -> apduwire_exchange::Result<()> {
/// use std::time::Duration;
/// use apduwire_exchange::TcpTransport;
///
/// let mut transport = TcpTransport::open("127.0.0.1:9999", Duration::from_secs(30)).await?;
/// let response = transport.exchange(&[0xE0, 0x01, 0x00, 0x00, 0x00]).await?;
/// println!("{} bytes", response.len());
/// transport.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TcpTransport {
    connection: Connection,
    controller: ExchangeController,
    scramble_key: Option<String>,
}

impl TcpTransport {
    /// Connect with default settings and the given timeout.
    pub async fn open(address: &str, timeout: Duration) -> Result<Self> {
        Self::open_with_config(address, TransportConfig::default().with_timeout(timeout)).await
    }

    /// Connect with explicit configuration.
    pub async fn open_with_config(address: &str, config: TransportConfig) -> Result<Self> {
        let connection =
            Connection::open_with_diagnostics(address, config.timeout, config.diagnostics())
                .await?;
        Ok(Self {
            connection,
            controller: ExchangeController::from_config(&config),
            scramble_key: None,
        })
    }

    /// Send one APDU and wait for the response payload.
    pub async fn exchange(&mut self, apdu: &[u8]) -> Result<Bytes> {
        self.controller.exchange(&mut self.connection, apdu).await
    }

    /// Gracefully close the connection. Later exchanges fail with
    /// [`ExchangeError::Closed`](crate::ExchangeError::Closed).
    pub async fn close(&mut self) -> Result<()> {
        self.connection.close().await?;
        Ok(())
    }

    pub fn set_scramble_key(&mut self, key: Option<String>) {
        debug!(set = key.is_some(), "scramble key updated");
        self.scramble_key = key;
    }

    pub fn scramble_key(&self) -> Option<&str> {
        self.scramble_key.as_deref()
    }

    pub fn verbose(&self) -> bool {
        self.connection.diagnostics().is_enabled()
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.connection.set_verbose(verbose);
    }

    /// Per-exchange deadline.
    pub fn timeout(&self) -> Duration {
        self.controller.timeout()
    }

    pub fn peer_addr(&self) -> &PeerAddress {
        self.connection.peer_addr()
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_open()
    }

    /// Exchange controller state.
    pub fn state(&self) -> ExchangeState {
        self.controller.state()
    }

    /// Terminal state of the most recent exchange.
    pub fn last_outcome(&self) -> Option<ExchangeState> {
        self.controller.last_outcome()
    }
}

impl ApduTransport for TcpTransport {
    async fn exchange(&mut self, apdu: &[u8]) -> Result<Bytes> {
        TcpTransport::exchange(self, apdu).await
    }

    async fn close(&mut self) -> Result<()> {
        TcpTransport::close(self).await
    }

    fn set_scramble_key(&mut self, key: Option<String>) {
        TcpTransport::set_scramble_key(self, key);
    }

    fn verbose(&self) -> bool {
        TcpTransport::verbose(self)
    }

    fn set_verbose(&mut self, verbose: bool) {
        TcpTransport::set_verbose(self, verbose);
    }
}

// TCP peers are addressed explicitly.
impl Discovery for TcpTransport {
    type Descriptor = PeerAddress;
}
