use std::time::Duration;

use apduwire_frame::{
    decode_response_frame, encode, incomplete_frame, ResponseFrame, StatusClass,
    DEFAULT_MAX_PAYLOAD,
};
use apduwire_transport::Connection;
use bytes::{Bytes, BytesMut};
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

use crate::config::{TransportConfig, DEFAULT_TIMEOUT};
use crate::error::{ExchangeError, Result};

/// Where the controller is in the request/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// Ready to accept the next exchange.
    Idle,
    /// A request was written and its response has not been classified.
    AwaitingResponse,
    /// The last exchange returned a payload.
    Resolved,
    /// The last exchange hit its deadline.
    TimedOut,
    /// The last exchange failed for any other reason.
    Failed,
}

impl ExchangeState {
    /// Lowercase label used in logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            ExchangeState::Idle => "idle",
            ExchangeState::AwaitingResponse => "awaiting_response",
            ExchangeState::Resolved => "resolved",
            ExchangeState::TimedOut => "timed_out",
            ExchangeState::Failed => "failed",
        }
    }
}

/// Interpret a decoded response by its status word.
pub fn classify(frame: ResponseFrame) -> Result<Bytes> {
    match frame.status.class() {
        StatusClass::Success => Ok(frame.payload),
        StatusClass::Continuation => Err(ExchangeError::UnhandledContinuation(frame.status)),
        StatusClass::Other => Err(ExchangeError::InvalidStatusCode(frame.status)),
    }
}

enum Wake {
    Read(apduwire_transport::Result<usize>),
    Deadline,
}

/// Drives one request/response cycle at a time over a [`Connection`].
///
/// `exchange` takes `&mut self`, so a second exchange cannot start while one
/// is pending. If a pending exchange future is dropped, the state stays
/// [`ExchangeState::AwaitingResponse`] and the next call treats the missing
/// response as orphaned.
#[derive(Debug)]
pub struct ExchangeController {
    state: ExchangeState,
    last_outcome: Option<ExchangeState>,
    inbound: BytesMut,
    timeout: Duration,
    max_payload: usize,
    discard_late: bool,
}

impl ExchangeController {
    /// Controller with default limits and the given deadline.
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: ExchangeState::Idle,
            last_outcome: None,
            inbound: BytesMut::new(),
            timeout,
            max_payload: DEFAULT_MAX_PAYLOAD,
            discard_late: true,
        }
    }

    /// Controller with the deadline, payload limit and late-response policy
    /// taken from `config`.
    pub fn from_config(config: &TransportConfig) -> Self {
        Self {
            max_payload: config.max_response_payload,
            discard_late: config.discard_late_responses,
            ..Self::new(config.timeout)
        }
    }

    /// Current state. Returns to `Idle` after every completed exchange.
    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Terminal state of the most recent completed exchange.
    pub fn last_outcome(&self) -> Option<ExchangeState> {
        self.last_outcome
    }

    /// Per-exchange deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `apdu` and wait for its response payload.
    ///
    /// Exactly one outcome is produced: the payload of a `0x9000` response,
    /// or an error. The deadline starts before the request is written. Every
    /// outcome, including a rejection before the write, is recorded in
    /// [`last_outcome`](Self::last_outcome) and leaves the controller `Idle`.
    pub async fn exchange(&mut self, conn: &mut Connection, apdu: &[u8]) -> Result<Bytes> {
        let outcome = self.run(conn, apdu).await;
        self.finish(outcome)
    }

    async fn run(&mut self, conn: &mut Connection, apdu: &[u8]) -> Result<Bytes> {
        if !conn.is_open() {
            return Err(ExchangeError::Closed);
        }
        if self.state == ExchangeState::AwaitingResponse {
            warn!(
                addr = %conn.peer_addr(),
                "previous exchange was abandoned before its response arrived"
            );
        }

        let request = encode(apdu)?;
        self.discard_stale(conn).await?;

        self.state = ExchangeState::AwaitingResponse;
        let deadline = Instant::now() + self.timeout;
        debug!(addr = %conn.peer_addr(), len = apdu.len(), "sending request");

        conn.write_all(&request).await?;
        let frame = self.await_response(conn, deadline).await?;
        classify(frame)
    }

    async fn discard_stale(&mut self, conn: &mut Connection) -> Result<()> {
        if !self.discard_late {
            return Ok(());
        }

        let mut dropped = self.inbound.len();
        self.inbound.clear();
        dropped += conn.discard_buffered().await?;
        if dropped > 0 {
            warn!(
                addr = %conn.peer_addr(),
                dropped,
                "discarding late response bytes from an earlier exchange"
            );
        }
        Ok(())
    }

    async fn await_response(
        &mut self,
        conn: &mut Connection,
        deadline: Instant,
    ) -> Result<ResponseFrame> {
        let sleep = time::sleep_until(deadline);
        tokio::pin!(sleep);

        loop {
            if let Some(frame) = decode_response_frame(&mut self.inbound, self.max_payload)? {
                debug!(
                    len = frame.payload.len(),
                    status = %frame.status,
                    "response frame decoded"
                );
                return Ok(frame);
            }

            // Once the connection is gone only the deadline can end the wait.
            let wake = tokio::select! {
                biased;
                read = conn.read_chunk(&mut self.inbound), if conn.is_open() => Wake::Read(read),
                () = &mut sleep => Wake::Deadline,
            };

            match wake {
                Wake::Read(Ok(0)) => {
                    debug!("peer closed the stream while a response was pending");
                }
                Wake::Read(Ok(n)) => {
                    trace!(n, buffered = self.inbound.len(), "response bytes received");
                }
                Wake::Read(Err(err)) => {
                    debug!(error = %err, "stream error while a response was pending");
                }
                Wake::Deadline if self.inbound.is_empty() => {
                    return Err(ExchangeError::Timeout(self.timeout));
                }
                Wake::Deadline => return Err(incomplete_frame(&self.inbound).into()),
            }
        }
    }

    fn finish(&mut self, outcome: Result<Bytes>) -> Result<Bytes> {
        let terminal = match &outcome {
            Ok(payload) => {
                debug!(len = payload.len(), "exchange resolved");
                ExchangeState::Resolved
            }
            Err(ExchangeError::Timeout(timeout)) => {
                warn!(?timeout, "exchange timed out");
                ExchangeState::TimedOut
            }
            Err(err) => {
                debug!(error = %err, "exchange failed");
                ExchangeState::Failed
            }
        };
        self.last_outcome = Some(terminal);
        self.state = ExchangeState::Idle;
        outcome
    }
}

impl Default for ExchangeController {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}
