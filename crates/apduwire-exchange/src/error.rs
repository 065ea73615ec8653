use std::time::Duration;

use apduwire_frame::{FrameError, StatusCode};
use apduwire_transport::TransportError;

/// Errors that can occur in exchange operations.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// The connection could not be established, written, or closed.
    #[error("connection error: {0}")]
    Connection(#[source] TransportError),

    /// No classifiable response arrived before the deadline.
    #[error("exchange timed out after {0:?}")]
    Timeout(Duration),

    /// The response buffer does not match its declared length.
    #[error("payload size does not match expected size (declared {declared} bytes, received {actual})")]
    FrameSizeMismatch { declared: usize, actual: usize },

    /// The declared response or request size exceeds the configured limit.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The peer asked for a multi-part continuation, which is not supported.
    #[error("unhandled response: continuation requested with status {0}")]
    UnhandledContinuation(StatusCode),

    /// The peer answered with a status word other than success.
    #[error("invalid status code supplied: {0} ({name})", name = .0.name())]
    InvalidStatusCode(StatusCode),

    /// The connection is closed.
    #[error("connection closed")]
    Closed,
}

impl ExchangeError {
    /// Raw status word for status-driven failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ExchangeError::UnhandledContinuation(code) | ExchangeError::InvalidStatusCode(code) => {
                Some(*code)
            }
            _ => None,
        }
    }

    /// Whether the connection should no longer be trusted after this error.
    pub fn is_connection_suspect(&self) -> bool {
        matches!(
            self,
            ExchangeError::FrameSizeMismatch { .. }
                | ExchangeError::PayloadTooLarge { .. }
                | ExchangeError::Connection(_)
                | ExchangeError::Closed
        )
    }
}

impl From<TransportError> for ExchangeError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Closed => ExchangeError::Closed,
            other => ExchangeError::Connection(other),
        }
    }
}

impl From<FrameError> for ExchangeError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::FrameSizeMismatch { declared, actual } => {
                ExchangeError::FrameSizeMismatch { declared, actual }
            }
            FrameError::PayloadTooLarge { size, max } => ExchangeError::PayloadTooLarge { size, max },
            FrameError::Io(io) => ExchangeError::Connection(TransportError::Io(io)),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExchangeError>;
