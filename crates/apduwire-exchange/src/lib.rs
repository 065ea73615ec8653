//! Half-duplex APDU exchange over TCP.
//!
//! This is the layer callers use. Open a [`TcpTransport`], send an APDU,
//! get back the response payload or a typed [`ExchangeError`]. One request
//! is outstanding at a time, and each one is bounded by the configured
//! timeout.

pub mod config;
pub mod controller;
pub mod emulator;
pub mod error;
pub mod transport;

pub use config::{TransportConfig, DEFAULT_TIMEOUT};
pub use controller::{classify, ExchangeController, ExchangeState};
pub use emulator::{DeviceEmulator, EmulatorHandle, Fallback, Reply};
pub use error::{ExchangeError, Result};
pub use transport::{ApduTransport, TcpTransport};
