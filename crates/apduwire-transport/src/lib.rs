//! TCP connection management for APDU exchange.
//!
//! This is the lowest layer of apduwire: it owns the byte stream to a peer,
//! exposes raw reads and writes, and ties the connection lifecycle to
//! stream-level errors. It knows nothing about frames.
//!
//! - [`Connection`]: one live TCP stream with an idle timeout
//! - [`Diagnostics`]: optional raw byte observation
//! - [`Discovery`]: peer discovery capability shared by transport kinds

pub mod address;
pub mod connection;
pub mod diagnostics;
pub mod discovery;
pub mod error;

pub use address::PeerAddress;
pub use connection::Connection;
pub use diagnostics::{Diagnostics, DiagnosticsHook, Direction, HexBytes, TracingHook};
pub use discovery::{Discovery, NoDiscovery, Observer, Subscription};
pub use error::{Result, TransportError};
