//! APDU request/response transport over TCP.
//!
//! apduwire carries opaque APDU byte buffers to a device (or a device
//! emulator) over a persistent TCP connection and reports typed outcomes.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP connection lifecycle, diagnostics hook, discovery stubs
//! - [`frame`]: Length-prefixed framing and status word classification
//! - [`exchange`]: Request/response exchange with deadlines (behind `exchange` feature)

/// Re-export transport types.
pub mod transport {
    pub use apduwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use apduwire_frame::*;
}

/// Re-export exchange types (requires `exchange` feature).
#[cfg(feature = "exchange")]
pub mod exchange {
    pub use apduwire_exchange::*;
}
