//! Length-prefixed APDU framing with status-code trailers.
//!
//! Requests and responses travel over a byte stream as:
//! - request: a 4-byte little-endian payload length, then the payload
//! - response: a 4-byte little-endian payload length, the payload, then a
//!   2-byte little-endian status word
//!
//! The payload bytes are opaque here. Only the status word is interpreted,
//! and only as far as [`StatusClass`].

pub mod codec;
pub mod device;
pub mod error;
pub mod status;

pub use codec::{
    decode_request_frame, decode_response, decode_response_frame, encode, encode_request,
    encode_response, incomplete_frame, FrameConfig, ResponseFrame, DEFAULT_MAX_PAYLOAD,
    LENGTH_SIZE, RESPONSE_OVERHEAD, STATUS_SIZE,
};
pub use device::DeviceCodec;
pub use error::{FrameError, Result};
pub use status::{status_name, StatusClass, StatusCode};
