//! Device-side codec.
//!
//! The host writes request frames and reads response frames; a device (or an
//! emulator standing in for one) does the opposite. [`DeviceCodec`] plugs that
//! direction into `tokio_util::codec::Framed`.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_request_frame, encode_response, FrameConfig, ResponseFrame};
use crate::error::FrameError;

/// Decodes request frames and encodes response frames.
#[derive(Debug, Clone)]
pub struct DeviceCodec {
    config: FrameConfig,
}

impl DeviceCodec {
    /// Create a codec with the default payload limit.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self { config }
    }

    /// Current maximum request payload size.
    pub fn max_payload_size(&self) -> usize {
        self.config.max_payload_size
    }
}

impl Default for DeviceCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for DeviceCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_request_frame(src, self.config.max_payload_size)
    }
}

impl Encoder<ResponseFrame> for DeviceCodec {
    type Error = FrameError;

    fn encode(&mut self, item: ResponseFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_response(item.payload.as_ref(), item.status, dst)
    }
}
