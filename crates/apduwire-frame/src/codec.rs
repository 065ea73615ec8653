use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::error::{FrameError, Result};
use crate::status::StatusCode;

/// Length prefix: 4 bytes, little-endian.
pub const LENGTH_SIZE: usize = 4;

/// Status trailer on response frames: 2 bytes, little-endian.
pub const STATUS_SIZE: usize = 2;

/// Bytes a response frame carries besides its payload.
pub const RESPONSE_OVERHEAD: usize = LENGTH_SIZE + STATUS_SIZE;

/// Default maximum accepted payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// A decoded response: payload plus trailing status word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    /// Response data, possibly empty.
    pub payload: Bytes,
    /// Status word from the frame trailer.
    pub status: StatusCode,
}

impl ResponseFrame {
    /// Create a new response frame.
    pub fn new(payload: impl Into<Bytes>, status: impl Into<StatusCode>) -> Self {
        Self {
            payload: payload.into(),
            status: status.into(),
        }
    }

    /// The total wire size of this frame (length + payload + status).
    pub fn wire_size(&self) -> usize {
        RESPONSE_OVERHEAD + self.payload.len()
    }
}

/// Encode a request frame into the wire format.
///
/// ```text
/// ┌─────────────┬──────────────────┐
/// │ Length      │ Payload          │
/// │ (4B LE)     │ (Length bytes)   │
/// └─────────────┴──────────────────┘
/// ```
pub fn encode_request(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let len = checked_len(payload)?;
    dst.reserve(LENGTH_SIZE + payload.len());
    dst.put_u32_le(len);
    dst.put_slice(payload);
    Ok(())
}

/// Encode a request frame into a fresh buffer.
pub fn encode(payload: &[u8]) -> Result<Bytes> {
    let mut dst = BytesMut::with_capacity(LENGTH_SIZE + payload.len());
    encode_request(payload, &mut dst)?;
    Ok(dst.freeze())
}

/// Encode a response frame into the wire format.
///
/// ```text
/// ┌─────────────┬──────────────────┬─────────────┐
/// │ Length      │ Payload          │ Status      │
/// │ (4B LE)     │ (Length bytes)   │ (2B LE)     │
/// └─────────────┴──────────────────┴─────────────┘
/// ```
pub fn encode_response(payload: &[u8], status: StatusCode, dst: &mut BytesMut) -> Result<()> {
    let len = checked_len(payload)?;
    dst.reserve(RESPONSE_OVERHEAD + payload.len());
    dst.put_u32_le(len);
    dst.put_slice(payload);
    dst.put_u16_le(status.value());
    Ok(())
}

/// Decode one complete inbound buffer as a response frame.
///
/// The buffer must hold exactly one frame: `4 + declared + 2` bytes.
pub fn decode_response(buf: &[u8]) -> Result<ResponseFrame> {
    if buf.len() < RESPONSE_OVERHEAD {
        return Err(size_mismatch(buf));
    }

    let declared = read_length(buf);
    if buf.len() != RESPONSE_OVERHEAD + declared {
        return Err(FrameError::FrameSizeMismatch {
            declared,
            actual: buf.len() - RESPONSE_OVERHEAD,
        });
    }

    let payload = Bytes::copy_from_slice(&buf[LENGTH_SIZE..LENGTH_SIZE + declared]);
    let mut trailer = &buf[LENGTH_SIZE + declared..];
    let status = StatusCode(trailer.get_u16_le());

    Ok(ResponseFrame { payload, status })
}

/// Decode a response frame from a buffer that is filled incrementally.
///
/// Returns `Ok(None)` while the frame is still incomplete. Once the declared
/// frame is complete the buffer must hold nothing else: surplus bytes mean
/// the inbound data does not match its declared length, so the whole buffer
/// is discarded and `FrameSizeMismatch` returned.
pub fn decode_response_frame(
    src: &mut BytesMut,
    max_payload: usize,
) -> Result<Option<ResponseFrame>> {
    if src.len() < LENGTH_SIZE {
        return Ok(None);
    }

    let declared = read_length(src);
    if declared > max_payload {
        debug!(declared, max_payload, "response declares oversized payload");
        src.clear();
        return Err(FrameError::PayloadTooLarge {
            size: declared,
            max: max_payload,
        });
    }

    let total = RESPONSE_OVERHEAD + declared;
    if src.len() < total {
        return Ok(None);
    }
    if src.len() > total {
        let actual = src.len() - RESPONSE_OVERHEAD;
        debug!(declared, actual, "response buffer overruns declared length");
        src.clear();
        return Err(FrameError::FrameSizeMismatch { declared, actual });
    }

    src.advance(LENGTH_SIZE);
    let payload = src.split_to(declared).freeze();
    let status = StatusCode(src.get_u16_le());

    Ok(Some(ResponseFrame { payload, status }))
}

/// Error for a buffer that stopped growing before its frame was complete.
pub fn incomplete_frame(buf: &[u8]) -> FrameError {
    size_mismatch(buf)
}

/// Decode a request frame from a buffer that is filled incrementally.
///
/// Used on the device side. Consumes exactly one frame per call, leaving any
/// following bytes in place.
pub fn decode_request_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Bytes>> {
    if src.len() < LENGTH_SIZE {
        return Ok(None);
    }

    let declared = read_length(src);
    if declared > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: declared,
            max: max_payload,
        });
    }

    if src.len() < LENGTH_SIZE + declared {
        src.reserve(LENGTH_SIZE + declared - src.len());
        return Ok(None);
    }

    src.advance(LENGTH_SIZE);
    Ok(Some(src.split_to(declared).freeze()))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

fn checked_len(payload: &[u8]) -> Result<u32> {
    u32::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })
}

fn read_length(buf: &[u8]) -> usize {
    let mut header = &buf[..LENGTH_SIZE];
    header.get_u32_le() as usize
}

fn size_mismatch(buf: &[u8]) -> FrameError {
    let declared = if buf.len() >= LENGTH_SIZE {
        read_length(buf)
    } else {
        0
    };
    FrameError::FrameSizeMismatch {
        declared,
        actual: buf.len().saturating_sub(RESPONSE_OVERHEAD),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_wire(payload: &[u8], status: u16) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_response(payload, StatusCode(status), &mut buf).unwrap();
        buf
    }

    #[test]
    fn encode_request_layout() {
        let wire = encode(&[0x00, 0x01]).unwrap();
        assert_eq!(wire.as_ref(), &[0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn encode_empty_request() {
        let wire = encode(&[]).unwrap();
        assert_eq!(wire.as_ref(), &[0, 0, 0, 0]);
    }

    #[test]
    fn request_payload_survives_response_trailer() {
        for payload in [&b""[..], &b"\x00"[..], &b"hello, device"[..], &[0xFF; 300][..]] {
            let mut wire = BytesMut::from(encode(payload).unwrap().as_ref());
            wire.put_u16_le(0x9000);

            let frame = decode_response(&wire).unwrap();
            assert_eq!(frame.payload.as_ref(), payload);
            assert_eq!(frame.status, StatusCode::OK);
        }
    }

    #[test]
    fn decode_response_layout() {
        let bytes = [0x02, 0x00, 0x00, 0x00, 0xAA, 0xBB, 0x00, 0x90];
        let frame = decode_response(&bytes).unwrap();
        assert_eq!(frame.payload.as_ref(), &[0xAA, 0xBB]);
        assert_eq!(frame.status, StatusCode(0x9000));
        assert_eq!(frame.wire_size(), bytes.len());
    }

    #[test]
    fn decode_response_rejects_short_buffer() {
        let bytes = [0x05, 0x00, 0x00, 0x00, 0xAA, 0xBB, 0x00, 0x90];
        let err = decode_response(&bytes).unwrap_err();
        assert!(matches!(
            err,
            FrameError::FrameSizeMismatch {
                declared: 5,
                actual: 2
            }
        ));
    }

    #[test]
    fn decode_response_rejects_surplus_bytes() {
        let mut wire = response_wire(b"ok", 0x9000);
        wire.put_u8(0x00);
        let err = decode_response(&wire).unwrap_err();
        assert!(matches!(
            err,
            FrameError::FrameSizeMismatch {
                declared: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn decode_response_rejects_truncated_header() {
        let err = decode_response(&[0x00, 0x00]).unwrap_err();
        assert!(matches!(err, FrameError::FrameSizeMismatch { .. }));
    }

    #[test]
    fn streaming_decode_waits_for_complete_frame() {
        let wire = response_wire(b"abcdef", 0x6F00);
        let mut buf = BytesMut::new();

        for byte in &wire[..wire.len() - 1] {
            buf.put_u8(*byte);
            assert!(decode_response_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
                .unwrap()
                .is_none());
        }
        buf.put_u8(wire[wire.len() - 1]);

        let frame = decode_response_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert_eq!(frame.payload.as_ref(), b"abcdef");
        assert_eq!(frame.status, StatusCode(0x6F00));
        assert!(buf.is_empty());
    }

    #[test]
    fn streaming_decode_rejects_surplus_and_clears() {
        let mut buf = response_wire(b"ab", 0x9000);
        buf.put_slice(&[0x01, 0x02, 0x03]);

        let err = decode_response_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap_err();
        assert!(matches!(
            err,
            FrameError::FrameSizeMismatch {
                declared: 2,
                actual: 5
            }
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn streaming_decode_rejects_oversized_declaration() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(1024);

        let err = decode_response_frame(&mut buf, 16).unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadTooLarge {
                size: 1024,
                max: 16
            }
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn incomplete_frame_reports_declared_length() {
        let bytes = [0x05, 0x00, 0x00, 0x00, 0xAA, 0xBB, 0x00, 0x90];
        assert!(matches!(
            incomplete_frame(&bytes),
            FrameError::FrameSizeMismatch {
                declared: 5,
                actual: 2
            }
        ));
        assert!(matches!(
            incomplete_frame(&[0x01]),
            FrameError::FrameSizeMismatch {
                declared: 0,
                actual: 0
            }
        ));
    }

    #[test]
    fn request_frames_decode_back_to_back() {
        let mut buf = BytesMut::new();
        encode_request(b"first", &mut buf).unwrap();
        encode_request(b"", &mut buf).unwrap();
        encode_request(b"third", &mut buf).unwrap();

        let a = decode_request_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        let b = decode_request_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        let c = decode_request_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();

        assert_eq!(a.as_ref(), b"first");
        assert!(b.is_empty());
        assert_eq!(c.as_ref(), b"third");
        assert!(buf.is_empty());
    }

    #[test]
    fn request_decode_incomplete_payload() {
        let mut buf = BytesMut::new();
        encode_request(b"hello", &mut buf).unwrap();
        buf.truncate(LENGTH_SIZE + 2);

        assert!(decode_request_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .is_none());
    }
}
