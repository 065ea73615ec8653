//! Response status words.
//!
//! Every response frame ends with a 2-byte status word. Only the class of
//! the word drives the exchange outcome; the names below exist for logs and
//! error messages.

use std::fmt;

/// Classification of a status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    /// Exactly `0x9000`.
    Success,
    /// `0x61xx`: the peer has more response data than it returned.
    Continuation,
    /// Anything else.
    Other,
}

/// A 16-bit response status word.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(0x9000);

    // ISO 7816-4 words commonly returned by device applications.
    pub const WRONG_LENGTH: StatusCode = StatusCode(0x6700);
    pub const SECURITY_NOT_SATISFIED: StatusCode = StatusCode(0x6982);
    pub const CONDITIONS_NOT_SATISFIED: StatusCode = StatusCode(0x6985);
    pub const WRONG_DATA: StatusCode = StatusCode(0x6A80);
    pub const WRONG_P1_P2: StatusCode = StatusCode(0x6B00);
    pub const INS_NOT_SUPPORTED: StatusCode = StatusCode(0x6D00);
    pub const CLA_NOT_SUPPORTED: StatusCode = StatusCode(0x6E00);
    pub const UNKNOWN: StatusCode = StatusCode(0x6F00);

    // Device application error words.
    pub const OP_NOT_PERMITTED: StatusCode = StatusCode(0x4000);
    pub const OP_USER_REQUIRED: StatusCode = StatusCode(0x4001);
    pub const WRONG_INPUT_LENGTH: StatusCode = StatusCode(0x4002);
    pub const UNKNOWN_ERROR: StatusCode = StatusCode(0x4444);
    pub const VARINT_DATA_RANGE: StatusCode = StatusCode(0x6000);

    /// High byte shared by every continuation word.
    pub const CONTINUATION_PREFIX: u16 = 0x6100;

    /// Raw 16-bit value.
    pub fn value(self) -> u16 {
        self.0
    }

    /// Classify this status word.
    pub fn class(self) -> StatusClass {
        if self == Self::OK {
            StatusClass::Success
        } else if self.0 & 0xFF00 == Self::CONTINUATION_PREFIX {
            StatusClass::Continuation
        } else {
            StatusClass::Other
        }
    }

    /// Returns true for `0x9000`.
    pub fn is_success(self) -> bool {
        self.class() == StatusClass::Success
    }

    /// Number of bytes the peer reports as still available (`0x61xx` only).
    ///
    /// A low byte of zero conventionally means 256 or more.
    pub fn remaining(self) -> Option<usize> {
        match self.class() {
            StatusClass::Continuation => match self.0 & 0x00FF {
                0 => Some(256),
                n => Some(n as usize),
            },
            _ => None,
        }
    }

    /// Human-readable label for this status word.
    pub fn name(self) -> &'static str {
        status_name(self.0)
    }
}

impl From<u16> for StatusCode {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<StatusCode> for u16 {
    fn from(code: StatusCode) -> Self {
        code.0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

impl fmt::Debug for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatusCode(0x{:04X} {})", self.0, self.name())
    }
}

/// Returns a human-readable name for a raw status word.
pub fn status_name(code: u16) -> &'static str {
    match code {
        0x9000 => "OK",
        0x6100..=0x61FF => "MORE_DATA_AVAILABLE",
        0x6700 => "WRONG_LENGTH",
        0x6982 => "SECURITY_NOT_SATISFIED",
        0x6985 => "CONDITIONS_NOT_SATISFIED",
        0x6A80 => "WRONG_DATA",
        0x6B00 => "WRONG_P1_P2",
        0x6D00 => "INS_NOT_SUPPORTED",
        0x6E00 => "CLA_NOT_SUPPORTED",
        0x6F00 => "UNKNOWN",
        0x4000 => "OP_NOT_PERMITTED",
        0x4001 => "OP_USER_REQUIRED",
        0x4002 => "WRONG_INPUT_LENGTH",
        0x4444 => "UNKNOWN_ERROR",
        0x6000 => "VARINT_DATA_RANGE",
        0x9400..=0x95FF => "DEVICE_CRYPTO_ERROR",
        _ => "UNRECOGNIZED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_success_only_on_exact_match() {
        assert_eq!(StatusCode(0x9000).class(), StatusClass::Success);
        assert_eq!(StatusCode(0x9001).class(), StatusClass::Other);
        assert_eq!(StatusCode(0x9100).class(), StatusClass::Other);
    }

    #[test]
    fn classifies_continuation_by_high_byte() {
        assert_eq!(StatusCode(0x6100).class(), StatusClass::Continuation);
        assert_eq!(StatusCode(0x6101).class(), StatusClass::Continuation);
        assert_eq!(StatusCode(0x61FF).class(), StatusClass::Continuation);
        assert_eq!(StatusCode(0x6200).class(), StatusClass::Other);
    }

    #[test]
    fn classifies_everything_else_as_other() {
        for raw in [0x0000, 0x6F00, 0x6700, 0x4000, 0xFFFF] {
            assert_eq!(StatusCode(raw).class(), StatusClass::Other, "{raw:#06x}");
        }
    }

    #[test]
    fn continuation_reports_remaining_bytes() {
        assert_eq!(StatusCode(0x6110).remaining(), Some(0x10));
        assert_eq!(StatusCode(0x6100).remaining(), Some(256));
        assert_eq!(StatusCode::OK.remaining(), None);
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(StatusCode(0x6f00).to_string(), "0x6F00");
        assert_eq!(format!("{:?}", StatusCode::OK), "StatusCode(0x9000 OK)");
    }

    #[test]
    fn names_device_error_words() {
        assert_eq!(status_name(0x4001), "OP_USER_REQUIRED");
        assert_eq!(status_name(0x9502), "DEVICE_CRYPTO_ERROR");
        assert_eq!(status_name(0x1234), "UNRECOGNIZED");
    }
}
