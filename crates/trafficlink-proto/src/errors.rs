//! Error types for frame decoding.

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Reasons a received byte sequence is not a valid frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Wrapped frame does not begin with STX.
    #[error("frame does not start with STX (got {found:?})")]
    MissingStart {
        /// First byte of the frame, if any.
        found: Option<u8>,
    },

    /// Wrapped frame does not end with ETX.
    #[error("frame does not end with ETX (got {found:?})")]
    MissingEnd {
        /// Last byte of the frame, if any.
        found: Option<u8>,
    },

    /// Frame has no room for the checksum byte its mode requires.
    #[error("frame too short: {len} bytes cannot carry a checksum")]
    TooShort {
        /// Length of the body after delimiters were stripped.
        len: usize,
    },

    /// Trailing checksum does not match the payload.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Checksum computed over the received payload.
        expected: u8,
        /// Checksum byte carried by the frame.
        actual: u8,
    },
}
