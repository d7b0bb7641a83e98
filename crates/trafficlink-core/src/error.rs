//! Error taxonomy for exchanges and the service layer.
//!
//! [`ExchangeError`] never leaves the engine: each one ends an attempt and is
//! folded into the outcome. [`ServiceError`] is the only error a caller sees,
//! raised when no outcome can be built at all.

use serde::Serialize;
use thiserror::Error;

use crate::config::ProfileId;

/// Why an exchange attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// The link could not be opened or configured.
    #[error("transport unavailable: {reason}")]
    TransportUnavailable {
        /// Opener-provided reason.
        reason: String,
    },

    /// No handshake byte arrived in the ACK window.
    #[error("no ACK/NAK within {timeout_ms}ms (attempt {attempt})")]
    HandshakeTimeout {
        /// Length of the ACK window.
        timeout_ms: u64,
        /// Attempt number, starting at 1.
        attempt: u32,
    },

    /// The controller answered with NAK.
    #[error("NAK received (0x15) on attempt {attempt}: frame rejected")]
    HandshakeRejected {
        /// Attempt number, starting at 1.
        attempt: u32,
    },

    /// Fewer bytes than expected arrived before the read timeout.
    #[error("read timeout: expected {expected} bytes, received {received}")]
    ReadTimeout {
        /// Bytes the frame spec asked for.
        expected: usize,
        /// Bytes collected after the handshake.
        received: usize,
    },

    /// Response did not pass validation.
    #[error("{0}")]
    ValidationMismatch(Mismatch),

    /// Any other I/O fault on an open link.
    #[error("transport fault: {0}")]
    TransportFault(String),
}

impl ExchangeError {
    /// Classification without payload.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TransportUnavailable { .. } => ErrorKind::TransportUnavailable,
            Self::HandshakeTimeout { .. } => ErrorKind::HandshakeTimeout,
            Self::HandshakeRejected { .. } => ErrorKind::HandshakeRejected,
            Self::ReadTimeout { .. } => ErrorKind::ReadTimeout,
            Self::ValidationMismatch(_) => ErrorKind::ValidationMismatch,
            Self::TransportFault(_) => ErrorKind::TransportFault,
        }
    }
}

impl From<std::io::Error> for ExchangeError {
    fn from(err: std::io::Error) -> Self {
        Self::TransportFault(err.to_string())
    }
}

/// Which validation check a response failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Mismatch {
    /// Nothing was received.
    #[error("no response (RX=0)")]
    EmptyResponse,
    /// Response does not begin with the expected bytes.
    #[error("response does not start with the expected prefix")]
    Prefix,
    /// Response does not contain the expected bytes.
    #[error("response does not contain the expected pattern")]
    Contains,
}

/// Payload-free failure classification carried by outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`ExchangeError::TransportUnavailable`].
    TransportUnavailable,
    /// See [`ExchangeError::HandshakeTimeout`].
    HandshakeTimeout,
    /// See [`ExchangeError::HandshakeRejected`].
    HandshakeRejected,
    /// See [`ExchangeError::ReadTimeout`].
    ReadTimeout,
    /// See [`ExchangeError::ValidationMismatch`].
    ValidationMismatch,
    /// See [`ExchangeError::TransportFault`].
    TransportFault,
    /// The request was refused before any transport was touched.
    Rejected,
}

/// Errors surfaced to callers of the service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// No connection configuration exists for the profile.
    #[error("no connection configuration for profile {0}")]
    ConfigurationMissing(ProfileId),
}

/// Malformed `key=value` argument.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgParseError {
    /// Argument has no `=`.
    #[error("expected key=value, got {0:?}")]
    MissingEquals(String),
    /// Argument has an empty key.
    #[error("empty key in {0:?}")]
    EmptyKey(String),
}

/// Name that matches no catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown command {0:?}")]
pub struct UnknownCommand(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        let short = ExchangeError::ReadTimeout { expected: 7, received: 4 };
        assert_eq!(short.to_string(), "read timeout: expected 7 bytes, received 4");

        let nak = ExchangeError::HandshakeRejected { attempt: 3 };
        assert!(nak.to_string().contains("NAK"));
        assert!(nak.to_string().contains("rejected"));

        let mismatch = ExchangeError::ValidationMismatch(Mismatch::Prefix);
        assert_eq!(mismatch.kind(), ErrorKind::ValidationMismatch);
    }

    #[test]
    fn io_errors_become_transport_faults() {
        let err: ExchangeError = std::io::Error::other("line dropped").into();
        assert_eq!(err.kind(), ErrorKind::TransportFault);
    }
}
