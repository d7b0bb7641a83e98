//! Frame specification.
//!
//! A [`FrameSpec`] is everything the exchange engine needs to know about one
//! outgoing command: the payload, how to frame it, and what kind of response
//! to wait for. Catalog presets and raw frames both end up here.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use trafficlink_proto::{ChecksumMode, build_frame, mask_payload};

/// One outgoing command and its response expectations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSpec {
    /// Payload bytes, already masked to 8 bits.
    pub payload: Vec<u8>,
    /// Enclose the frame in STX/ETX.
    pub wrap: bool,
    /// Trailing checksum byte.
    pub checksum: ChecksumMode,
    /// Wait for an ACK/NAK byte after transmitting.
    pub expect_ack: bool,
    /// Exact response length; zero means unknown.
    pub expect_bytes: usize,
    /// Read budget overriding the connection default.
    pub read_timeout_ms: Option<u64>,
}

impl FrameSpec {
    /// Unwrapped, checksum-free frame that waits for nothing.
    pub fn new<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<i64>,
    {
        Self {
            payload: mask_payload(values),
            wrap: false,
            checksum: ChecksumMode::None,
            expect_ack: false,
            expect_bytes: 0,
            read_timeout_ms: None,
        }
    }

    /// Set the wrap flag.
    #[must_use]
    pub fn wrapped(mut self, wrap: bool) -> Self {
        self.wrap = wrap;
        self
    }

    /// Set the checksum mode.
    #[must_use]
    pub fn with_checksum(mut self, mode: ChecksumMode) -> Self {
        self.checksum = mode;
        self
    }

    /// Set whether a handshake byte is awaited.
    #[must_use]
    pub fn with_ack(mut self, expect_ack: bool) -> Self {
        self.expect_ack = expect_ack;
        self
    }

    /// Set the exact response length.
    #[must_use]
    pub fn with_expect_bytes(mut self, expect_bytes: usize) -> Self {
        self.expect_bytes = expect_bytes;
        self
    }

    /// Override the read budget.
    #[must_use]
    pub fn with_read_timeout_ms(mut self, ms: u64) -> Self {
        self.read_timeout_ms = Some(ms);
        self
    }

    /// Bytes to put on the wire.
    pub fn encode(&self) -> Vec<u8> {
        build_frame(self.payload.iter().copied(), self.wrap, self.checksum)
    }

    /// Read budget for this frame, given the connection default.
    pub fn read_timeout(&self, default: Duration) -> Duration {
        self.read_timeout_ms.map_or(default, Duration::from_millis)
    }
}
