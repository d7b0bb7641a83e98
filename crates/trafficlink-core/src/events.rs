//! Structured exchange events.
//!
//! The engine reports what it is doing as [`ExchangeEvent`] values rather
//! than logging directly. Production forwards them to `tracing` through
//! [`TracingSink`]; tests record them and assert on the sequence.

use tracing::{debug, info, trace, warn};

use crate::{error::ExchangeError, exchange::ExchangeState};

/// Something observable that happened during an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeEvent {
    /// A new attempt began.
    AttemptStarted {
        /// Attempt number, starting at 1.
        attempt: u32,
        /// Attempt limit.
        max_attempts: u32,
    },

    /// The state machine moved.
    StateChanged {
        /// Attempt number.
        attempt: u32,
        /// Previous state.
        from: ExchangeState,
        /// New state.
        to: ExchangeState,
    },

    /// The frame was written and flushed.
    FrameSent {
        /// Attempt number.
        attempt: u32,
        /// Bytes on the wire.
        bytes: Vec<u8>,
    },

    /// Bytes arrived from the link.
    BytesReceived {
        /// Attempt number.
        attempt: u32,
        /// The chunk as read.
        bytes: Vec<u8>,
    },

    /// The link refused to drive RTS/DTR; the exchange continued.
    LineControlIgnored {
        /// Attempt number.
        attempt: u32,
        /// Driver message.
        reason: String,
    },

    /// The link could not discard pending input; the exchange continued.
    PurgeFailed {
        /// Attempt number.
        attempt: u32,
        /// Driver message.
        reason: String,
    },

    /// An attempt ended in failure.
    AttemptFailed {
        /// Attempt number.
        attempt: u32,
        /// Why it failed.
        error: ExchangeError,
    },

    /// The exchange finished.
    Completed {
        /// Final verdict.
        ok: bool,
        /// Attempts made.
        attempts: u32,
        /// Wall time since the first attempt started.
        elapsed_ms: u64,
    },
}

/// Receives exchange events.
pub trait EventSink {
    /// Handle one event.
    fn emit(&mut self, event: ExchangeEvent);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: ExchangeEvent) {
        (**self).emit(event);
    }
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: ExchangeEvent) {
        match event {
            ExchangeEvent::AttemptStarted { attempt, max_attempts } => {
                debug!(attempt, max_attempts, "attempt started");
            },
            ExchangeEvent::StateChanged { attempt, from, to } if to.is_terminal() => {
                debug!(attempt, ?from, ?to, "attempt finished");
            },
            ExchangeEvent::StateChanged { attempt, from, to } => {
                trace!(attempt, ?from, ?to, "state changed");
            },
            ExchangeEvent::FrameSent { attempt, bytes } => {
                debug!(attempt, len = bytes.len(), ?bytes, "frame sent");
            },
            ExchangeEvent::BytesReceived { attempt, bytes } => {
                trace!(attempt, len = bytes.len(), ?bytes, "bytes received");
            },
            ExchangeEvent::LineControlIgnored { attempt, reason } => {
                debug!(attempt, %reason, "RTS/DTR not supported, continuing");
            },
            ExchangeEvent::PurgeFailed { attempt, reason } => {
                warn!(attempt, %reason, "input purge failed, continuing");
            },
            ExchangeEvent::AttemptFailed { attempt, error } => {
                warn!(attempt, kind = ?error.kind(), %error, "attempt failed");
            },
            ExchangeEvent::Completed { ok, attempts, elapsed_ms } => {
                info!(ok, attempts, elapsed_ms, "exchange completed");
            },
        }
    }
}
