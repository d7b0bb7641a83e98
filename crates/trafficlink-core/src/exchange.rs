//! Exchange state machine.
//!
//! One [`Exchange`] drives a full transmit/receive cycle against a controller
//! and always produces an [`ExchangeOutcome`]; no fault escapes it.
//!
//! # State Machine
//!
//! ```text
//! Idle ─open─> Opened ─ack─> AwaitingAck ─ACK/data─> ReadingResponse ─done─> Closed
//!                │ │                                        ↑
//!                │ └───────────────── no ack ───────────────┘
//!                └─ fire-and-forget, probe ─> Closed
//!
//! any non-terminal state ─error─> Failed
//! ```
//!
//! Every attempt starts in `Idle` with an empty trace and ends in `Closed` or
//! `Failed`. A failed attempt is retried until the connection's attempt limit
//! is reached. The link is owned by the attempt and dropped before the final
//! state is entered, so the endpoint is released on every path.
//!
//! # Reading
//!
//! With an expected length the engine collects exactly that many bytes after
//! the handshake; a data byte received in place of ACK is kept in the trace
//! but does not count toward the length. For wrapped frames of unknown length
//! it reads until ETX. For unwrapped frames of unknown length it collects
//! until the read budget runs out; chunks arriving within [`QUIET_GAP`] of
//! each other are grouped into one [`ExchangeEvent::BytesReceived`].
//!
//! # Timing
//!
//! - **Handshake window**: `min(read timeout, 300ms)`
//! - **Settle delay**: 20ms between the line reset and transmission
//! - **Quiet gap**: 20ms of silence closes one chunk group of a burst

use std::{
    io, mem,
    time::{Duration, Instant},
};

use serde::Serialize;
use trafficlink_proto::{ACK, ETX, NAK};

use crate::{
    command::FrameSpec,
    config::{InterfaceType, SerialParams},
    env::{Environment, remaining},
    error::ExchangeError,
    events::{EventSink, ExchangeEvent},
    report::{self, ExchangeOutcome},
    transport::{Link, LinkOpener},
    validate::Expectations,
};

/// Upper bound on the handshake window.
pub const ACK_WAIT_CAP: Duration = Duration::from_millis(300);

/// Pause between the control-line reset and transmission.
pub const SETTLE_DELAY: Duration = Duration::from_millis(20);

/// Silence that closes one chunk group of a burst read.
pub const QUIET_GAP: Duration = Duration::from_millis(20);

/// Back-off when a link returns early without data.
pub const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Hard limit on bytes collected by one burst read.
pub const MAX_BURST: usize = 4096;

/// Bytes sent by a connection probe.
const PROBE_BYTES: [u8; 2] = [b'\r', b'\n'];

const MSG_PROBE: &str = "port opened and configured";
const MSG_FIRE_AND_FORGET: &str = "frame sent (no response expected)";
const MSG_HANDSHAKE_ONLY: &str = "frame sent, ACK received (handshake only)";
const MSG_ACK_HANDLED: &str = "frame sent (ACK handled)";
const MSG_SENT: &str = "frame sent";
const MSG_VALIDATED: &str = "frame sent, response validated";

/// Exchange lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExchangeState {
    /// Nothing acquired yet.
    Idle,
    /// Link open, frame being sent.
    Opened,
    /// Waiting for ACK/NAK.
    AwaitingAck,
    /// Collecting the response.
    ReadingResponse,
    /// Attempt succeeded, link released.
    Closed,
    /// Attempt failed, link released.
    Failed,
}

impl ExchangeState {
    /// Whether the attempt is over.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

/// One request/response cycle, retried per the connection parameters.
#[derive(Debug, Clone)]
pub struct Exchange {
    params: SerialParams,
    spec: FrameSpec,
    expectations: Option<Expectations>,
    probe: bool,
}

impl Exchange {
    /// Send `spec` over a link configured with `params`.
    pub fn new(params: SerialParams, spec: FrameSpec) -> Self {
        Self { params, spec, expectations: None, probe: false }
    }

    /// Open, reset, and send a bare CR LF without waiting for anything.
    ///
    /// Write failures during a probe are ignored; opening is what is tested.
    pub fn probe(params: SerialParams) -> Self {
        Self { params, spec: FrameSpec::new(PROBE_BYTES), expectations: None, probe: true }
    }

    /// Require a response satisfying `expectations`.
    #[must_use]
    pub fn with_expectations(mut self, expectations: Expectations) -> Self {
        self.expectations = Some(expectations);
        self
    }

    /// Connection parameters.
    pub fn params(&self) -> &SerialParams {
        &self.params
    }

    /// Frame specification.
    pub fn spec(&self) -> &FrameSpec {
        &self.spec
    }

    /// Run the exchange to completion.
    pub fn run<O, E, S>(&self, opener: &mut O, env: &E, sink: &mut S) -> ExchangeOutcome
    where
        O: LinkOpener + ?Sized,
        E: Environment + ?Sized,
        S: EventSink + ?Sized,
    {
        let started = env.now();
        let frame = self.spec.encode();
        let max_attempts = self.params.max_attempts();

        let mut last_error = None;
        let mut last_sent = Vec::new();
        let mut last_trace = Vec::new();

        for attempt in 1..=max_attempts {
            sink.emit(ExchangeEvent::AttemptStarted { attempt, max_attempts });
            let mut cycle = Cycle::new(attempt, sink);

            match self.attempt(opener, env, &mut cycle, &frame) {
                Ok(message) => {
                    cycle.enter(ExchangeState::Closed);
                    let Cycle { sent, trace, .. } = cycle;
                    let elapsed_ms = millis(env.now().saturating_duration_since(started));
                    sink.emit(ExchangeEvent::Completed { ok: true, attempts: attempt, elapsed_ms });
                    return ExchangeOutcome {
                        ok: true,
                        interface_type: InterfaceType::Rs232,
                        elapsed_ms,
                        message: message.to_string(),
                        details: report::details(&self.params, &sent, &trace, None),
                        sent,
                        received: trace,
                        attempts: attempt,
                        failure: None,
                    };
                },
                Err(error) => {
                    cycle.enter(ExchangeState::Failed);
                    cycle.emit(ExchangeEvent::AttemptFailed { attempt, error: error.clone() });
                    last_sent = mem::take(&mut cycle.sent);
                    last_trace = mem::take(&mut cycle.trace);
                    last_error = Some(error);
                },
            }
        }

        let elapsed_ms = millis(env.now().saturating_duration_since(started));
        sink.emit(ExchangeEvent::Completed { ok: false, attempts: max_attempts, elapsed_ms });

        let message = last_error.as_ref().map_or_else(|| "attempts exhausted".to_string(), ToString::to_string);
        ExchangeOutcome {
            ok: false,
            interface_type: InterfaceType::Rs232,
            elapsed_ms,
            message,
            details: report::details(&self.params, &last_sent, &last_trace, last_error.as_ref()),
            sent: last_sent,
            received: last_trace,
            attempts: max_attempts,
            failure: last_error.as_ref().map(ExchangeError::kind),
        }
    }

    fn attempt<O, E, S>(
        &self,
        opener: &mut O,
        env: &E,
        cycle: &mut Cycle<'_, S>,
        frame: &[u8],
    ) -> Result<&'static str, ExchangeError>
    where
        O: LinkOpener + ?Sized,
        E: Environment + ?Sized,
        S: EventSink + ?Sized,
    {
        let mut link = opener
            .open(&self.params)
            .map_err(|err| ExchangeError::TransportUnavailable { reason: err.to_string() })?;
        cycle.enter(ExchangeState::Opened);

        let result = self.converse(&mut link, env, cycle, frame);
        drop(link);
        result
    }

    fn converse<L, E, S>(
        &self,
        link: &mut L,
        env: &E,
        cycle: &mut Cycle<'_, S>,
        frame: &[u8],
    ) -> Result<&'static str, ExchangeError>
    where
        L: Link,
        E: Environment + ?Sized,
        S: EventSink + ?Sized,
    {
        purge(link, cycle);
        if let Err(err) = link.set_control_lines(false, false).and_then(|()| link.set_control_lines(true, true)) {
            let attempt = cycle.attempt;
            cycle.emit(ExchangeEvent::LineControlIgnored { attempt, reason: err.to_string() });
        }
        env.sleep(SETTLE_DELAY);

        if self.probe {
            if link.write_all(frame).and_then(|()| link.flush()).is_ok() {
                cycle.sent(frame);
            }
            return Ok(MSG_PROBE);
        }

        link.write_all(frame)?;
        link.flush()?;
        cycle.sent(frame);

        let spec = &self.spec;
        if !spec.expect_ack && spec.expect_bytes == 0 && self.expectations.is_none() {
            return Ok(MSG_FIRE_AND_FORGET);
        }

        let read_timeout = spec.read_timeout(self.params.read_timeout());
        if spec.expect_ack {
            cycle.enter(ExchangeState::AwaitingAck);
            await_ack(link, env, cycle, read_timeout)?;
        }

        cycle.enter(ExchangeState::ReadingResponse);
        let deadline = env.now() + read_timeout;
        if spec.expect_bytes > 0 {
            read_exact(link, env, cycle, spec.expect_bytes, deadline)?;
        } else if spec.wrap {
            read_to_etx(link, env, cycle, deadline)?;
        } else {
            read_burst(link, env, cycle, deadline)?;
        }

        if let Some(expectations) = &self.expectations {
            expectations.check(&cycle.trace).map_err(ExchangeError::ValidationMismatch)?;
            return Ok(MSG_VALIDATED);
        }

        Ok(match (spec.expect_ack, cycle.trace.is_empty()) {
            (true, true) => MSG_HANDSHAKE_ONLY,
            (true, false) => MSG_ACK_HANDLED,
            (false, _) => MSG_SENT,
        })
    }
}

fn await_ack<L, E, S>(
    link: &mut L,
    env: &E,
    cycle: &mut Cycle<'_, S>,
    read_timeout: Duration,
) -> Result<(), ExchangeError>
where
    L: Link,
    E: Environment + ?Sized,
    S: EventSink + ?Sized,
{
    let window = read_timeout.min(ACK_WAIT_CAP);
    let mut byte = [0_u8; 1];
    let attempt = cycle.attempt;

    if read_within(link, env, &mut byte, env.now() + window)? == 0 {
        return Err(ExchangeError::HandshakeTimeout { timeout_ms: millis(window), attempt });
    }

    match byte[0] {
        ACK => Ok(()),
        NAK => Err(ExchangeError::HandshakeRejected { attempt }),
        // Handshake-less device: the first byte is already payload.
        other => {
            cycle.record(&[other]);
            Ok(())
        },
    }
}

/// Per-attempt bookkeeping.
struct Cycle<'s, S: EventSink + ?Sized> {
    attempt: u32,
    state: ExchangeState,
    sent: Vec<u8>,
    trace: Vec<u8>,
    sink: &'s mut S,
}

impl<'s, S: EventSink + ?Sized> Cycle<'s, S> {
    fn new(attempt: u32, sink: &'s mut S) -> Self {
        Self { attempt, state: ExchangeState::Idle, sent: Vec::new(), trace: Vec::new(), sink }
    }

    fn enter(&mut self, to: ExchangeState) {
        if self.state == to {
            return;
        }
        let from = mem::replace(&mut self.state, to);
        self.sink.emit(ExchangeEvent::StateChanged { attempt: self.attempt, from, to });
    }

    fn sent(&mut self, frame: &[u8]) {
        self.sent = frame.to_vec();
        self.sink.emit(ExchangeEvent::FrameSent { attempt: self.attempt, bytes: frame.to_vec() });
    }

    fn record(&mut self, bytes: &[u8]) {
        self.trace.extend_from_slice(bytes);
        self.sink.emit(ExchangeEvent::BytesReceived { attempt: self.attempt, bytes: bytes.to_vec() });
    }

    fn emit(&mut self, event: ExchangeEvent) {
        self.sink.emit(event);
    }
}

/// Read into `buf`, waiting until `deadline` for the first byte.
///
/// Returns `Ok(0)` once the deadline passes with nothing read.
fn read_within<L, E>(link: &mut L, env: &E, buf: &mut [u8], deadline: Instant) -> io::Result<usize>
where
    L: Link,
    E: Environment + ?Sized,
{
    loop {
        let Some(left) = remaining(env, deadline) else {
            return Ok(0);
        };
        let n = link.read(buf, left)?;
        if n > 0 {
            return Ok(n);
        }
        if let Some(left) = remaining(env, deadline) {
            env.sleep(POLL_INTERVAL.min(left));
        }
    }
}

fn read_exact<L, E, S>(
    link: &mut L,
    env: &E,
    cycle: &mut Cycle<'_, S>,
    expected: usize,
    deadline: Instant,
) -> Result<(), ExchangeError>
where
    L: Link,
    E: Environment + ?Sized,
    S: EventSink + ?Sized,
{
    let mut buf = vec![0_u8; expected.min(MAX_BURST)];
    let mut received = 0;
    while received < expected {
        let want = (expected - received).min(buf.len());
        let n = read_within(link, env, &mut buf[..want], deadline)?;
        if n == 0 {
            break;
        }
        cycle.record(&buf[..n]);
        received += n;
    }

    if received < expected {
        purge(link, cycle);
        return Err(ExchangeError::ReadTimeout { expected, received });
    }
    Ok(())
}

fn read_to_etx<L, E, S>(
    link: &mut L,
    env: &E,
    cycle: &mut Cycle<'_, S>,
    deadline: Instant,
) -> Result<(), ExchangeError>
where
    L: Link,
    E: Environment + ?Sized,
    S: EventSink + ?Sized,
{
    let mut byte = [0_u8; 1];
    while cycle.trace.len() < MAX_BURST {
        if read_within(link, env, &mut byte, deadline)? == 0 {
            // No terminator before the deadline: keep what arrived.
            break;
        }
        cycle.record(&byte);
        if byte[0] == ETX {
            break;
        }
    }
    Ok(())
}

fn read_burst<L, E, S>(
    link: &mut L,
    env: &E,
    cycle: &mut Cycle<'_, S>,
    deadline: Instant,
) -> Result<(), ExchangeError>
where
    L: Link,
    E: Environment + ?Sized,
    S: EventSink + ?Sized,
{
    let mut buf = vec![0_u8; MAX_BURST];

    while cycle.trace.len() < MAX_BURST {
        let room = MAX_BURST - cycle.trace.len();
        let mut n = read_within(link, env, &mut buf[..room], deadline)?;
        if n == 0 {
            break;
        }
        while n < room {
            let more = read_within(link, env, &mut buf[n..room], deadline.min(env.now() + QUIET_GAP))?;
            if more == 0 {
                break;
            }
            n += more;
        }
        cycle.record(&buf[..n]);
    }
    Ok(())
}

/// Discard pending input, reporting a driver that refuses.
fn purge<L, S>(link: &mut L, cycle: &mut Cycle<'_, S>)
where
    L: Link,
    S: EventSink + ?Sized,
{
    if let Err(err) = link.purge_input() {
        let attempt = cycle.attempt;
        cycle.emit(ExchangeEvent::PurgeFailed { attempt, reason: err.to_string() });
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
