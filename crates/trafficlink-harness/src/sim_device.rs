//! Scripted controller device.
//!
//! A [`SimDevice`] answers every frame written to it with the next scripted
//! [`Reply`] (or a standing reply once the script runs out). Reply chunks are
//! scheduled on the shared [`SimEnv`] clock; a [`SimLink`] read returns only
//! bytes whose arrival instant has passed, advancing virtual time to the next
//! arrival or by the full read timeout when nothing is due.
//!
//! The device also models the endpoint itself: only one link may be open at
//! a time, opens can be forced to fail, and every open, close, write, and
//! purge is counted for assertions.

use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use tracing::trace;
use trafficlink_core::{Environment, Link, LinkError, LinkOpener, SerialParams};

use crate::sim_env::SimEnv;

/// Largest extra delay, in milliseconds, inserted between randomly split
/// pieces of a chunk. Stays well under the 20ms quiet gap.
const MAX_JITTER_MS: usize = 4;

/// Device answer to one transmitted frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    chunks: Vec<(Duration, Vec<u8>)>,
}

impl Reply {
    /// Reply that sends nothing.
    pub fn silence() -> Self {
        Self::default()
    }

    /// Reply that sends `bytes` immediately.
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::silence().then(Duration::ZERO, bytes)
    }

    /// Append a chunk sent `delay` after the previous one.
    #[must_use]
    pub fn then(mut self, delay: Duration, bytes: impl Into<Vec<u8>>) -> Self {
        self.chunks.push((delay, bytes.into()));
        self
    }

    /// Append a chunk sent `delay_ms` milliseconds after the previous one.
    #[must_use]
    pub fn then_ms(self, delay_ms: u64, bytes: impl Into<Vec<u8>>) -> Self {
        self.then(Duration::from_millis(delay_ms), bytes)
    }
}

#[derive(Default)]
struct DeviceState {
    script: VecDeque<Reply>,
    standing: Option<Reply>,
    open_failures: u32,
    control_lines_supported: bool,
    random_chunking: bool,
    held: bool,
    opens: u32,
    closes: u32,
    purges: u32,
    writes: Vec<Vec<u8>>,
    pending: VecDeque<(Instant, u8)>,
}

/// Simulated controller on a serial line.
#[derive(Clone)]
pub struct SimDevice {
    env: SimEnv,
    state: Arc<Mutex<DeviceState>>,
}

impl SimDevice {
    /// Silent device on `env`'s clock.
    pub fn new(env: SimEnv) -> Self {
        let state = DeviceState { control_lines_supported: true, ..DeviceState::default() };
        Self { env, state: Arc::new(Mutex::new(state)) }
    }

    /// Queue a reply for the next unanswered write.
    #[must_use]
    pub fn reply(self, reply: Reply) -> Self {
        self.lock().script.push_back(reply);
        self
    }

    /// Reply used once the script is exhausted.
    #[must_use]
    pub fn always(self, reply: Reply) -> Self {
        self.lock().standing = Some(reply);
        self
    }

    /// Fail the next `count` opens.
    #[must_use]
    pub fn fail_opens(self, count: u32) -> Self {
        self.lock().open_failures = count;
        self
    }

    /// Refuse RTS/DTR changes, like adapters without modem lines.
    #[must_use]
    pub fn without_control_lines(self) -> Self {
        self.lock().control_lines_supported = false;
        self
    }

    /// Split every chunk into randomly sized pieces with small random gaps,
    /// drawn from the environment's seeded RNG.
    #[must_use]
    pub fn chunk_randomly(self) -> Self {
        self.lock().random_chunking = true;
        self
    }

    /// Opener handing out links to this device.
    pub fn opener(&self) -> SimOpener {
        SimOpener { device: self.clone() }
    }

    /// Successful opens so far.
    pub fn opens(&self) -> u32 {
        self.lock().opens
    }

    /// Links dropped so far.
    pub fn closes(&self) -> u32 {
        self.lock().closes
    }

    /// Input purges so far.
    pub fn purges(&self) -> u32 {
        self.lock().purges
    }

    /// Every frame written, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.lock().writes.clone()
    }

    /// Whether a link is currently open.
    pub fn is_held(&self) -> bool {
        self.lock().held
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn schedule(&self, reply: &Reply) {
        let mut at = self.env.now();
        let mut arrivals = Vec::new();
        let random = self.lock().random_chunking;

        for (delay, bytes) in &reply.chunks {
            at += *delay;
            if random {
                let mut rest = bytes.as_slice();
                while !rest.is_empty() {
                    let take = 1 + self.env.random_up_to(rest.len() - 1);
                    let (piece, tail) = rest.split_at(take);
                    arrivals.extend(piece.iter().map(|b| (at, *b)));
                    rest = tail;
                    at += Duration::from_millis(self.env.random_up_to(MAX_JITTER_MS) as u64);
                }
            } else {
                arrivals.extend(bytes.iter().map(|b| (at, *b)));
            }
        }
        self.lock().pending.extend(arrivals);
    }
}

/// Opens links to a [`SimDevice`].
pub struct SimOpener {
    device: SimDevice,
}

impl SimOpener {
    /// Device behind this opener.
    pub fn device(&self) -> &SimDevice {
        &self.device
    }
}

impl LinkOpener for SimOpener {
    type Link = SimLink;

    fn open(&mut self, params: &SerialParams) -> Result<SimLink, LinkError> {
        let mut state = self.device.lock();
        if state.open_failures > 0 {
            state.open_failures -= 1;
            return Err(LinkError::Open { port: params.port_name.clone(), reason: "simulated open failure".into() });
        }
        if state.held {
            return Err(LinkError::Open { port: params.port_name.clone(), reason: "port busy".into() });
        }
        state.held = true;
        state.opens += 1;
        drop(state);

        trace!(port = %params.port_name, "sim link opened");
        Ok(SimLink { device: self.device.clone() })
    }
}

/// Open link to a [`SimDevice`]. Dropping it releases the device.
pub struct SimLink {
    device: SimDevice,
}

impl Link for SimLink {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let reply = {
            let mut state = self.device.lock();
            state.writes.push(bytes.to_vec());
            state.script.pop_front().or_else(|| state.standing.clone())
        };
        if let Some(reply) = reply {
            self.device.schedule(&reply);
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let env = &self.device.env;
        let now = env.now();
        let mut state = self.device.lock();

        let next = state.pending.front().map(|&(arrival, _)| arrival);
        match next {
            Some(arrival) if arrival <= now + timeout => env.advance_to(arrival),
            _ => {
                drop(state);
                env.advance(timeout);
                return Ok(0);
            },
        }

        let now = env.now();
        let mut n = 0;
        while n < buf.len() {
            match state.pending.front() {
                Some(&(arrival, byte)) if arrival <= now => {
                    buf[n] = byte;
                    n += 1;
                    state.pending.pop_front();
                },
                _ => break,
            }
        }
        Ok(n)
    }

    fn purge_input(&mut self) -> io::Result<()> {
        let now = self.device.env.now();
        let mut state = self.device.lock();
        state.purges += 1;
        while state.pending.front().is_some_and(|&(arrival, _)| arrival <= now) {
            state.pending.pop_front();
        }
        Ok(())
    }

    fn set_control_lines(&mut self, _rts: bool, _dtr: bool) -> io::Result<()> {
        if self.device.lock().control_lines_supported {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::Unsupported, "modem lines not available"))
        }
    }
}

impl Drop for SimLink {
    fn drop(&mut self) {
        let mut state = self.device.lock();
        state.held = false;
        state.closes += 1;
        // Bytes still in flight are lost with the line.
        state.pending.clear();
    }
}
