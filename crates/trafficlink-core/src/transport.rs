//! Link abstraction for ordered byte streams.
//!
//! Abstracts over anything that moves bytes in order with bounded reads: a
//! serial port in production, a scripted device in simulation.
//!
//! Ownership is the release mechanism. A [`LinkOpener`] hands out an owned
//! [`Link`]; dropping it closes the underlying endpoint. The exchange engine
//! holds the link only for the duration of one attempt, so the endpoint is
//! released on every exit path without explicit cleanup calls.

use std::{io, time::Duration};

use thiserror::Error;

use crate::config::SerialParams;

/// An open, exclusively owned byte link.
pub trait Link {
    /// Write every byte of `bytes`.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Push buffered output to the wire.
    fn flush(&mut self) -> io::Result<()>;

    /// Read whatever is available into `buf`, waiting at most `timeout` for
    /// the first byte.
    ///
    /// Returns `Ok(0)` if nothing arrived in time. A zero `timeout` only
    /// collects bytes that are already buffered.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;

    /// Discard any buffered inbound bytes.
    fn purge_input(&mut self) -> io::Result<()>;

    /// Drive the RTS and DTR control lines.
    fn set_control_lines(&mut self, rts: bool, dtr: bool) -> io::Result<()>;
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        (**self).read(buf, timeout)
    }

    fn purge_input(&mut self) -> io::Result<()> {
        (**self).purge_input()
    }

    fn set_control_lines(&mut self, rts: bool, dtr: bool) -> io::Result<()> {
        (**self).set_control_lines(rts, dtr)
    }
}

/// Acquires links for a set of connection parameters.
///
/// A second open of an endpoint that is already held must fail here; the
/// engine treats that like any other open failure and retries per policy.
pub trait LinkOpener {
    /// Link type produced by this opener.
    type Link: Link;

    /// Open and configure the endpoint described by `params`.
    fn open(&mut self, params: &SerialParams) -> Result<Self::Link, LinkError>;
}

impl<O: LinkOpener + ?Sized> LinkOpener for &mut O {
    type Link = O::Link;

    fn open(&mut self, params: &SerialParams) -> Result<Self::Link, LinkError> {
        (**self).open(params)
    }
}

/// Failures while acquiring or configuring a link.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The endpoint could not be opened.
    #[error("could not open {port}: {reason}")]
    Open {
        /// Endpoint name.
        port: String,
        /// Driver-provided reason.
        reason: String,
    },

    /// The endpoint refused the requested line settings.
    #[error("unsupported setting on {port}: {setting}")]
    Unsupported {
        /// Endpoint name.
        port: String,
        /// Human-readable setting that was refused.
        setting: String,
    },

    /// Other I/O failure while configuring.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
