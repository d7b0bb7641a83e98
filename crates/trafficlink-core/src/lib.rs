//! Trafficlink core logic
//!
//! Drives command/response exchanges with traffic-controller hardware over an
//! ordered byte link, decoupled from any concrete port driver or clock.
//!
//! # Architecture
//!
//! An exchange is an explicit state machine (`Idle → Opened → AwaitingAck →
//! ReadingResponse → Closed`, with `Failed` reachable from every non-terminal
//! state). Time and sleeping come from an [`env::Environment`], bytes move
//! through a [`transport::Link`] obtained from a [`transport::LinkOpener`].
//! Production wires in the system clock and a serial port; tests wire in a
//! virtual clock and a scripted device, and the same engine code runs in both.
//!
//! Diagnostics are emitted as [`events::ExchangeEvent`]s to an
//! [`events::EventSink`] rather than logged from inside the engine.
//!
//! # Components
//!
//! - [`catalog`]: Named command presets and their argument overrides
//! - [`command`]: Frame specification handed to the engine
//! - [`exchange`]: Exchange state machine (handshake, reads, retries)
//! - [`validate`]: Response prefix/subsequence checks
//! - [`report`]: Outcome record and details formatting
//! - [`service`]: Profile-resolving entry points
//! - [`config`]: Connection parameters and profile files
//! - [`mod@env`]: Environment abstraction (time)
//! - [`transport`]: Link abstraction (byte streams)
//! - [`events`]: Structured exchange events
//! - [`error`]: Error taxonomy

pub mod catalog;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
pub mod events;
pub mod exchange;
pub mod report;
pub mod service;
pub mod transport;
pub mod validate;

pub use catalog::{ArgValue, CommandArgs, CommandKind};
pub use command::FrameSpec;
pub use config::{CommProfile, InterfaceType, ProfileBook, ProfileId, ProfileSource, SerialParams};
pub use env::{Environment, SystemEnv};
pub use error::{ErrorKind, ExchangeError, Mismatch, ServiceError};
pub use events::{EventSink, ExchangeEvent, TracingSink};
pub use exchange::{Exchange, ExchangeState};
pub use report::ExchangeOutcome;
pub use service::{CommTester, FrameRequest};
pub use transport::{Link, LinkError, LinkOpener};
pub use validate::Expectations;
