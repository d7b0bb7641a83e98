//! Deterministic simulation harness for trafficlink exchanges.
//!
//! Virtual-time implementations of the Environment and Link traits. A
//! [`SimDevice`] plays the controller: it answers each transmitted frame
//! with a scripted [`Reply`] whose chunks arrive at virtual instants, so
//! handshake windows, short reads, and quiet gaps are exercised without
//! real sleeping.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod recording;
pub mod scenario;
pub mod sim_device;
pub mod sim_env;

pub use recording::RecordingSink;
pub use sim_device::{Reply, SimDevice, SimLink, SimOpener};
pub use sim_env::SimEnv;
