//! Scenario testing.
//!
//! A scenario scripts a simulated controller, runs one exchange against it,
//! and hands the resulting [`World`] to an oracle. The oracle is mandatory:
//! a scenario cannot run without a verdict on its final state.

pub mod builder;
pub mod world;

pub use builder::{RunnableScenario, Scenario};
pub use world::World;

/// Oracle verifying the final world state.
pub type OracleFn = Box<dyn Fn(&World) -> Result<(), String>>;
