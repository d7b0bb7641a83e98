//! World state after a scenario run.

use std::time::Duration;

use trafficlink_core::ExchangeOutcome;

use crate::{recording::RecordingSink, sim_device::SimDevice};

/// Everything an oracle can inspect once the exchange has finished.
pub struct World {
    outcome: ExchangeOutcome,
    device: SimDevice,
    events: RecordingSink,
    elapsed: Duration,
}

impl World {
    pub(crate) fn new(outcome: ExchangeOutcome, device: SimDevice, events: RecordingSink, elapsed: Duration) -> Self {
        Self { outcome, device, events, elapsed }
    }

    /// Outcome returned by the engine.
    pub fn outcome(&self) -> &ExchangeOutcome {
        &self.outcome
    }

    /// The simulated controller.
    pub fn device(&self) -> &SimDevice {
        &self.device
    }

    /// Events emitted during the run.
    pub fn events(&self) -> &RecordingSink {
        &self.events
    }

    /// Virtual time consumed by the run.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Frames the device saw.
    pub fn frames_written(&self) -> usize {
        self.device.writes().len()
    }

    /// Fail unless every opened link was released.
    pub fn check_released(&self) -> Result<(), String> {
        if self.device.is_held() {
            return Err("link still held after the exchange".to_string());
        }
        if self.device.opens() != self.device.closes() {
            return Err(format!(
                "{} opens but {} closes",
                self.device.opens(),
                self.device.closes()
            ));
        }
        Ok(())
    }
}
