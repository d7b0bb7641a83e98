//! Event recording.

use trafficlink_core::{ExchangeEvent, ExchangeState, events::EventSink};

/// Sink that keeps every event for later assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Vec<ExchangeEvent>,
}

impl RecordingSink {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded, in order.
    pub fn events(&self) -> &[ExchangeEvent] {
        &self.events
    }

    /// States entered by `attempt`, in order.
    pub fn states(&self, attempt: u32) -> Vec<ExchangeState> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ExchangeEvent::StateChanged { attempt: a, to, .. } if *a == attempt => Some(*to),
                _ => None,
            })
            .collect()
    }

    /// Number of attempts that started.
    pub fn attempts_started(&self) -> usize {
        self.events.iter().filter(|e| matches!(e, ExchangeEvent::AttemptStarted { .. })).count()
    }

    /// Number of attempts that failed.
    pub fn attempts_failed(&self) -> usize {
        self.events.iter().filter(|e| matches!(e, ExchangeEvent::AttemptFailed { .. })).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: ExchangeEvent) {
        self.events.push(event);
    }
}
