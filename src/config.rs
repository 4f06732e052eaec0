use std::time::Duration;

/// Configuration for a [`GenerationLoop`](crate::GenerationLoop).
///
/// Use [`LoopConfig::builder()`] for ergonomic construction, or
/// [`LoopConfig::default()`] for sensible defaults (no cooldown, in-flight
/// requests are left to finish).
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Pause between a result arriving and the next request (0 = none).
    pub cooldown: Duration,

    /// Abort the in-flight request task on stop instead of letting it finish.
    pub abort_in_flight_on_stop: bool,

    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(0),
            abort_in_flight_on_stop: false,
            event_capacity: 64,
        }
    }
}

impl LoopConfig {
    /// Start building a config with the builder pattern.
    pub fn builder() -> LoopConfigBuilder {
        LoopConfigBuilder::default()
    }
}

/// Builder for [`LoopConfig`].
#[derive(Default)]
pub struct LoopConfigBuilder {
    config: LoopConfig,
}

impl LoopConfigBuilder {
    /// Set the pause between consecutive requests.
    pub fn with_cooldown(mut self, duration: Duration) -> Self {
        self.config.cooldown = duration;
        self
    }

    /// Abort the underlying request when the loop is stopped.
    pub fn with_abort_in_flight_on_stop(mut self, abort: bool) -> Self {
        self.config.abort_in_flight_on_stop = abort;
        self
    }

    /// Set the event channel capacity (minimum 1).
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity.max(1);
        self
    }

    /// Build the final [`LoopConfig`].
    pub fn build(self) -> LoopConfig {
        self.config
    }
}
