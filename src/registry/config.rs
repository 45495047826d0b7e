//! Presence registry configuration

use std::time::Duration;

/// Configuration for the presence registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Expected interval between booth heartbeats
    pub heartbeat_interval: Duration,

    /// Gap after which a booth is swept offline
    ///
    /// Defaults to 3x the heartbeat interval to absorb jitter and a single
    /// dropped heartbeat without flapping.
    pub liveness_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        let heartbeat_interval = Duration::from_secs(5);
        Self {
            heartbeat_interval,
            liveness_timeout: heartbeat_interval * 3,
        }
    }
}

impl RegistryConfig {
    /// Set the heartbeat interval, keeping the 3x liveness timeout
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self.liveness_timeout = interval * 3;
        self
    }

    /// Override the liveness timeout independently of the heartbeat interval
    pub fn liveness_timeout(mut self, timeout: Duration) -> Self {
        self.liveness_timeout = timeout;
        self
    }
}
