//! Media relay configuration

/// Configuration for a booth's media relay
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Maximum buffered preview frames before the oldest is dropped
    ///
    /// Kept small on purpose: a stale preview is worse than a dropped one.
    pub preview_queue_depth: usize,

    /// Capacity of the reliable control channel (pairing, capture results,
    /// disconnects); senders back-pressure instead of dropping
    pub control_queue_depth: usize,

    /// Capacity of the outbound command channel (capture directives)
    pub command_queue_depth: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            preview_queue_depth: 8,
            control_queue_depth: 16,
            command_queue_depth: 16,
        }
    }
}

impl RelayConfig {
    /// Set the preview queue depth (minimum 1)
    pub fn preview_queue_depth(mut self, depth: usize) -> Self {
        self.preview_queue_depth = depth.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();

        assert_eq!(config.preview_queue_depth, 8);
        assert_eq!(config.control_queue_depth, 16);
        assert_eq!(config.command_queue_depth, 16);
    }

    #[test]
    fn test_preview_depth_floor() {
        let config = RelayConfig::default().preview_queue_depth(0);

        assert_eq!(config.preview_queue_depth, 1);
    }
}
