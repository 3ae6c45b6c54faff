use std::time::Duration;

use crate::domain::constants::*;

/// Runtime parameters of the reconciliation controller
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    /// Levels requested for the initial order book snapshot
    pub depth_limit: u32,
    /// Requested speed of the depth stream
    pub update_interval: Duration,
    /// Pings slower than this are reported as degraded
    pub latency_warn_threshold: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            depth_limit: DEFAULT_DEPTH_LIMIT,
            update_interval: Duration::from_millis(DEFAULT_UPDATE_INTERVAL_MS),
            latency_warn_threshold: Duration::from_millis(LATENCY_WARN_THRESHOLD_MS),
        }
    }
}
