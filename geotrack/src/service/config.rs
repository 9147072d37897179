//! Tracking service configuration.

use std::time::Duration;

use crate::position::{IngestorConfig, DEFAULT_HISTORY_CAPACITY};

use super::events::EventChannelConfig;

/// Configuration for a [`TrackingService`](super::TrackingService).
#[derive(Debug, Clone)]
pub struct TrackingConfig {
    /// Samples retained per equipment (oldest evicted first).
    pub history_capacity: usize,

    /// Ingestion classification tuning.
    pub ingest: IngestorConfig,

    /// Silence longer than this flags equipment as inactive.
    pub inactivity_threshold: Duration,

    /// How often the inactivity sweeper runs.
    pub sweep_interval: Duration,

    /// Event channel capacities.
    pub channels: EventChannelConfig,
}

impl TrackingConfig {
    /// Default silence threshold before a connection-lost alert (30 minutes).
    pub const DEFAULT_INACTIVITY_THRESHOLD: Duration = Duration::from_secs(30 * 60);

    /// Default sweep cadence (5 minutes).
    pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            ingest: IngestorConfig::default(),
            inactivity_threshold: Self::DEFAULT_INACTIVITY_THRESHOLD,
            sweep_interval: Self::DEFAULT_SWEEP_INTERVAL,
            channels: EventChannelConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrackingConfig::default();
        assert_eq!(config.history_capacity, 100);
        assert_eq!(config.inactivity_threshold, Duration::from_secs(1800));
        assert_eq!(config.sweep_interval, Duration::from_secs(300));
        assert_eq!(config.ingest.duplicate_distance_m, 1.0);
        assert_eq!(config.ingest.moving_threshold_mps, 0.5);
    }
}
