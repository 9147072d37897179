//! Periodic inactivity sweeper.
//!
//! The one monitoring check that is not driven by incoming positions:
//! a timer task calls [`TrackingService::sweep_once`] on a fixed
//! cadence to flag equipment that has gone silent. Tests that need
//! determinism skip the task entirely and call `sweep_once` with a
//! manual clock.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::tracker::TrackingService;

/// Timer-driven wrapper around [`TrackingService::sweep_once`].
///
/// # Usage
///
/// ```ignore
/// let service = Arc::new(TrackingService::new(TrackingConfig::default()));
/// let sweeper = InactivitySweeper::new(Arc::clone(&service));
/// let cancel = sweeper.cancellation_token();
/// let handle = sweeper.start();
///
/// // ... later, on shutdown:
/// cancel.cancel();
/// handle.await?;
/// ```
pub struct InactivitySweeper {
    service: Arc<TrackingService>,
    interval: Duration,
    cancel: CancellationToken,
}

impl InactivitySweeper {
    /// Create a sweeper on the service's configured cadence.
    pub fn new(service: Arc<TrackingService>) -> Self {
        let interval = service.config().sweep_interval;
        Self::with_interval(service, interval)
    }

    /// Create a sweeper with a custom cadence.
    pub fn with_interval(service: Arc<TrackingService>, interval: Duration) -> Self {
        Self {
            service,
            interval,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the sweep loop when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawn the sweep loop.
    ///
    /// The first sweep runs one full interval after start; the loop
    /// exits when the cancellation token fires.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            debug!(interval_secs = self.interval.as_secs(), "Inactivity sweeper started");

            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // interval fires immediately; swallow the first tick so
            // sweeps start one interval after startup
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        debug!("Inactivity sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.service.sweep_once();
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::position::{PositionSample, SourceKind};
    use crate::service::config::TrackingConfig;
    use chrono::{TimeZone, Utc};

    fn tracked_service() -> (Arc<ManualClock>, Arc<TrackingService>) {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let service = Arc::new(TrackingService::with_clock(
            TrackingConfig::default(),
            clock.clone(),
        ));
        service
            .ingest_position(
                "exc-1",
                PositionSample::new(53.5, 10.0, 0.0, 5.0, start, SourceKind::Gps),
            )
            .unwrap();
        (clock, service)
    }

    #[tokio::test]
    async fn test_sweeper_fires_on_cadence() {
        tokio::time::pause();
        let (clock, service) = tracked_service();

        // Equipment goes silent well past the threshold
        clock.advance(chrono::Duration::hours(2));

        let sweeper = InactivitySweeper::with_interval(
            Arc::clone(&service),
            Duration::from_millis(100),
        );
        let cancel = sweeper.cancellation_token();
        let handle = sweeper.start();

        // Two intervals: at least one sweep must have run
        tokio::time::sleep(Duration::from_millis(250)).await;
        cancel.cancel();
        handle.await.unwrap();

        let alerts = service.alerts(&Default::default());
        assert!(
            !alerts.is_empty(),
            "Sweeper should have produced connection-lost alerts"
        );
    }

    #[tokio::test]
    async fn test_cancellation_stops_loop() {
        let (_clock, service) = tracked_service();

        let sweeper =
            InactivitySweeper::with_interval(Arc::clone(&service), Duration::from_secs(3600));
        let cancel = sweeper.cancellation_token();
        let handle = sweeper.start();

        cancel.cancel();
        // Must resolve promptly despite the hour-long interval
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("Sweeper should stop on cancellation")
            .unwrap();
    }
}
