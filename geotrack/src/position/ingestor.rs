//! Position ingestion: validation, duplicate suppression, sequence
//! checks, and movement classification.
//!
//! The ingestor is pure state-transition logic over one equipment's
//! [`EquipmentTrackState`]; the service layer owns locking and fan-out.
//!
//! # Classification
//!
//! - **Duplicate**: within 1 m and 10 s of the previous sample. GPS
//!   receivers jitter around a fixed point while equipment is parked;
//!   treating those echoes as movement would fire spurious alerts. The
//!   call succeeds but nothing is recorded.
//! - **Out of sequence**: timestamp earlier than the previous sample.
//!   Network delivery reorders real traffic, so the sample is still
//!   appended (arrival order) and flagged for quality metrics rather
//!   than rejected.
//! - **Accepted**: appended, last-seen bumped, error counter reset,
//!   instantaneous speed derived from the previous sample.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::geofence::GeofenceId;

use super::history::{PositionHistory, DEFAULT_HISTORY_CAPACITY};
use super::sample::{InvalidPositionError, PositionSample};

/// Tuning knobs for ingestion classification.
#[derive(Debug, Clone)]
pub struct IngestorConfig {
    /// Samples closer than this to their predecessor may be duplicates.
    pub duplicate_distance_m: f64,

    /// Samples within this many seconds of their predecessor may be
    /// duplicates.
    pub duplicate_window_secs: f64,

    /// Below this many seconds between samples, instantaneous speed is
    /// not derived (too close to timestamp noise).
    pub min_speed_interval_secs: f64,

    /// Speed above which equipment counts as moving, in m/s.
    pub moving_threshold_mps: f64,
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self {
            duplicate_distance_m: 1.0,
            duplicate_window_secs: 10.0,
            min_speed_interval_secs: 1.0,
            moving_threshold_mps: 0.5,
        }
    }
}

/// Connection quality derived from the consecutive-error counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionQuality {
    /// Reporting normally.
    Good,
    /// Missed one or two inactivity sweeps.
    Degraded,
    /// Missed three or more inactivity sweeps.
    Lost,
}

impl std::fmt::Display for ConnectionQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Good => write!(f, "good"),
            Self::Degraded => write!(f, "degraded"),
            Self::Lost => write!(f, "lost"),
        }
    }
}

/// Mutable tracking state for one equipment id.
///
/// Created lazily on the first ingested position; removed only by an
/// explicit stop-tracking call.
#[derive(Debug)]
pub struct EquipmentTrackState {
    /// Bounded sample history, arrival order.
    pub history: PositionHistory,

    /// Last evaluated containment per geofence (absent = outside).
    pub containment: HashMap<GeofenceId, bool>,

    /// Inactivity sweeps missed since the last accepted position.
    pub consecutive_errors: u32,

    /// Wall-clock receipt time of the last accepted position.
    pub last_seen: DateTime<Utc>,

    /// Whether the last derived speed exceeded the moving threshold.
    pub moving: bool,
}

impl EquipmentTrackState {
    /// Create empty state, stamped with the creation time.
    pub fn new(history_capacity: usize, created_at: DateTime<Utc>) -> Self {
        Self {
            history: PositionHistory::new(history_capacity),
            containment: HashMap::new(),
            consecutive_errors: 0,
            last_seen: created_at,
            moving: false,
        }
    }

    /// Classify connection quality from the error counter.
    pub fn connection_quality(&self) -> ConnectionQuality {
        match self.consecutive_errors {
            0 => ConnectionQuality::Good,
            1 | 2 => ConnectionQuality::Degraded,
            _ => ConnectionQuality::Lost,
        }
    }
}

/// Movement metrics derived while accepting a sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MovementUpdate {
    /// Instantaneous speed in m/s; `None` when the inter-sample gap is
    /// under the minimum interval or no prior sample exists.
    pub speed_mps: Option<f64>,

    /// Whether the equipment counts as moving after this sample.
    pub moving: bool,

    /// Whether the moving flag flipped with this sample.
    pub changed: bool,
}

/// Result of ingesting one position sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IngestOutcome {
    /// Appended in order; movement metrics derived.
    Accepted(MovementUpdate),

    /// Appended, but its timestamp precedes the previous sample's.
    OutOfSequence,

    /// Near-identical echo of the previous sample; discarded.
    Duplicate,
}

impl IngestOutcome {
    /// True for outcomes that appended the sample to history.
    pub fn is_recorded(&self) -> bool {
        !matches!(self, Self::Duplicate)
    }
}

/// Stateless ingestion logic, parameterized by [`IngestorConfig`].
#[derive(Debug, Clone, Default)]
pub struct PositionIngestor {
    config: IngestorConfig,
}

impl PositionIngestor {
    /// Create an ingestor with the given tuning.
    pub fn new(config: IngestorConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &IngestorConfig {
        &self.config
    }

    /// Ingest one sample into the equipment's state.
    ///
    /// `received_at` is the wall-clock receipt time used for last-seen
    /// bookkeeping; the sample's own timestamp drives speed derivation
    /// and sequence checks.
    ///
    /// # Errors
    ///
    /// [`InvalidPositionError`] when coordinates or accuracy are out of
    /// range; state is untouched.
    pub fn ingest(
        &self,
        state: &mut EquipmentTrackState,
        sample: PositionSample,
        received_at: DateTime<Utc>,
    ) -> Result<IngestOutcome, InvalidPositionError> {
        sample.validate()?;

        let previous = state.history.latest().cloned();

        if let Some(prev) = &previous {
            if self.is_duplicate(prev, &sample) {
                trace!(
                    lat = sample.latitude,
                    lon = sample.longitude,
                    "Suppressed duplicate position"
                );
                return Ok(IngestOutcome::Duplicate);
            }
        }

        let out_of_sequence = previous
            .as_ref()
            .is_some_and(|prev| sample.timestamp < prev.timestamp);

        let speed_mps = previous
            .as_ref()
            .and_then(|prev| self.derive_speed(prev, &sample));

        state.history.push(sample);
        state.last_seen = received_at;
        state.consecutive_errors = 0;

        if out_of_sequence {
            return Ok(IngestOutcome::OutOfSequence);
        }

        let update = match speed_mps {
            Some(speed) => {
                let moving = speed > self.config.moving_threshold_mps;
                let changed = moving != state.moving;
                state.moving = moving;
                MovementUpdate {
                    speed_mps: Some(speed),
                    moving,
                    changed,
                }
            }
            // Speed undefined: keep the previous movement classification
            None => MovementUpdate {
                speed_mps: None,
                moving: state.moving,
                changed: false,
            },
        };

        Ok(IngestOutcome::Accepted(update))
    }

    /// Near-identical echo: closer than the distance threshold and
    /// within the duplicate window in either timestamp direction.
    fn is_duplicate(&self, prev: &PositionSample, sample: &PositionSample) -> bool {
        let dt_secs =
            (sample.timestamp - prev.timestamp).num_milliseconds().abs() as f64 / 1000.0;
        dt_secs < self.config.duplicate_window_secs
            && prev.distance_to(sample) < self.config.duplicate_distance_m
    }

    /// Instantaneous speed over the last pair, `None` when the gap is
    /// below the minimum interval (this also covers out-of-sequence
    /// pairs, whose gap is negative).
    fn derive_speed(&self, prev: &PositionSample, sample: &PositionSample) -> Option<f64> {
        let dt_secs = (sample.timestamp - prev.timestamp).num_milliseconds() as f64 / 1000.0;
        if dt_secs < self.config.min_speed_interval_secs {
            return None;
        }
        Some(prev.distance_to(sample) / dt_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::sample::SourceKind;
    use chrono::{Duration, TimeZone};

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn sample(lat: f64, lon: f64, offset_secs: i64) -> PositionSample {
        PositionSample::new(
            lat,
            lon,
            0.0,
            5.0,
            base_time() + Duration::seconds(offset_secs),
            SourceKind::Gps,
        )
    }

    fn state() -> EquipmentTrackState {
        EquipmentTrackState::new(DEFAULT_HISTORY_CAPACITY, base_time())
    }

    #[test]
    fn test_invalid_sample_rejected_without_mutation() {
        let ingestor = PositionIngestor::default();
        let mut state = state();

        let bad = PositionSample::new(91.0, 0.0, 0.0, 5.0, base_time(), SourceKind::Gps);
        assert!(ingestor.ingest(&mut state, bad, base_time()).is_err());
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_first_sample_accepted_without_speed() {
        let ingestor = PositionIngestor::default();
        let mut state = state();

        let outcome = ingestor
            .ingest(&mut state, sample(53.5, 10.0, 0), base_time())
            .unwrap();

        match outcome {
            IngestOutcome::Accepted(update) => {
                assert_eq!(update.speed_mps, None);
                assert!(!update.moving);
            }
            other => panic!("Expected Accepted, got {:?}", other),
        }
        assert_eq!(state.history.len(), 1);
    }

    #[test]
    fn test_duplicate_suppressed_and_history_unchanged() {
        let ingestor = PositionIngestor::default();
        let mut state = state();

        ingestor
            .ingest(&mut state, sample(53.5, 10.0, 0), base_time())
            .unwrap();
        // ~0m away, 5s later: duplicate
        let outcome = ingestor
            .ingest(&mut state, sample(53.5, 10.0, 5), base_time())
            .unwrap();

        assert_eq!(outcome, IngestOutcome::Duplicate);
        assert!(!outcome.is_recorded());
        assert_eq!(state.history.len(), 1);
    }

    #[test]
    fn test_same_spot_after_window_is_not_duplicate() {
        let ingestor = PositionIngestor::default();
        let mut state = state();

        ingestor
            .ingest(&mut state, sample(53.5, 10.0, 0), base_time())
            .unwrap();
        // Same spot but 15s later: outside the 10s window
        let outcome = ingestor
            .ingest(&mut state, sample(53.5, 10.0, 15), base_time())
            .unwrap();

        assert!(matches!(outcome, IngestOutcome::Accepted(_)));
        assert_eq!(state.history.len(), 2);
    }

    #[test]
    fn test_out_of_sequence_still_appended() {
        let ingestor = PositionIngestor::default();
        let mut state = state();

        ingestor
            .ingest(&mut state, sample(53.5, 10.0, 100), base_time())
            .unwrap();
        let outcome = ingestor
            .ingest(&mut state, sample(53.6, 10.1, 50), base_time())
            .unwrap();

        assert_eq!(outcome, IngestOutcome::OutOfSequence);
        assert!(outcome.is_recorded());
        assert_eq!(state.history.len(), 2);
    }

    #[test]
    fn test_speed_derivation() {
        let ingestor = PositionIngestor::default();
        let mut state = state();

        ingestor
            .ingest(&mut state, sample(0.0, 0.0, 0), base_time())
            .unwrap();
        // ~1 degree latitude = ~111195m over 1000s = ~111 m/s
        let outcome = ingestor
            .ingest(&mut state, sample(1.0, 0.0, 1000), base_time())
            .unwrap();

        match outcome {
            IngestOutcome::Accepted(update) => {
                let speed = update.speed_mps.expect("speed should be derived");
                assert!((speed - 111.2).abs() < 1.0, "Expected ~111 m/s, got {}", speed);
                assert!(update.moving);
                assert!(update.changed, "Stationary to moving should flip the flag");
            }
            other => panic!("Expected Accepted, got {:?}", other),
        }
    }

    #[test]
    fn test_subsecond_gap_yields_no_speed() {
        let ingestor = PositionIngestor::default();
        let mut state = state();

        let t0 = base_time();
        ingestor
            .ingest(&mut state, sample(0.0, 0.0, 0), t0)
            .unwrap();

        // 500ms later, 100m away: gap below min interval, no speed
        let mut quick = sample(0.001, 0.0, 0);
        quick.timestamp = t0 + Duration::milliseconds(500);
        let outcome = ingestor.ingest(&mut state, quick, t0).unwrap();

        match outcome {
            IngestOutcome::Accepted(update) => assert_eq!(update.speed_mps, None),
            other => panic!("Expected Accepted, got {:?}", other),
        }
    }

    #[test]
    fn test_moving_flag_persists_and_resets() {
        let ingestor = PositionIngestor::default();
        let mut state = state();

        ingestor
            .ingest(&mut state, sample(0.0, 0.0, 0), base_time())
            .unwrap();
        ingestor
            .ingest(&mut state, sample(0.01, 0.0, 100), base_time())
            .unwrap();
        assert!(state.moving, "~11 m/s should classify as moving");

        // Crawling 1m in 100s: below the 0.5 m/s threshold
        let outcome = ingestor
            .ingest(&mut state, sample(0.010009, 0.0, 200), base_time())
            .unwrap();
        match outcome {
            IngestOutcome::Accepted(update) => {
                assert!(!update.moving);
                assert!(update.changed, "Moving to stationary should flip the flag");
            }
            other => panic!("Expected Accepted, got {:?}", other),
        }
    }

    #[test]
    fn test_accepted_sample_resets_error_counter() {
        let ingestor = PositionIngestor::default();
        let mut state = state();
        state.consecutive_errors = 4;
        assert_eq!(state.connection_quality(), ConnectionQuality::Lost);

        ingestor
            .ingest(&mut state, sample(53.5, 10.0, 0), base_time())
            .unwrap();
        assert_eq!(state.consecutive_errors, 0);
        assert_eq!(state.connection_quality(), ConnectionQuality::Good);
    }

    #[test]
    fn test_connection_quality_bands() {
        let mut s = state();
        assert_eq!(s.connection_quality(), ConnectionQuality::Good);
        s.consecutive_errors = 1;
        assert_eq!(s.connection_quality(), ConnectionQuality::Degraded);
        s.consecutive_errors = 3;
        assert_eq!(s.connection_quality(), ConnectionQuality::Lost);
    }

    #[test]
    fn test_last_seen_uses_receipt_time() {
        let ingestor = PositionIngestor::default();
        let mut state = state();

        let received = base_time() + Duration::minutes(5);
        ingestor
            .ingest(&mut state, sample(53.5, 10.0, 0), received)
            .unwrap();
        assert_eq!(state.last_seen, received);
    }
}
