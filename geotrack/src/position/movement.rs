//! Windowed movement statistics.
//!
//! A fold over consecutive sample pairs in (optionally time-filtered)
//! history. Pairs with a non-positive timestamp gap (out-of-sequence
//! arrivals) contribute nothing: their speeds would be noise.

use chrono::{DateTime, Utc};

use crate::geo;

use super::history::PositionHistory;
use super::sample::PositionSample;

/// Aggregate movement metrics over a history window.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MovementSummary {
    /// Samples that fell inside the window.
    pub sample_count: usize,

    /// Sum of consecutive pairwise distances in meters.
    pub total_distance_m: f64,

    /// Seconds spent with pairwise speed above the moving threshold.
    pub moving_secs: f64,

    /// Seconds spent at or below the moving threshold.
    pub stopped_secs: f64,

    /// Distance-weighted average speed in m/s (total distance over
    /// total elapsed pair time); zero when no pairs qualify.
    pub average_speed_mps: f64,

    /// Fastest pairwise speed observed, in m/s.
    pub max_speed_mps: f64,

    /// Travel bearing of the last qualifying pair, degrees [0, 360).
    ///
    /// `None` when fewer than two samples qualify or the last pair
    /// covered no distance.
    pub final_bearing_deg: Option<f64>,
}

/// Fold movement statistics over `history`, optionally restricted to
/// samples whose timestamps fall in the closed `[start, end]` range.
///
/// Runs in O(window size).
pub fn analyze(
    history: &PositionHistory,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    moving_threshold_mps: f64,
) -> MovementSummary {
    let mut summary = MovementSummary::default();
    let mut elapsed_secs = 0.0;
    let mut previous: Option<&PositionSample> = None;

    for sample in history.range(start, end) {
        summary.sample_count += 1;

        if let Some(prev) = previous {
            let dt_secs = (sample.timestamp - prev.timestamp).num_milliseconds() as f64 / 1000.0;
            if dt_secs > 0.0 {
                let distance = prev.distance_to(sample);
                let speed = distance / dt_secs;

                summary.total_distance_m += distance;
                elapsed_secs += dt_secs;
                if speed > moving_threshold_mps {
                    summary.moving_secs += dt_secs;
                } else {
                    summary.stopped_secs += dt_secs;
                }
                if speed > summary.max_speed_mps {
                    summary.max_speed_mps = speed;
                }
                if distance > f64::EPSILON {
                    summary.final_bearing_deg = Some(geo::bearing_degrees(
                        prev.latitude,
                        prev.longitude,
                        sample.latitude,
                        sample.longitude,
                    ));
                }
            }
        }
        previous = Some(sample);
    }

    if elapsed_secs > 0.0 {
        summary.average_speed_mps = summary.total_distance_m / elapsed_secs;
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::sample::{PositionSample, SourceKind};
    use chrono::{Duration, TimeZone};

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
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

    fn history_of(samples: Vec<PositionSample>) -> PositionHistory {
        let mut history = PositionHistory::new(100);
        for s in samples {
            history.push(s);
        }
        history
    }

    #[test]
    fn test_empty_history_yields_default() {
        let history = PositionHistory::new(10);
        let summary = analyze(&history, None, None, 0.5);
        assert_eq!(summary, MovementSummary::default());
    }

    #[test]
    fn test_single_sample_has_no_pairs() {
        let history = history_of(vec![sample(53.5, 10.0, 0)]);
        let summary = analyze(&history, None, None, 0.5);

        assert_eq!(summary.sample_count, 1);
        assert_eq!(summary.total_distance_m, 0.0);
        assert_eq!(summary.final_bearing_deg, None);
    }

    #[test]
    fn test_distance_and_speed_aggregation() {
        // Two legs due north, ~1112m each over 100s: ~11.1 m/s
        let history = history_of(vec![
            sample(0.0, 0.0, 0),
            sample(0.01, 0.0, 100),
            sample(0.02, 0.0, 200),
        ]);
        let summary = analyze(&history, None, None, 0.5);

        assert_eq!(summary.sample_count, 3);
        assert!(
            (summary.total_distance_m - 2224.0).abs() < 10.0,
            "Expected ~2224m, got {}",
            summary.total_distance_m
        );
        assert!((summary.moving_secs - 200.0).abs() < 1e-9);
        assert_eq!(summary.stopped_secs, 0.0);
        assert!((summary.average_speed_mps - 11.12).abs() < 0.1);
        assert!((summary.max_speed_mps - 11.12).abs() < 0.1);
    }

    #[test]
    fn test_stopped_time_accumulates() {
        // Parked for 100s (1m drift), then a fast leg
        let history = history_of(vec![
            sample(0.0, 0.0, 0),
            sample(0.000009, 0.0, 100),
            sample(0.01, 0.0, 200),
        ]);
        let summary = analyze(&history, None, None, 0.5);

        assert!((summary.stopped_secs - 100.0).abs() < 1e-9);
        assert!((summary.moving_secs - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_final_bearing_points_north() {
        let history = history_of(vec![sample(0.0, 0.0, 0), sample(0.01, 0.0, 100)]);
        let summary = analyze(&history, None, None, 0.5);

        let bearing = summary.final_bearing_deg.expect("bearing expected");
        assert!(
            bearing < 0.5 || bearing > 359.5,
            "Expected ~0 degrees, got {}",
            bearing
        );
    }

    #[test]
    fn test_window_restricts_pairs() {
        let history = history_of(vec![
            sample(0.0, 0.0, 0),
            sample(0.01, 0.0, 100),
            sample(0.02, 0.0, 200),
            sample(0.03, 0.0, 300),
        ]);

        // Window covering only the middle two samples: one pair
        let summary = analyze(
            &history,
            Some(base_time() + Duration::seconds(100)),
            Some(base_time() + Duration::seconds(200)),
            0.5,
        );

        assert_eq!(summary.sample_count, 2);
        assert!(
            (summary.total_distance_m - 1112.0).abs() < 10.0,
            "Expected one leg, got {}m",
            summary.total_distance_m
        );
    }

    #[test]
    fn test_out_of_sequence_pairs_are_skipped() {
        // Second sample arrived late with an earlier timestamp
        let history = history_of(vec![
            sample(0.0, 0.0, 100),
            sample(0.01, 0.0, 50),
            sample(0.02, 0.0, 200),
        ]);
        let summary = analyze(&history, None, None, 0.5);

        // Only the 50->200 pair contributes
        assert!(
            (summary.total_distance_m - 1112.0).abs() < 10.0,
            "Expected one contributing leg, got {}m",
            summary.total_distance_m
        );
    }
}
