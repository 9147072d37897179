//! Bounded per-equipment position history.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use super::sample::PositionSample;

/// Default number of samples retained per equipment.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Bounded FIFO history of position samples.
///
/// Samples are stored in arrival order, which is not necessarily
/// timestamp order: out-of-sequence reports are appended where they
/// arrive. Once the capacity is reached the oldest entry is evicted for
/// each new one.
#[derive(Debug, Clone)]
pub struct PositionHistory {
    samples: VecDeque<PositionSample>,
    capacity: usize,
}

impl PositionHistory {
    /// Create an empty history holding at most `capacity` samples.
    ///
    /// A zero capacity is bumped to 1 so the latest sample is always
    /// retrievable.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest beyond capacity.
    pub fn push(&mut self, sample: PositionSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Most recently *arrived* sample.
    pub fn latest(&self) -> Option<&PositionSample> {
        self.samples.back()
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no samples have been recorded.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of retained samples.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate samples oldest-arrival first.
    pub fn iter(&self) -> impl Iterator<Item = &PositionSample> {
        self.samples.iter()
    }

    /// Iterate samples whose timestamps fall inside the given closed
    /// range, oldest-arrival first.
    ///
    /// `None` bounds are open: `range(None, None)` yields everything.
    pub fn range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> impl Iterator<Item = &PositionSample> {
        self.samples.iter().filter(move |s| {
            start.is_none_or(|t| s.timestamp >= t) && end.is_none_or(|t| s.timestamp <= t)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::sample::SourceKind;
    use chrono::{Duration, TimeZone};

    fn sample_at(offset_secs: i64) -> PositionSample {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        PositionSample::new(
            53.5,
            10.0,
            0.0,
            5.0,
            base + Duration::seconds(offset_secs),
            SourceKind::Gps,
        )
    }

    #[test]
    fn test_empty_history() {
        let history = PositionHistory::new(10);
        assert!(history.is_empty());
        assert_eq!(history.len(), 0);
        assert!(history.latest().is_none());
    }

    #[test]
    fn test_push_and_latest() {
        let mut history = PositionHistory::new(10);
        history.push(sample_at(0));
        history.push(sample_at(10));

        assert_eq!(history.len(), 2);
        assert_eq!(
            history.latest().unwrap().timestamp,
            sample_at(10).timestamp
        );
    }

    #[test]
    fn test_eviction_is_fifo() {
        let mut history = PositionHistory::new(3);
        for offset in [0, 10, 20, 30] {
            history.push(sample_at(offset));
        }

        // Capacity 3: the offset-0 sample was evicted first
        assert_eq!(history.len(), 3);
        let timestamps: Vec<_> = history.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps[0], sample_at(10).timestamp);
        assert_eq!(timestamps[2], sample_at(30).timestamp);
    }

    #[test]
    fn test_capacity_plus_one_keeps_capacity_entries() {
        let capacity = 5;
        let mut history = PositionHistory::new(capacity);
        for i in 0..=capacity as i64 {
            history.push(sample_at(i * 10));
        }
        assert_eq!(history.len(), capacity);
    }

    #[test]
    fn test_zero_capacity_is_bumped() {
        let mut history = PositionHistory::new(0);
        history.push(sample_at(0));
        assert_eq!(history.len(), 1);
        assert_eq!(history.capacity(), 1);
    }

    #[test]
    fn test_range_filters_by_timestamp() {
        let mut history = PositionHistory::new(10);
        for offset in [0, 10, 20, 30, 40] {
            history.push(sample_at(offset));
        }

        let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let window: Vec<_> = history
            .range(
                Some(base + Duration::seconds(10)),
                Some(base + Duration::seconds(30)),
            )
            .collect();
        assert_eq!(window.len(), 3);

        let open: Vec<_> = history.range(None, None).collect();
        assert_eq!(open.len(), 5);
    }

    #[test]
    fn test_out_of_sequence_append_preserves_arrival_order() {
        let mut history = PositionHistory::new(10);
        history.push(sample_at(100));
        history.push(sample_at(50)); // Arrived later, measured earlier

        assert_eq!(
            history.latest().unwrap().timestamp,
            sample_at(50).timestamp
        );
    }
}
