//! Position sample types.
//!
//! A [`PositionSample`] is one coordinate reading for a piece of tracked
//! equipment, together with its accuracy and the source that produced it.
//! Samples are immutable once created; range and finiteness are checked
//! at the ingestion boundary via [`PositionSample::validate`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a position reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Satellite fix from the onboard GPS receiver.
    Gps,
    /// Cell/WiFi network triangulation.
    Network,
    /// Operator-entered position.
    Manual,
    /// Simulated feed (test rigs, replay).
    Simulation,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gps => write!(f, "gps"),
            Self::Network => write!(f, "network"),
            Self::Manual => write!(f, "manual"),
            Self::Simulation => write!(f, "simulation"),
        }
    }
}

/// Validation failure for a single position sample.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidPositionError {
    /// Latitude outside [-90, 90] or not finite.
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    /// Longitude outside [-180, 180] or not finite.
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    /// Accuracy negative or not finite.
    #[error("accuracy {0}m is negative or not finite")]
    InvalidAccuracy(f64),
}

/// One GPS/network-derived coordinate reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,

    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,

    /// Altitude above mean sea level in meters.
    ///
    /// Reported as-is; not used by containment or movement logic.
    pub altitude_m: f64,

    /// Estimated horizontal error radius in meters (lower is better).
    pub accuracy_m: f64,

    /// When the reading was measured by the device.
    pub timestamp: DateTime<Utc>,

    /// Source of this reading.
    pub source: SourceKind,
}

impl PositionSample {
    /// Create a new sample.
    ///
    /// Does not validate; call [`validate`](Self::validate) before
    /// trusting the coordinates.
    pub fn new(
        latitude: f64,
        longitude: f64,
        altitude_m: f64,
        accuracy_m: f64,
        timestamp: DateTime<Utc>,
        source: SourceKind,
    ) -> Self {
        Self {
            latitude,
            longitude,
            altitude_m,
            accuracy_m,
            timestamp,
            source,
        }
    }

    /// Check coordinate ranges and finiteness.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint: latitude range, longitude
    /// range, then accuracy sign.
    pub fn validate(&self) -> Result<(), InvalidPositionError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(InvalidPositionError::LatitudeOutOfRange(self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(InvalidPositionError::LongitudeOutOfRange(self.longitude));
        }
        if !self.accuracy_m.is_finite() || self.accuracy_m < 0.0 {
            return Err(InvalidPositionError::InvalidAccuracy(self.accuracy_m));
        }
        Ok(())
    }

    /// Great-circle distance to another sample in meters.
    pub fn distance_to(&self, other: &Self) -> f64 {
        crate::geo::distance_meters(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}
