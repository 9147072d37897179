//! Service error types.

use thiserror::Error;

use crate::alert::AlertId;
use crate::geofence::{GeofenceId, InvalidGeofenceError};
use crate::position::InvalidPositionError;
use crate::rules::{RuleConfigError, RuleId};

/// Errors surfaced by [`TrackingService`](super::TrackingService)
/// operations.
///
/// Validation failures (`InvalidPosition`, `InvalidGeofence`,
/// `RuleConfig`) are local to the offending input: batch ingestion
/// continues past them and other rules keep evaluating. Lookup failures
/// propagate as typed errors rather than silent no-ops, with one
/// exception defined by contract: stopping tracking for an unknown
/// equipment id is a no-op.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackingError {
    /// Position coordinates or accuracy out of range; nothing stored.
    #[error("invalid position: {0}")]
    InvalidPosition(#[from] InvalidPositionError),

    /// No tracking state exists for the equipment id.
    #[error("equipment \"{0}\" is not tracked")]
    EquipmentNotFound(String),

    /// No geofence with that id.
    #[error("{0} not found")]
    GeofenceNotFound(GeofenceId),

    /// Geofence shape failed validation; nothing registered.
    #[error("invalid geofence: {0}")]
    InvalidGeofence(#[from] InvalidGeofenceError),

    /// No rule with that id.
    #[error("{0} not found")]
    RuleNotFound(RuleId),

    /// Rule conditions failed validation; nothing registered.
    #[error("invalid rule: {0}")]
    RuleConfig(#[from] RuleConfigError),

    /// No alert with that id.
    #[error("{0} not found")]
    AlertNotFound(AlertId),

    /// The alert was acknowledged before; the first acknowledger wins.
    #[error("{0} is already acknowledged")]
    AlertAlreadyAcknowledged(AlertId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_ids() {
        let err = TrackingError::EquipmentNotFound("exc-1".into());
        assert!(err.to_string().contains("exc-1"));

        let err = TrackingError::GeofenceNotFound(GeofenceId(3));
        assert!(err.to_string().contains("geofence-3"));

        let err = TrackingError::AlertAlreadyAcknowledged(AlertId(9));
        assert!(err.to_string().contains("alert-9"));
    }

    #[test]
    fn test_from_validation_errors() {
        let err: TrackingError = InvalidPositionError::LatitudeOutOfRange(91.0).into();
        assert!(matches!(err, TrackingError::InvalidPosition(_)));

        let err: TrackingError = RuleConfigError::NoConditions.into();
        assert!(matches!(err, TrackingError::RuleConfig(_)));
    }
}
