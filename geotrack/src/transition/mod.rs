//! Boundary-crossing detection.
//!
//! The core state machine: for every (equipment, geofence) pair there
//! are two states, `Outside` and `Inside`, recorded as a boolean in the
//! equipment's containment map (absent entry = outside). Each accepted
//! position re-evaluates every *active* fence and diffs against the
//! stored state:
//!
//! - outside → inside emits [`BoundaryCrossing::Entered`]
//! - inside → outside emits [`BoundaryCrossing::Exited`]
//! - no change emits nothing
//!
//! The new state is stored unconditionally after evaluation, so staying
//! inside a fence across many positions emits exactly one `Entered`.
//!
//! Inactive fences are skipped entirely: their stored state is frozen
//! until reactivation, at which point the next position re-evaluates
//! them fresh.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geofence::{Geofence, GeofenceId};
use crate::position::PositionSample;

/// Direction of a containment change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryCrossing {
    /// The position moved from outside to inside the fence.
    Entered,
    /// The position moved from inside to outside the fence.
    Exited,
}

impl std::fmt::Display for BoundaryCrossing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entered => write!(f, "entered"),
            Self::Exited => write!(f, "exited"),
        }
    }
}

/// One detected boundary crossing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    /// Equipment that crossed the boundary.
    pub equipment_id: String,

    /// Fence whose boundary was crossed.
    pub geofence_id: GeofenceId,

    /// Fence name at evaluation time.
    pub geofence_name: String,

    /// Direction of the crossing.
    pub crossing: BoundaryCrossing,

    /// The position that triggered the crossing.
    pub position: PositionSample,

    /// The triggering position's timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Diff the sample's containment against the stored state for every
/// active fence, emitting crossing events and persisting the new state.
///
/// `containment` is mutated in place; events are returned in fence-id
/// order (the order of `active_fences`).
pub fn detect(
    containment: &mut HashMap<GeofenceId, bool>,
    active_fences: &[Geofence],
    equipment_id: &str,
    sample: &PositionSample,
) -> Vec<TransitionEvent> {
    let mut events = Vec::new();

    for fence in active_fences {
        let inside = fence.contains(sample.latitude, sample.longitude);
        let was_inside = containment.get(&fence.id).copied().unwrap_or(false);

        match (was_inside, inside) {
            (false, true) => events.push(make_event(
                equipment_id,
                fence,
                BoundaryCrossing::Entered,
                sample,
            )),
            (true, false) => events.push(make_event(
                equipment_id,
                fence,
                BoundaryCrossing::Exited,
                sample,
            )),
            _ => {}
        }

        // Stored unconditionally so reactivated fences re-evaluate
        // from the latest observation, not from pre-deactivation state.
        containment.insert(fence.id, inside);
    }

    for event in &events {
        debug!(
            equipment = %event.equipment_id,
            geofence = %event.geofence_id,
            crossing = %event.crossing,
            "Boundary crossing detected"
        );
    }

    events
}

fn make_event(
    equipment_id: &str,
    fence: &Geofence,
    crossing: BoundaryCrossing,
    sample: &PositionSample,
) -> TransitionEvent {
    TransitionEvent {
        equipment_id: equipment_id.to_string(),
        geofence_id: fence.id,
        geofence_name: fence.name.clone(),
        crossing,
        position: sample.clone(),
        timestamp: sample.timestamp,
    }
}
