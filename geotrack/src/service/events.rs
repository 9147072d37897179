//! Typed event channels.
//!
//! One broadcast channel per event kind keeps producers and consumers
//! decoupled: the notification/WebSocket layer subscribes to what it
//! needs, and a slow subscriber lags on its own receiver instead of
//! backpressuring ingestion. Send errors (no subscribers) are ignored.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::alert::Alert;
use crate::position::PositionSample;
use crate::transition::TransitionEvent;

/// Channel capacities per event kind.
#[derive(Debug, Clone)]
pub struct EventChannelConfig {
    /// Position-accepted events (highest volume).
    pub position_capacity: usize,

    /// Movement state changes.
    pub movement_capacity: usize,

    /// Boundary crossings.
    pub transition_capacity: usize,

    /// Created alerts.
    pub alert_capacity: usize,
}

impl Default for EventChannelConfig {
    fn default() -> Self {
        Self {
            position_capacity: 256,
            movement_capacity: 64,
            transition_capacity: 64,
            alert_capacity: 64,
        }
    }
}

/// A position made it through validation and duplicate suppression.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionEvent {
    /// Equipment that reported.
    pub equipment_id: String,

    /// The recorded sample.
    pub sample: PositionSample,

    /// Instantaneous speed, when derivable.
    pub speed_mps: Option<f64>,

    /// Movement classification after this sample.
    pub moving: bool,

    /// Whether the sample arrived out of timestamp order.
    pub out_of_sequence: bool,
}

/// The moving/stationary classification flipped.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementEvent {
    /// Equipment whose classification changed.
    pub equipment_id: String,

    /// New classification.
    pub moving: bool,

    /// Speed that tripped the change, in m/s.
    pub speed_mps: f64,

    /// Timestamp of the triggering sample.
    pub timestamp: DateTime<Utc>,
}

/// Broadcast senders for every event kind the core emits.
#[derive(Debug)]
pub struct TrackingEvents {
    position_tx: broadcast::Sender<PositionEvent>,
    movement_tx: broadcast::Sender<MovementEvent>,
    transition_tx: broadcast::Sender<TransitionEvent>,
    alert_tx: broadcast::Sender<Alert>,
}

impl TrackingEvents {
    /// Create channels with the given capacities.
    pub fn new(config: &EventChannelConfig) -> Self {
        let (position_tx, _) = broadcast::channel(config.position_capacity);
        let (movement_tx, _) = broadcast::channel(config.movement_capacity);
        let (transition_tx, _) = broadcast::channel(config.transition_capacity);
        let (alert_tx, _) = broadcast::channel(config.alert_capacity);
        Self {
            position_tx,
            movement_tx,
            transition_tx,
            alert_tx,
        }
    }

    /// Subscribe to accepted positions.
    pub fn subscribe_positions(&self) -> broadcast::Receiver<PositionEvent> {
        self.position_tx.subscribe()
    }

    /// Subscribe to movement state changes.
    pub fn subscribe_movement(&self) -> broadcast::Receiver<MovementEvent> {
        self.movement_tx.subscribe()
    }

    /// Subscribe to boundary crossings.
    pub fn subscribe_transitions(&self) -> broadcast::Receiver<TransitionEvent> {
        self.transition_tx.subscribe()
    }

    /// Subscribe to created alerts.
    pub fn subscribe_alerts(&self) -> broadcast::Receiver<Alert> {
        self.alert_tx.subscribe()
    }

    /// Publish an accepted position (no subscribers is fine).
    pub fn publish_position(&self, event: PositionEvent) {
        let _ = self.position_tx.send(event);
    }

    /// Publish a movement state change.
    pub fn publish_movement(&self, event: MovementEvent) {
        let _ = self.movement_tx.send(event);
    }

    /// Publish a boundary crossing.
    pub fn publish_transition(&self, event: TransitionEvent) {
        let _ = self.transition_tx.send(event);
    }

    /// Publish a created alert.
    pub fn publish_alert(&self, alert: Alert) {
        let _ = self.alert_tx.send(alert);
    }
}
