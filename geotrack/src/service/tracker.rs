//! Tracking service facade.
//!
//! Owns every collection in the core (per-equipment tracking state,
//! the geofence registry, monitoring rules, and the alert log) so
//! independent instances can run side by side; nothing is global.
//!
//! # Pipeline
//!
//! `ingest_position` runs the full cycle while holding only that
//! equipment's lock:
//!
//! 1. validate → classify (duplicate / out-of-sequence / accepted)
//! 2. history + movement bookkeeping
//! 3. containment diff against active fences → boundary crossings
//! 4. rule evaluation → alerts
//! 5. event fan-out, in acceptance order
//!
//! # Thread Safety
//!
//! - Equipment state: `DashMap<String, Arc<Mutex<_>>>`, sharded by id.
//!   Different equipment ids process concurrently; one id is serialized
//!   by its mutex.
//! - Geofences/rules: read-mostly registries behind RW-locks; ingestion
//!   takes snapshots and evaluates without holding them.
//! - `stop_tracking` may race an in-flight ingestion for the same id:
//!   the in-flight caller holds an `Arc` to the removed state, so at
//!   most one more ingestion completes after the stop.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::alert::{Alert, AlertDraft, AlertFilter, AlertId, AlertKind, AlertLog, Severity};
use crate::clock::{Clock, SystemClock};
use crate::geofence::{
    Geofence, GeofenceDefinition, GeofenceId, GeofenceIndex, GeofencePatch,
};
use crate::position::{
    movement, ConnectionQuality, EquipmentTrackState, IngestOutcome, MovementSummary,
    PositionIngestor, PositionSample,
};
use crate::rules::{self, EvaluationContext, MonitoringRule, RuleDefinition, RuleId};
use crate::transition::{self, TransitionEvent};

use super::config::TrackingConfig;
use super::error::TrackingError;
use super::events::{MovementEvent, PositionEvent, TrackingEvents};

/// Point-in-time view of one equipment's tracking state.
#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentStatus {
    /// Equipment id.
    pub equipment_id: String,

    /// Wall-clock receipt time of the last accepted position.
    pub last_seen: DateTime<Utc>,

    /// Retained history length.
    pub sample_count: usize,

    /// Current moving/stationary classification.
    pub moving: bool,

    /// Connection quality from missed inactivity sweeps.
    pub connection: ConnectionQuality,

    /// Most recently recorded sample.
    pub latest: Option<PositionSample>,
}

/// The tracking core: position ingestion, geofencing, rules, alerts.
pub struct TrackingService {
    config: TrackingConfig,
    ingestor: PositionIngestor,
    equipment: DashMap<String, Arc<Mutex<EquipmentTrackState>>>,
    geofences: GeofenceIndex,
    rules: RwLock<HashMap<RuleId, MonitoringRule>>,
    next_rule_id: AtomicU64,
    alerts: AlertLog,
    events: TrackingEvents,
    clock: Arc<dyn Clock>,
}

impl TrackingService {
    /// Create a service on the system clock.
    pub fn new(config: TrackingConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a service with an injected clock (deterministic tests).
    pub fn with_clock(config: TrackingConfig, clock: Arc<dyn Clock>) -> Self {
        let events = TrackingEvents::new(&config.channels);
        let ingestor = PositionIngestor::new(config.ingest.clone());
        Self {
            config,
            ingestor,
            equipment: DashMap::new(),
            geofences: GeofenceIndex::new(),
            rules: RwLock::new(HashMap::new()),
            next_rule_id: AtomicU64::new(0),
            alerts: AlertLog::new(),
            events,
            clock,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    // ==================== position ingestion ====================

    /// Ingest one position report for an equipment id.
    ///
    /// Tracking state is created lazily on the first report. Duplicates
    /// succeed without recording anything; out-of-sequence reports are
    /// recorded and flagged.
    ///
    /// # Errors
    ///
    /// [`TrackingError::InvalidPosition`] when coordinates or accuracy
    /// are out of range.
    pub fn ingest_position(
        &self,
        equipment_id: &str,
        sample: PositionSample,
    ) -> Result<IngestOutcome, TrackingError> {
        // Reject bad input before any state exists for the id
        sample.validate().map_err(TrackingError::InvalidPosition)?;

        let received_at = self.clock.now();
        let state_ref = self.state_entry(equipment_id, received_at);
        let mut state = state_ref.lock();

        let outcome = self
            .ingestor
            .ingest(&mut state, sample.clone(), received_at)?;

        if !outcome.is_recorded() {
            return Ok(outcome);
        }

        // Duplicates returned above; what remains was appended
        let (speed_mps, moving, movement_changed, out_of_sequence) = match outcome {
            IngestOutcome::Accepted(update) => {
                (update.speed_mps, update.moving, update.changed, false)
            }
            _ => (None, state.moving, false, true),
        };

        self.events.publish_position(PositionEvent {
            equipment_id: equipment_id.to_string(),
            sample: sample.clone(),
            speed_mps,
            moving,
            out_of_sequence,
        });

        if movement_changed {
            if let Some(speed) = speed_mps {
                debug!(
                    equipment = equipment_id,
                    moving,
                    speed_mps = speed,
                    "Movement state changed"
                );
                self.events.publish_movement(MovementEvent {
                    equipment_id: equipment_id.to_string(),
                    moving,
                    speed_mps: speed,
                    timestamp: sample.timestamp,
                });
            }
        }

        // Containment diff against a snapshot of the active fences;
        // the registry lock is not held while evaluating.
        let active_fences = self.geofences.active_snapshot();
        let crossings =
            transition::detect(&mut state.containment, &active_fences, equipment_id, &sample);

        let fired: HashSet<GeofenceId> = crossings.iter().map(|c| c.geofence_id).collect();

        for crossing in crossings {
            let draft = AlertDraft::new(
                AlertKind::GeofenceBoundary,
                Severity::Warning,
                format!("{} geofence \"{}\"", crossing.crossing, crossing.geofence_name),
            )
            .with_metadata("geofence_id", crossing.geofence_id.to_string())
            .with_metadata("crossing", crossing.crossing.to_string());

            let alert = self.alerts.append(equipment_id, draft, received_at);
            self.events.publish_transition(crossing);
            self.events.publish_alert(alert);
        }

        // Rule evaluation against a snapshot; one rule's failure never
        // blocks the rest.
        let applicable: Vec<MonitoringRule> = self
            .rules
            .read()
            .values()
            .filter(|r| r.enabled && r.applies_to(equipment_id))
            .cloned()
            .collect();

        let ctx = EvaluationContext {
            equipment_id,
            sample: &sample,
            speed_mps,
            fired_geofences: &fired,
        };
        for draft in rules::evaluate_all(&applicable, &ctx) {
            let alert = self.alerts.append(equipment_id, draft, received_at);
            self.events.publish_alert(alert);
        }

        Ok(outcome)
    }

    /// Ingest a batch of reports, collecting per-item outcomes.
    ///
    /// A failing sample never aborts the batch; its error is recorded
    /// at its index and ingestion continues.
    pub fn ingest_batch(
        &self,
        equipment_id: &str,
        samples: Vec<PositionSample>,
    ) -> Vec<Result<IngestOutcome, TrackingError>> {
        samples
            .into_iter()
            .map(|sample| self.ingest_position(equipment_id, sample))
            .collect()
    }

    /// Stop tracking an equipment id, dropping its state.
    ///
    /// Idempotent: unknown ids are a no-op. An ingestion already in
    /// flight for the same id may still complete against the dropped
    /// state (at-most-one-more semantics).
    pub fn stop_tracking(&self, equipment_id: &str) {
        if self.equipment.remove(equipment_id).is_some() {
            info!(equipment = equipment_id, "Stopped tracking");
        }
    }

    /// Ids of all currently tracked equipment.
    pub fn tracked_equipment(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.equipment.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Point-in-time status for one equipment id.
    ///
    /// # Errors
    ///
    /// [`TrackingError::EquipmentNotFound`] when the id is not tracked.
    pub fn equipment_status(&self, equipment_id: &str) -> Result<EquipmentStatus, TrackingError> {
        let state_ref = self
            .equipment
            .get(equipment_id)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| TrackingError::EquipmentNotFound(equipment_id.to_string()))?;
        let state = state_ref.lock();

        Ok(EquipmentStatus {
            equipment_id: equipment_id.to_string(),
            last_seen: state.last_seen,
            sample_count: state.history.len(),
            moving: state.moving,
            connection: state.connection_quality(),
            latest: state.history.latest().cloned(),
        })
    }

    /// Movement aggregates over an equipment's history, optionally
    /// restricted to a closed timestamp range.
    ///
    /// # Errors
    ///
    /// [`TrackingError::EquipmentNotFound`] when the id is not tracked.
    pub fn movement_analysis(
        &self,
        equipment_id: &str,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<MovementSummary, TrackingError> {
        let state_ref = self
            .equipment
            .get(equipment_id)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| TrackingError::EquipmentNotFound(equipment_id.to_string()))?;
        let state = state_ref.lock();

        let (start, end) = match range {
            Some((start, end)) => (Some(start), Some(end)),
            None => (None, None),
        };
        Ok(movement::analyze(
            &state.history,
            start,
            end,
            self.config.ingest.moving_threshold_mps,
        ))
    }

    // ==================== geofences ====================

    /// Register a geofence.
    ///
    /// # Errors
    ///
    /// [`TrackingError::InvalidGeofence`] when the shape is invalid.
    pub fn add_geofence(&self, definition: GeofenceDefinition) -> Result<Geofence, TrackingError> {
        Ok(self.geofences.add(definition)?)
    }

    /// Patch a geofence's name and/or active flag.
    ///
    /// # Errors
    ///
    /// [`TrackingError::GeofenceNotFound`] for unknown ids.
    pub fn update_geofence(
        &self,
        id: GeofenceId,
        patch: GeofencePatch,
    ) -> Result<Geofence, TrackingError> {
        self.geofences
            .update(id, patch)
            .ok_or(TrackingError::GeofenceNotFound(id))
    }

    /// Remove a geofence and purge its stored containment state.
    ///
    /// No Exited events are emitted for the removal itself.
    ///
    /// # Errors
    ///
    /// [`TrackingError::GeofenceNotFound`] for unknown ids.
    pub fn remove_geofence(&self, id: GeofenceId) -> Result<(), TrackingError> {
        self.geofences
            .remove(id)
            .ok_or(TrackingError::GeofenceNotFound(id))?;

        // Drop per-equipment state for the dead id so containment maps
        // cannot grow without bound.
        for entry in self.equipment.iter() {
            entry.value().lock().containment.remove(&id);
        }
        Ok(())
    }

    /// All registered geofences, ordered by id.
    pub fn list_geofences(&self) -> Vec<Geofence> {
        self.geofences.list()
    }

    /// Look up one geofence.
    ///
    /// # Errors
    ///
    /// [`TrackingError::GeofenceNotFound`] for unknown ids.
    pub fn geofence(&self, id: GeofenceId) -> Result<Geofence, TrackingError> {
        self.geofences.get(id).ok_or(TrackingError::GeofenceNotFound(id))
    }

    /// Active geofence ids containing a coordinate.
    pub fn containing_geofences(&self, latitude: f64, longitude: f64) -> HashSet<GeofenceId> {
        self.geofences.containing(latitude, longitude)
    }

    // ==================== rules ====================

    /// Register a monitoring rule.
    ///
    /// # Errors
    ///
    /// [`TrackingError::RuleConfig`] when the conditions are invalid.
    pub fn add_rule(&self, definition: RuleDefinition) -> Result<MonitoringRule, TrackingError> {
        definition.conditions.validate()?;

        let id = RuleId(self.next_rule_id.fetch_add(1, Ordering::Relaxed) + 1);
        let rule = MonitoringRule {
            id,
            equipment_id: definition.equipment_id,
            conditions: definition.conditions,
            kind: definition.kind,
            severity: definition.severity,
            enabled: definition.enabled,
        };

        debug!(rule = %id, "Registered monitoring rule");
        self.rules.write().insert(id, rule.clone());
        Ok(rule)
    }

    /// Remove a rule.
    ///
    /// # Errors
    ///
    /// [`TrackingError::RuleNotFound`] for unknown ids.
    pub fn remove_rule(&self, id: RuleId) -> Result<(), TrackingError> {
        self.rules
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(TrackingError::RuleNotFound(id))
    }

    /// All registered rules, ordered by id.
    pub fn list_rules(&self) -> Vec<MonitoringRule> {
        let mut all: Vec<MonitoringRule> = self.rules.read().values().cloned().collect();
        all.sort_by_key(|r| r.id);
        all
    }

    // ==================== alerts ====================

    /// Alerts matching the filter, in creation order.
    pub fn alerts(&self, filter: &AlertFilter) -> Vec<Alert> {
        self.alerts.query(filter)
    }

    /// Acknowledge an alert on behalf of an operator.
    ///
    /// # Errors
    ///
    /// [`TrackingError::AlertNotFound`] for unknown ids,
    /// [`TrackingError::AlertAlreadyAcknowledged`] on repeats.
    pub fn acknowledge_alert(&self, id: AlertId, by: &str) -> Result<Alert, TrackingError> {
        use crate::alert::AcknowledgeError;

        self.alerts
            .acknowledge(id, by, self.clock.now())
            .map_err(|err| match err {
                AcknowledgeError::NotFound(id) => TrackingError::AlertNotFound(id),
                AcknowledgeError::AlreadyAcknowledged(id) => {
                    TrackingError::AlertAlreadyAcknowledged(id)
                }
            })
    }

    // ==================== events ====================

    /// Subscribe to accepted positions.
    pub fn subscribe_positions(&self) -> tokio::sync::broadcast::Receiver<PositionEvent> {
        self.events.subscribe_positions()
    }

    /// Subscribe to movement state changes.
    pub fn subscribe_movement(&self) -> tokio::sync::broadcast::Receiver<MovementEvent> {
        self.events.subscribe_movement()
    }

    /// Subscribe to boundary crossings.
    pub fn subscribe_transitions(&self) -> tokio::sync::broadcast::Receiver<TransitionEvent> {
        self.events.subscribe_transitions()
    }

    /// Subscribe to created alerts.
    pub fn subscribe_alerts(&self) -> tokio::sync::broadcast::Receiver<Alert> {
        self.events.subscribe_alerts()
    }

    // ==================== inactivity sweep ====================

    /// Run one inactivity sweep, returning the alerts it produced.
    ///
    /// Snapshots every equipment's last-seen timestamp first (holding
    /// each per-equipment lock only long enough to copy it), then
    /// evaluates against the threshold without holding any lock. Each
    /// overdue equipment produces exactly one connection-lost alert per
    /// sweep and has its consecutive-error counter bumped.
    pub fn sweep_once(&self) -> Vec<Alert> {
        let now = self.clock.now();
        let threshold = self.config.inactivity_threshold;

        let snapshot: Vec<(String, DateTime<Utc>)> = self
            .equipment
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().lock().last_seen))
            .collect();

        let mut produced = Vec::new();
        for (equipment_id, last_seen) in snapshot {
            let silent = (now - last_seen).to_std().unwrap_or_default();
            if silent <= threshold {
                continue;
            }

            // Relock briefly to bump the error counter; the equipment
            // may have been stopped since the snapshot.
            let quality = match self.equipment.get(&equipment_id) {
                Some(entry) => {
                    let mut state = entry.value().lock();
                    state.consecutive_errors += 1;
                    state.connection_quality()
                }
                None => continue,
            };

            let draft = AlertDraft::new(
                AlertKind::ConnectionLost,
                Severity::Warning,
                format!(
                    "no position update for {}s (threshold {}s)",
                    silent.as_secs(),
                    threshold.as_secs()
                ),
            )
            .with_metadata("last_seen", last_seen.to_rfc3339())
            .with_metadata("connection_quality", quality.to_string());

            let alert = self.alerts.append(&equipment_id, draft, now);
            self.events.publish_alert(alert.clone());
            produced.push(alert);
        }

        if !produced.is_empty() {
            info!(count = produced.len(), "Inactivity sweep produced alerts");
        }
        produced
    }

    fn state_entry(
        &self,
        equipment_id: &str,
        created_at: DateTime<Utc>,
    ) -> Arc<Mutex<EquipmentTrackState>> {
        let entry = self
            .equipment
            .entry(equipment_id.to_string())
            .or_insert_with(|| {
                debug!(equipment = equipment_id, "Started tracking");
                Arc::new(Mutex::new(EquipmentTrackState::new(
                    self.config.history_capacity,
                    created_at,
                )))
            });
        Arc::clone(entry.value())
    }
}
