//! Geofence registry and containment queries.
//!
//! # Thread Safety
//!
//! Definitions are read-mostly shared state: containment runs on every
//! ingested position while add/remove/update are rare operator actions.
//! The registry sits behind a `parking_lot::RwLock` so concurrent
//! ingestion never serializes on lookups.
//!
//! # Scale
//!
//! Containment is a linear scan over active fences, which is fine for
//! the tens of fences a deployment carries. A spatial index (R-tree or
//! grid) can replace the scan behind the same contract if that ever
//! changes.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use super::model::{
    Geofence, GeofenceDefinition, GeofenceId, GeofencePatch, InvalidGeofenceError,
};

/// In-memory geofence registry.
#[derive(Debug, Default)]
pub struct GeofenceIndex {
    fences: RwLock<HashMap<GeofenceId, Geofence>>,
    next_id: AtomicU64,
}

impl GeofenceIndex {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a geofence after validating its shape.
    ///
    /// # Errors
    ///
    /// [`InvalidGeofenceError`] when the region's coordinates, radius,
    /// corners, or vertex count are invalid.
    pub fn add(&self, definition: GeofenceDefinition) -> Result<Geofence, InvalidGeofenceError> {
        definition.region.validate()?;

        let id = GeofenceId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let fence = Geofence {
            id,
            name: definition.name,
            active: definition.active,
            region: definition.region,
        };

        debug!(%id, name = %fence.name, "Registered geofence");
        self.fences.write().insert(id, fence.clone());
        Ok(fence)
    }

    /// Remove a geofence, returning it if present.
    pub fn remove(&self, id: GeofenceId) -> Option<Geofence> {
        let removed = self.fences.write().remove(&id);
        if removed.is_some() {
            debug!(%id, "Removed geofence");
        }
        removed
    }

    /// Patch name and/or active flag, returning the updated fence.
    ///
    /// Returns `None` when the id is unknown.
    pub fn update(&self, id: GeofenceId, patch: GeofencePatch) -> Option<Geofence> {
        let mut fences = self.fences.write();
        let fence = fences.get_mut(&id)?;
        if let Some(name) = patch.name {
            fence.name = name;
        }
        if let Some(active) = patch.active {
            fence.active = active;
        }
        Some(fence.clone())
    }

    /// Look up one geofence.
    pub fn get(&self, id: GeofenceId) -> Option<Geofence> {
        self.fences.read().get(&id).cloned()
    }

    /// All registered geofences, ordered by id.
    pub fn list(&self) -> Vec<Geofence> {
        let mut all: Vec<Geofence> = self.fences.read().values().cloned().collect();
        all.sort_by_key(|f| f.id);
        all
    }

    /// Snapshot of the active fences, ordered by id.
    ///
    /// Callers evaluate against the snapshot without holding the
    /// registry lock.
    pub fn active_snapshot(&self) -> Vec<Geofence> {
        let mut active: Vec<Geofence> = self
            .fences
            .read()
            .values()
            .filter(|f| f.active)
            .cloned()
            .collect();
        active.sort_by_key(|f| f.id);
        active
    }

    /// Ids of all active fences containing the coordinate.
    pub fn containing(&self, latitude: f64, longitude: f64) -> HashSet<GeofenceId> {
        self.fences
            .read()
            .values()
            .filter(|f| f.active && f.contains(latitude, longitude))
            .map(|f| f.id)
            .collect()
    }

    /// Number of registered fences (active or not).
    pub fn len(&self) -> usize {
        self.fences.read().len()
    }

    /// True when no fences are registered.
    pub fn is_empty(&self) -> bool {
        self.fences.read().is_empty()
    }
}
