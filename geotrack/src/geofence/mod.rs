//! Geofence definitions and containment index.
//!
//! # Components
//!
//! - [`model`] - `Geofence`, the `GeofenceRegion` sum type, patches,
//!   and shape validation
//! - [`index`] - the read-mostly registry answering "which active
//!   fences contain this point?"

mod index;
mod model;

pub use index::GeofenceIndex;
pub use model::{
    GeoPoint, Geofence, GeofenceDefinition, GeofenceId, GeofencePatch, GeofenceRegion,
    InvalidGeofenceError,
};
