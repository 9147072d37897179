//! Geofence definitions.
//!
//! A geofence is a named spatial region used for containment testing.
//! Regions are a proper sum type resolved by pattern matching; the shape
//! of a fence cannot change after creation, only its name and active
//! flag (field-level patch).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo;

/// Identifier assigned to a geofence by the registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GeofenceId(pub u64);

impl std::fmt::Display for GeofenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "geofence-{}", self.0)
    }
}

/// A geographic coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    fn validate(&self) -> Result<(), InvalidGeofenceError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(InvalidGeofenceError::LatitudeOutOfRange(self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(InvalidGeofenceError::LongitudeOutOfRange(self.longitude));
        }
        Ok(())
    }
}

/// Validation failure for a geofence region.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidGeofenceError {
    /// A coordinate's latitude is outside [-90, 90] or not finite.
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    /// A coordinate's longitude is outside [-180, 180] or not finite.
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    /// Circle radius is negative or not finite.
    #[error("radius {0}m is negative or not finite")]
    InvalidRadius(f64),

    /// Rectangle corners are not northeast/southwest of each other.
    #[error("northeast corner must be north and east of the southwest corner")]
    CornersSwapped,

    /// Polygon needs at least 3 vertices.
    #[error("polygon has {0} vertices, need at least 3")]
    TooFewVertices(usize),
}

/// The spatial shape of a geofence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum GeofenceRegion {
    /// All points within `radius_m` of `center` (boundary inclusive).
    Circle {
        /// Center of the region.
        center: GeoPoint,
        /// Radius in meters.
        radius_m: f64,
    },

    /// Axis-aligned rectangle, boundary inclusive. Does not span the
    /// antimeridian.
    Rectangle {
        /// Northeast corner.
        north_east: GeoPoint,
        /// Southwest corner.
        south_west: GeoPoint,
    },

    /// Implicitly closed polygon (last vertex connects to the first),
    /// evaluated by ray casting over planar (lat, lon).
    Polygon {
        /// Ordered vertices, at least 3.
        vertices: Vec<GeoPoint>,
    },
}

impl GeofenceRegion {
    /// Check shape constraints.
    pub fn validate(&self) -> Result<(), InvalidGeofenceError> {
        match self {
            Self::Circle { center, radius_m } => {
                center.validate()?;
                if !radius_m.is_finite() || *radius_m < 0.0 {
                    return Err(InvalidGeofenceError::InvalidRadius(*radius_m));
                }
                Ok(())
            }
            Self::Rectangle {
                north_east,
                south_west,
            } => {
                north_east.validate()?;
                south_west.validate()?;
                if north_east.latitude < south_west.latitude
                    || north_east.longitude < south_west.longitude
                {
                    return Err(InvalidGeofenceError::CornersSwapped);
                }
                Ok(())
            }
            Self::Polygon { vertices } => {
                if vertices.len() < 3 {
                    return Err(InvalidGeofenceError::TooFewVertices(vertices.len()));
                }
                for vertex in vertices {
                    vertex.validate()?;
                }
                Ok(())
            }
        }
    }

    /// Whether the region contains the given coordinate.
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        match self {
            Self::Circle { center, radius_m } => geo::point_in_circle(
                latitude,
                longitude,
                center.latitude,
                center.longitude,
                *radius_m,
            ),
            Self::Rectangle {
                north_east,
                south_west,
            } => geo::point_in_rectangle(
                latitude,
                longitude,
                north_east.latitude,
                north_east.longitude,
                south_west.latitude,
                south_west.longitude,
            ),
            Self::Polygon { vertices } => {
                let ring: Vec<(f64, f64)> =
                    vertices.iter().map(|v| (v.latitude, v.longitude)).collect();
                geo::point_in_polygon(latitude, longitude, &ring)
            }
        }
    }
}

/// A registered geofence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    /// Registry-assigned identifier.
    pub id: GeofenceId,

    /// Human-readable name.
    pub name: String,

    /// Inactive fences are excluded from containment queries and
    /// transition evaluation.
    pub active: bool,

    /// The spatial shape; immutable after creation.
    pub region: GeofenceRegion,
}

impl Geofence {
    /// Whether this fence contains the given coordinate.
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        self.region.contains(latitude, longitude)
    }
}

/// Input for registering a new geofence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceDefinition {
    /// Human-readable name.
    pub name: String,

    /// The spatial shape.
    pub region: GeofenceRegion,

    /// Start active unless stated otherwise.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl GeofenceDefinition {
    /// Define an active geofence.
    pub fn new(name: impl Into<String>, region: GeofenceRegion) -> Self {
        Self {
            name: name.into(),
            region,
            active: true,
        }
    }
}

/// Field-level update for an existing geofence.
///
/// The region cannot be patched; replace the fence instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeofencePatch {
    /// New name, if changing.
    pub name: Option<String>,

    /// New active flag, if changing.
    pub active: Option<bool>,
}
