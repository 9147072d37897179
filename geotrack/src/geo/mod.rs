//! Geodesy and containment predicates.
//!
//! Pure navigation mathematics shared by the ingestion and geofencing
//! layers. Functions use the spherical earth approximation with the mean
//! Earth radius, which is accurate to well under 0.5% over the distances
//! tracked equipment covers.
//!
//! # Coordinate System
//!
//! - Latitude: degrees north (-90 to 90)
//! - Longitude: degrees east (-180 to 180)
//! - Bearing: degrees true (0-360, 0=north, 90=east)
//! - Distance: meters
//!
//! Inputs are not validated here; invalid coordinates propagate as NaN.
//! Callers validate ranges at the ingestion boundary.

use std::f64::consts::PI;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Degrees to radians conversion factor.
const DEG_TO_RAD: f64 = PI / 180.0;

/// Radians to degrees conversion factor.
const RAD_TO_DEG: f64 = 180.0 / PI;

/// Calculate the great-circle distance between two positions.
///
/// Uses the haversine formula, which is numerically stable for the
/// short distances that matter for duplicate detection.
///
/// # Example
///
/// ```
/// use geotrack::geo::distance_meters;
///
/// // 1 degree of latitude is ~111 km
/// let d = distance_meters(0.0, 0.0, 1.0, 0.0);
/// assert!((d - 111_195.0).abs() < 100.0);
/// ```
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1 * DEG_TO_RAD;
    let lat2_rad = lat2 * DEG_TO_RAD;
    let delta_lat = (lat2 - lat1) * DEG_TO_RAD;
    let delta_lon = (lon2 - lon1) * DEG_TO_RAD;

    // Haversine formula
    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Calculate the initial bearing from one position to another.
///
/// Returns the forward azimuth in degrees, normalized to [0, 360).
///
/// # Example
///
/// ```
/// use geotrack::geo::bearing_degrees;
///
/// let bearing = bearing_degrees(0.0, 0.0, 0.0, 1.0);
/// assert!((bearing - 90.0).abs() < 0.1);
/// ```
pub fn bearing_degrees(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1 * DEG_TO_RAD;
    let lat2_rad = lat2 * DEG_TO_RAD;
    let delta_lon = (lon2 - lon1) * DEG_TO_RAD;

    let y = delta_lon.sin() * lat2_rad.cos();
    let x = lat1_rad.cos() * lat2_rad.sin() - lat1_rad.sin() * lat2_rad.cos() * delta_lon.cos();

    let mut bearing_deg = y.atan2(x) * RAD_TO_DEG;

    // Normalize to [0, 360)
    if bearing_deg < 0.0 {
        bearing_deg += 360.0;
    }

    bearing_deg
}

/// Check whether a point lies within a circular region.
///
/// The boundary counts as inside: a point exactly `radius_m` from the
/// center is contained.
pub fn point_in_circle(
    lat: f64,
    lon: f64,
    center_lat: f64,
    center_lon: f64,
    radius_m: f64,
) -> bool {
    distance_meters(lat, lon, center_lat, center_lon) <= radius_m
}

/// Check whether a point lies within an axis-aligned rectangle.
///
/// Corners are given as the northeast and southwest extremes; the
/// boundary is inclusive. Rectangles spanning the antimeridian are not
/// handled (known limitation).
pub fn point_in_rectangle(
    lat: f64,
    lon: f64,
    ne_lat: f64,
    ne_lon: f64,
    sw_lat: f64,
    sw_lon: f64,
) -> bool {
    lat >= sw_lat && lat <= ne_lat && lon >= sw_lon && lon <= ne_lon
}

/// Check whether a point lies within a polygon via ray casting.
///
/// Vertices are (latitude, longitude) pairs treated as planar 2D
/// coordinates; the polygon is implicitly closed (the last vertex
/// connects back to the first). Self-intersecting polygons yield
/// even-odd parity results rather than geometric containment (known
/// limitation). Fewer than 3 vertices never contain anything.
pub fn point_in_polygon(lat: f64, lon: f64, vertices: &[(f64, f64)]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }

    // Count edge crossings of a ray extending in +longitude
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (lat_i, lon_i) = vertices[i];
        let (lat_j, lon_j) = vertices[j];

        if ((lat_i > lat) != (lat_j > lat))
            && (lon < (lon_j - lon_i) * (lat - lat_i) / (lat_j - lat_i) + lon_i)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}
