//! GeoTrack - position tracking core for mobile equipment fleets.
//!
//! This library ingests GPS position reports and derives operational
//! signals: duplicate and out-of-sequence classification, movement and
//! speed analysis, geofence containment with enter/exit transition
//! detection, and rule-based alerting. HTTP routing, auth, and
//! persistence live outside the crate; they call into the
//! [`service::TrackingService`] facade and consume its typed event
//! streams.
//!
//! # High-Level API
//!
//! ```ignore
//! use std::sync::Arc;
//! use geotrack::service::{InactivitySweeper, TrackingConfig, TrackingService};
//!
//! let service = Arc::new(TrackingService::new(TrackingConfig::default()));
//!
//! // Wire the notification layer to the event streams
//! let mut alerts = service.subscribe_alerts();
//!
//! // Feed positions as they arrive
//! let outcome = service.ingest_position("excavator-7", sample)?;
//!
//! // Background inactivity checks
//! let sweeper = InactivitySweeper::new(Arc::clone(&service));
//! let handle = sweeper.start();
//! ```
//!
//! # Data Flow
//!
//! raw report → validation/dedup/history ([`position`]) → containment
//! and crossings ([`geofence`], [`transition`]) → rule evaluation
//! ([`rules`]) → alert log and event fan-out ([`alert`], [`service`]).

pub mod alert;
pub mod clock;
pub mod geo;
pub mod geofence;
pub mod logging;
pub mod position;
pub mod rules;
pub mod service;
pub mod transition;

/// Version of the geotrack library.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
