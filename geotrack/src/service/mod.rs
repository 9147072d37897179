//! Tracking service facade and its ambient pieces.
//!
//! [`TrackingService`] is the single entry point the out-of-scope
//! HTTP/controller layer calls into: position ingestion, geofence and
//! rule management, alert queries, movement analysis, and typed event
//! subscriptions. The [`InactivitySweeper`] wraps the one periodic
//! check in a cancellable timer task.
//!
//! # Components
//!
//! - [`config`] - `TrackingConfig` defaults
//! - [`error`] - the `TrackingError` taxonomy
//! - [`events`] - typed broadcast channels per event kind
//! - [`tracker`] - the `TrackingService` facade
//! - [`sweeper`] - timer-driven inactivity sweeps

pub mod config;
mod error;
mod events;
mod sweeper;
mod tracker;

pub use config::TrackingConfig;
pub use error::TrackingError;
pub use events::{EventChannelConfig, MovementEvent, PositionEvent, TrackingEvents};
pub use sweeper::InactivitySweeper;
pub use tracker::{EquipmentStatus, TrackingService};
