//! Position ingestion and movement analysis.
//!
//! The path every raw report takes before geofencing and rules see it:
//!
//! 1. Range/finiteness validation ([`PositionSample::validate`])
//! 2. Duplicate suppression and sequence classification
//!    ([`PositionIngestor`])
//! 3. Bounded history bookkeeping ([`PositionHistory`])
//! 4. Instantaneous speed and moving/stationary classification
//! 5. Windowed aggregates on demand ([`movement::analyze`])
//!
//! # Components
//!
//! - [`sample`] - `PositionSample`, `SourceKind`, validation errors
//! - [`history`] - bounded FIFO sample history
//! - [`ingestor`] - classification, `EquipmentTrackState`, outcomes
//! - [`movement`] - windowed movement statistics

mod history;
mod ingestor;
pub mod movement;
mod sample;

pub use history::{PositionHistory, DEFAULT_HISTORY_CAPACITY};
pub use ingestor::{
    ConnectionQuality, EquipmentTrackState, IngestOutcome, IngestorConfig, MovementUpdate,
    PositionIngestor,
};
pub use movement::MovementSummary;
pub use sample::{InvalidPositionError, PositionSample, SourceKind};
