//! Alert types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier assigned to an alert by the log.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct AlertId(pub u64);

impl std::fmt::Display for AlertId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "alert-{}", self.0)
    }
}

/// How urgent an alert is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational; no action expected.
    Info,
    /// Needs operator attention.
    Warning,
    /// Needs immediate operator action.
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// What condition produced an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Instantaneous speed exceeded a rule's limit.
    SpeedLimit,
    /// Reported accuracy was worse than a rule allows.
    AccuracyDegraded,
    /// A position arrived outside a rule's operating-hours window.
    OutsideOperatingHours,
    /// Equipment crossed a geofence boundary.
    GeofenceBoundary,
    /// Equipment has not reported within the inactivity threshold.
    ConnectionLost,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SpeedLimit => write!(f, "speed_limit"),
            Self::AccuracyDegraded => write!(f, "accuracy_degraded"),
            Self::OutsideOperatingHours => write!(f, "outside_operating_hours"),
            Self::GeofenceBoundary => write!(f, "geofence_boundary"),
            Self::ConnectionLost => write!(f, "connection_lost"),
        }
    }
}

/// Who acknowledged an alert, and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgement {
    /// Operator identifier.
    pub by: String,
    /// Acknowledgement time.
    pub at: DateTime<Utc>,
}

/// A recorded alert.
///
/// Alerts are append-only: acknowledgement is the only permitted
/// mutation, and nothing is ever deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Log-assigned identifier.
    pub id: AlertId,

    /// Equipment the alert concerns.
    pub equipment_id: String,

    /// Condition that fired.
    pub kind: AlertKind,

    /// Urgency.
    pub severity: Severity,

    /// Human-readable description.
    pub message: String,

    /// When the alert was created.
    pub timestamp: DateTime<Utc>,

    /// Set once an operator acknowledges the alert.
    pub acknowledgement: Option<Acknowledgement>,

    /// Free-form context (actual values, limits, fence ids).
    pub metadata: HashMap<String, String>,
}

impl Alert {
    /// Whether an operator has acknowledged this alert.
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledgement.is_some()
    }
}

/// An alert before the log assigns id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDraft {
    /// Condition that fired.
    pub kind: AlertKind,

    /// Urgency.
    pub severity: Severity,

    /// Human-readable description.
    pub message: String,

    /// Free-form context.
    pub metadata: HashMap<String, String>,
}

impl AlertDraft {
    /// Create a draft with empty metadata.
    pub fn new(kind: AlertKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            metadata: HashMap::new(),
        }
    }

    /// Attach one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
