//! Monitoring rule definitions.
//!
//! A rule is a bundle of optional conditions checked against each
//! accepted position (plus that cycle's boundary crossings). Conditions
//! are independent; any subset may be set, and every violated condition
//! produces its own alert.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alert::{AlertKind, Severity};
use crate::geofence::GeofenceId;

/// Identifier assigned to a rule by the service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct RuleId(pub u64);

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rule-{}", self.0)
    }
}

/// Malformed rule configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleConfigError {
    /// An operating-hours bound is not "HH:MM".
    #[error("\"{0}\" is not a valid HH:MM time")]
    InvalidTimeOfDay(String),

    /// Speed limit is negative or not finite.
    #[error("speed limit {0} m/s is negative or not finite")]
    InvalidSpeedLimit(f64),

    /// Accuracy bound is negative or not finite.
    #[error("accuracy bound {0}m is negative or not finite")]
    InvalidAccuracyBound(f64),

    /// The rule has no conditions at all.
    #[error("rule has no conditions")]
    NoConditions,
}

/// A daily operating window with "HH:MM" bounds.
///
/// The window is inclusive and may wrap midnight: `22:00`–`06:00`
/// covers the night shift. Bounds are kept as strings and parsed at
/// evaluation time; a malformed bound skips only this rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingHours {
    /// Window start, "HH:MM".
    pub start: String,

    /// Window end, "HH:MM".
    pub end: String,
}

impl OperatingHours {
    /// Create a window from "HH:MM" bounds (not validated here).
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Parse both bounds.
    ///
    /// # Errors
    ///
    /// [`RuleConfigError::InvalidTimeOfDay`] naming the offending bound.
    pub fn window(&self) -> Result<(NaiveTime, NaiveTime), RuleConfigError> {
        let start = parse_time_of_day(&self.start)?;
        let end = parse_time_of_day(&self.end)?;
        Ok((start, end))
    }

    /// Whether a time of day falls inside the window (inclusive),
    /// handling windows that wrap midnight.
    ///
    /// # Errors
    ///
    /// Propagates the parse failure for malformed bounds.
    pub fn contains(&self, time: NaiveTime) -> Result<bool, RuleConfigError> {
        let (start, end) = self.window()?;
        if start <= end {
            Ok(time >= start && time <= end)
        } else {
            // Wraps midnight: inside means after start or before end
            Ok(time >= start || time <= end)
        }
    }
}

fn parse_time_of_day(s: &str) -> Result<NaiveTime, RuleConfigError> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| RuleConfigError::InvalidTimeOfDay(s.to_string()))
}

/// The conditions a rule checks. All fields are optional; at least one
/// must be set for the rule to be accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleConditions {
    /// Alert when instantaneous speed exceeds this, in m/s.
    pub max_speed_mps: Option<f64>,

    /// Alert when reported accuracy (error radius) exceeds this, in
    /// meters. The source called this `minAccuracy`; the comparison
    /// direction is unchanged: `accuracy > bound` fires.
    pub max_accuracy_m: Option<f64>,

    /// Alert when a position arrives outside this daily window.
    pub operating_hours: Option<OperatingHours>,

    /// When non-empty, the rule only runs on cycles where one of these
    /// fences fired a boundary crossing.
    #[serde(default)]
    pub geofence_ids: Vec<GeofenceId>,
}

impl RuleConditions {
    /// Whether any condition is configured.
    pub fn is_empty(&self) -> bool {
        self.max_speed_mps.is_none()
            && self.max_accuracy_m.is_none()
            && self.operating_hours.is_none()
            && self.geofence_ids.is_empty()
    }

    /// Check numeric ranges and time formats.
    pub fn validate(&self) -> Result<(), RuleConfigError> {
        if self.is_empty() {
            return Err(RuleConfigError::NoConditions);
        }
        if let Some(limit) = self.max_speed_mps {
            if !limit.is_finite() || limit < 0.0 {
                return Err(RuleConfigError::InvalidSpeedLimit(limit));
            }
        }
        if let Some(bound) = self.max_accuracy_m {
            if !bound.is_finite() || bound < 0.0 {
                return Err(RuleConfigError::InvalidAccuracyBound(bound));
            }
        }
        if let Some(hours) = &self.operating_hours {
            hours.window()?;
        }
        Ok(())
    }
}

/// Input for registering a new rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Restrict to one equipment id; `None` applies to all.
    pub equipment_id: Option<String>,

    /// What to check.
    pub conditions: RuleConditions,

    /// Kind stamped onto alerts this rule produces.
    pub kind: AlertKind,

    /// Severity stamped onto alerts this rule produces.
    pub severity: Severity,

    /// Disabled rules are kept but never evaluated.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// A registered monitoring rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringRule {
    /// Service-assigned identifier.
    pub id: RuleId,

    /// Restrict to one equipment id; `None` applies to all.
    pub equipment_id: Option<String>,

    /// What to check.
    pub conditions: RuleConditions,

    /// Kind stamped onto alerts this rule produces.
    pub kind: AlertKind,

    /// Severity stamped onto alerts this rule produces.
    pub severity: Severity,

    /// Disabled rules are kept but never evaluated.
    pub enabled: bool,
}

impl MonitoringRule {
    /// Whether the rule applies to this equipment.
    pub fn applies_to(&self, equipment_id: &str) -> bool {
        self.equipment_id
            .as_deref()
            .is_none_or(|scoped| scoped == equipment_id)
    }
}
