//! Rule evaluation against incoming positions.
//!
//! One position may violate several rules, and one rule may have
//! several violated conditions; every violation becomes its own alert
//! draft. A failure inside one rule (a malformed operating-hours bound)
//! is logged and skips that rule only; the rest keep evaluating.

use std::collections::HashSet;

use tracing::warn;

use crate::alert::AlertDraft;
use crate::geofence::GeofenceId;
use crate::position::PositionSample;

use super::model::MonitoringRule;

/// Everything a rule can be checked against for one position cycle.
#[derive(Debug)]
pub struct EvaluationContext<'a> {
    /// Equipment that reported the position.
    pub equipment_id: &'a str,

    /// The accepted position.
    pub sample: &'a PositionSample,

    /// Instantaneous speed derived during ingestion, if defined.
    pub speed_mps: Option<f64>,

    /// Fences that fired a boundary crossing this cycle.
    pub fired_geofences: &'a HashSet<GeofenceId>,
}

/// Evaluate every applicable rule, collecting alert drafts.
pub fn evaluate_all(rules: &[MonitoringRule], ctx: &EvaluationContext<'_>) -> Vec<AlertDraft> {
    rules
        .iter()
        .flat_map(|rule| evaluate(rule, ctx))
        .collect()
}

/// Evaluate one rule, producing zero or more alert drafts.
pub fn evaluate(rule: &MonitoringRule, ctx: &EvaluationContext<'_>) -> Vec<AlertDraft> {
    if !rule.enabled || !rule.applies_to(ctx.equipment_id) {
        return Vec::new();
    }

    // Geofence-scoped rules only run on cycles where one of their
    // fences crossed a boundary.
    let fired_scope: Vec<GeofenceId> = rule
        .conditions
        .geofence_ids
        .iter()
        .copied()
        .filter(|id| ctx.fired_geofences.contains(id))
        .collect();
    if !rule.conditions.geofence_ids.is_empty() && fired_scope.is_empty() {
        return Vec::new();
    }

    let mut drafts = Vec::new();

    if let (Some(limit), Some(speed)) = (rule.conditions.max_speed_mps, ctx.speed_mps) {
        if speed > limit {
            drafts.push(
                AlertDraft::new(
                    rule.kind,
                    rule.severity,
                    format!("speed {:.1} m/s exceeds limit {:.1} m/s", speed, limit),
                )
                .with_metadata("rule_id", rule.id.to_string())
                .with_metadata("actual_speed_mps", format!("{:.3}", speed))
                .with_metadata("limit_mps", format!("{:.3}", limit)),
            );
        }
    }

    if let Some(bound) = rule.conditions.max_accuracy_m {
        if ctx.sample.accuracy_m > bound {
            drafts.push(
                AlertDraft::new(
                    rule.kind,
                    rule.severity,
                    format!(
                        "accuracy {:.1}m is worse than the {:.1}m bound",
                        ctx.sample.accuracy_m, bound
                    ),
                )
                .with_metadata("rule_id", rule.id.to_string())
                .with_metadata("accuracy_m", format!("{:.3}", ctx.sample.accuracy_m))
                .with_metadata("bound_m", format!("{:.3}", bound)),
            );
        }
    }

    if let Some(hours) = &rule.conditions.operating_hours {
        match hours.contains(ctx.sample.timestamp.time()) {
            Ok(true) => {}
            Ok(false) => {
                drafts.push(
                    AlertDraft::new(
                        rule.kind,
                        rule.severity,
                        format!(
                            "position at {} is outside operating hours {}-{}",
                            ctx.sample.timestamp.format("%H:%M"),
                            hours.start,
                            hours.end
                        ),
                    )
                    .with_metadata("rule_id", rule.id.to_string())
                    .with_metadata("window_start", hours.start.clone())
                    .with_metadata("window_end", hours.end.clone()),
                );
            }
            Err(err) => {
                // One broken rule must not block the others
                warn!(rule = %rule.id, error = %err, "Skipping rule with malformed operating hours");
            }
        }
    }

    // A purely geofence-scoped rule: the crossing itself is the
    // violation.
    if drafts.is_empty()
        && !fired_scope.is_empty()
        && rule.conditions.max_speed_mps.is_none()
        && rule.conditions.max_accuracy_m.is_none()
        && rule.conditions.operating_hours.is_none()
    {
        for geofence_id in fired_scope {
            drafts.push(
                AlertDraft::new(
                    rule.kind,
                    rule.severity,
                    format!("boundary crossing at watched {}", geofence_id),
                )
                .with_metadata("rule_id", rule.id.to_string())
                .with_metadata("geofence_id", geofence_id.to_string()),
            );
        }
    }

    drafts
}
