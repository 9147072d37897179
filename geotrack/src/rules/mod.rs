//! Configurable monitoring rules.
//!
//! # Components
//!
//! - [`model`] - `MonitoringRule`, conditions, operating-hours windows,
//!   and configuration validation
//! - [`evaluator`] - per-position evaluation producing alert drafts
//!
//! The inactivity check is deliberately *not* here: it is a periodic
//! sweep over last-seen timestamps, not a per-position rule. See the
//! service module's sweeper.

pub mod evaluator;
mod model;

pub use evaluator::{evaluate, evaluate_all, EvaluationContext};
pub use model::{
    MonitoringRule, OperatingHours, RuleConditions, RuleConfigError, RuleDefinition, RuleId,
};
