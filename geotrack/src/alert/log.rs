//! Append-only alert log.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;

use super::model::{Acknowledgement, Alert, AlertDraft, AlertId, AlertKind, Severity};

/// Why an acknowledgement was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AcknowledgeError {
    /// No alert with that id exists.
    #[error("alert {0} not found")]
    NotFound(AlertId),

    /// The alert was already acknowledged.
    #[error("alert {0} is already acknowledged")]
    AlreadyAcknowledged(AlertId),
}

/// Criteria for querying the log. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertFilter {
    /// Restrict to one equipment id.
    pub equipment_id: Option<String>,

    /// Restrict by acknowledged state.
    pub acknowledged: Option<bool>,

    /// Restrict to one severity.
    pub severity: Option<Severity>,

    /// Restrict to one alert kind.
    pub kind: Option<AlertKind>,
}

impl AlertFilter {
    fn matches(&self, alert: &Alert) -> bool {
        self.equipment_id
            .as_ref()
            .is_none_or(|id| &alert.equipment_id == id)
            && self
                .acknowledged
                .is_none_or(|a| alert.is_acknowledged() == a)
            && self.severity.is_none_or(|s| alert.severity == s)
            && self.kind.is_none_or(|k| alert.kind == k)
    }
}

/// In-memory append-only alert log.
///
/// Entries are never deleted; acknowledgement is the only mutation.
/// Queries return clones so callers never hold the internal lock.
#[derive(Debug, Default)]
pub struct AlertLog {
    entries: RwLock<Vec<Alert>>,
    next_id: AtomicU64,
}

impl AlertLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize a draft into a recorded alert.
    pub fn append(
        &self,
        equipment_id: &str,
        draft: AlertDraft,
        timestamp: DateTime<Utc>,
    ) -> Alert {
        let alert = Alert {
            id: AlertId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1),
            equipment_id: equipment_id.to_string(),
            kind: draft.kind,
            severity: draft.severity,
            message: draft.message,
            timestamp,
            acknowledgement: None,
            metadata: draft.metadata,
        };
        self.entries.write().push(alert.clone());
        alert
    }

    /// Alerts matching the filter, in creation order.
    pub fn query(&self, filter: &AlertFilter) -> Vec<Alert> {
        self.entries
            .read()
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect()
    }

    /// Look up one alert.
    pub fn get(&self, id: AlertId) -> Option<Alert> {
        self.entries.read().iter().find(|a| a.id == id).cloned()
    }

    /// Record an operator acknowledgement.
    ///
    /// # Errors
    ///
    /// [`AcknowledgeError::NotFound`] for unknown ids,
    /// [`AcknowledgeError::AlreadyAcknowledged`] when acknowledged
    /// before (first acknowledger wins).
    pub fn acknowledge(
        &self,
        id: AlertId,
        by: &str,
        at: DateTime<Utc>,
    ) -> Result<Alert, AcknowledgeError> {
        let mut entries = self.entries.write();
        let alert = entries
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(AcknowledgeError::NotFound(id))?;

        if alert.is_acknowledged() {
            return Err(AcknowledgeError::AlreadyAcknowledged(id));
        }

        alert.acknowledgement = Some(Acknowledgement {
            by: by.to_string(),
            at,
        });
        Ok(alert.clone())
    }

    /// Total number of recorded alerts.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn draft(kind: AlertKind, severity: Severity) -> AlertDraft {
        AlertDraft::new(kind, severity, "test alert")
    }

    #[test]
    fn test_append_assigns_ids_in_order() {
        let log = AlertLog::new();
        let a = log.append("exc-1", draft(AlertKind::SpeedLimit, Severity::Warning), now());
        let b = log.append("exc-1", draft(AlertKind::SpeedLimit, Severity::Warning), now());

        assert!(a.id < b.id);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_query_by_equipment() {
        let log = AlertLog::new();
        log.append("exc-1", draft(AlertKind::SpeedLimit, Severity::Warning), now());
        log.append("exc-2", draft(AlertKind::SpeedLimit, Severity::Warning), now());

        let filter = AlertFilter {
            equipment_id: Some("exc-1".into()),
            ..Default::default()
        };
        let matches = log.query(&filter);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].equipment_id, "exc-1");
    }

    #[test]
    fn test_query_by_severity_and_kind() {
        let log = AlertLog::new();
        log.append("exc-1", draft(AlertKind::SpeedLimit, Severity::Warning), now());
        log.append("exc-1", draft(AlertKind::ConnectionLost, Severity::Critical), now());

        let filter = AlertFilter {
            severity: Some(Severity::Critical),
            ..Default::default()
        };
        assert_eq!(log.query(&filter).len(), 1);

        let filter = AlertFilter {
            kind: Some(AlertKind::SpeedLimit),
            ..Default::default()
        };
        assert_eq!(log.query(&filter).len(), 1);
    }

    #[test]
    fn test_query_by_acknowledged() {
        let log = AlertLog::new();
        let a = log.append("exc-1", draft(AlertKind::SpeedLimit, Severity::Warning), now());
        log.append("exc-1", draft(AlertKind::SpeedLimit, Severity::Warning), now());

        log.acknowledge(a.id, "operator", now()).unwrap();

        let filter = AlertFilter {
            acknowledged: Some(false),
            ..Default::default()
        };
        assert_eq!(log.query(&filter).len(), 1);

        let filter = AlertFilter {
            acknowledged: Some(true),
            ..Default::default()
        };
        assert_eq!(log.query(&filter).len(), 1);
    }

    #[test]
    fn test_acknowledge_records_who_and_when() {
        let log = AlertLog::new();
        let alert = log.append("exc-1", draft(AlertKind::SpeedLimit, Severity::Warning), now());

        let acked = log.acknowledge(alert.id, "operator-7", now()).unwrap();
        let ack = acked.acknowledgement.expect("acknowledgement expected");
        assert_eq!(ack.by, "operator-7");
        assert_eq!(ack.at, now());
    }

    #[test]
    fn test_acknowledge_twice_fails() {
        let log = AlertLog::new();
        let alert = log.append("exc-1", draft(AlertKind::SpeedLimit, Severity::Warning), now());

        log.acknowledge(alert.id, "first", now()).unwrap();
        let err = log.acknowledge(alert.id, "second", now()).unwrap_err();
        assert_eq!(err, AcknowledgeError::AlreadyAcknowledged(alert.id));

        // First acknowledger is preserved
        let stored = log.get(alert.id).unwrap();
        assert_eq!(stored.acknowledgement.unwrap().by, "first");
    }

    #[test]
    fn test_acknowledge_unknown_id_fails() {
        let log = AlertLog::new();
        let err = log.acknowledge(AlertId(99), "operator", now()).unwrap_err();
        assert_eq!(err, AcknowledgeError::NotFound(AlertId(99)));
    }
}
