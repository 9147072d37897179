//! Alert records and the append-only alert log.
//!
//! Alerts come from three producers: rule evaluation, boundary
//! crossings, and the inactivity sweeper. All of them go through the
//! same [`AlertLog`], which assigns ids, answers filtered queries, and
//! records acknowledgements (the only mutation alerts ever see).

mod log;
mod model;

pub use log::{AcknowledgeError, AlertFilter, AlertLog};
pub use model::{Acknowledgement, Alert, AlertDraft, AlertId, AlertKind, Severity};
