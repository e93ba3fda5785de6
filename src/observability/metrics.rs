//! Metrics collection.
//!
//! # Metrics
//! - `blb_api_calls_total` (counter): provider calls by operation, outcome
//! - `blb_lifecycle_transitions_total` (counter): state machine transitions
//! - `blb_listener_changes_total` (counter): listeners created/updated/deleted
//!
//! Recorded through the `metrics` facade; the embedding process installs
//! the recorder and exporter.

use metrics::counter;

/// Record the outcome of one provider call.
pub fn record_api_call(operation: &'static str, success: bool) {
    let outcome = if success { "success" } else { "error" };
    counter!("blb_api_calls_total", "operation" => operation, "outcome" => outcome).increment(1);
}

/// Record entry into a lifecycle state.
pub fn record_transition(state: &'static str) {
    counter!("blb_lifecycle_transitions_total", "state" => state).increment(1);
}

/// Record listener mutations applied in one pass.
pub fn record_listener_changes(created: usize, updated: usize, deleted: usize) {
    counter!("blb_listener_changes_total", "action" => "create").increment(created as u64);
    counter!("blb_listener_changes_total", "action" => "update").increment(updated as u64);
    counter!("blb_listener_changes_total", "action" => "delete").increment(deleted as u64);
}
