//! One listener reconciliation pass.
//!
//! # Order of application
//! ```text
//! validate everything locally (no calls yet)
//!     → describe current listeners, all protocols
//!     → ListenerDiff::compute
//!     → update changed listeners
//!     → create new listeners on free ports
//!     → one batch delete (stale ports + ports changing protocol)
//!     → create listeners on the ports just freed
//! ```
//! Creates and updates run before the delete so a port being migrated is
//! never left without a listener longer than needed. A port changing protocol
//! is the exception: the provider refuses two listeners on one port.

use std::future::Future;

use crate::error::BlbResult;
use crate::lifecycle::cancel::CancelSignal;
use crate::listener::client::ListenerReconciler;
use crate::listener::diff::ListenerDiff;
use crate::listener::spec::ListenerSpec;
use crate::listener::validation::ListenerValidator;
use crate::observability::metrics;

/// Converge the listeners of `load_balancer_id` to `desired`.
///
/// Returns the diff that was applied.
pub async fn reconcile_listeners(
    listeners: &ListenerReconciler,
    load_balancer_id: &str,
    desired: &[ListenerSpec],
    cancel: &CancelSignal,
) -> BlbResult<ListenerDiff> {
    ListenerValidator::validate_desired_set(desired)?;
    for spec in desired {
        ListenerValidator::validate_create(load_balancer_id, spec)?;
    }

    let current = cancel
        .guard("DescribeListeners", false, listeners.describe_all(load_balancer_id))
        .await?;
    let diff = ListenerDiff::compute(desired, &current);

    if diff.is_empty() {
        tracing::debug!(load_balancer_id, listeners = current.len(), "Listeners already converged");
        return Ok(diff);
    }

    // updates have stricter rules; check them all before the first mutation
    for spec in &diff.to_update {
        ListenerValidator::validate_update(load_balancer_id, spec.listener_port, spec)?;
    }

    tracing::info!(
        load_balancer_id,
        create = diff.to_create.len(),
        update = diff.to_update.len(),
        delete = diff.to_delete.len(),
        "Reconciling listeners"
    );

    let replaced = diff.replaced_ports();
    let mut mutated = false;

    for spec in &diff.to_update {
        let update = listeners.update(load_balancer_id, spec.listener_port, spec);
        apply(cancel, &mut mutated, spec.protocol().update_op(), update).await?;
    }

    for spec in diff.to_create.iter().filter(|s| !replaced.contains(&s.listener_port)) {
        let create = listeners.create(load_balancer_id, spec);
        apply(cancel, &mut mutated, spec.protocol().create_op(), create).await?;
    }

    if !diff.to_delete.is_empty() {
        let delete = listeners.delete_many(load_balancer_id, &diff.to_delete);
        apply(cancel, &mut mutated, "DeleteListeners", delete).await?;
    }

    for spec in diff.to_create.iter().filter(|s| replaced.contains(&s.listener_port)) {
        let create = listeners.create(load_balancer_id, spec);
        apply(cancel, &mut mutated, spec.protocol().create_op(), create).await?;
    }

    metrics::record_listener_changes(diff.to_create.len(), diff.to_update.len(), diff.to_delete.len());
    Ok(diff)
}

/// Run one mutating call. Once any call has gone out, a cancellation
/// reports the pass outcome as unknown.
async fn apply<F>(cancel: &CancelSignal, mutated: &mut bool, operation: &'static str, call: F) -> BlbResult<()>
where
    F: Future<Output = BlbResult<()>>,
{
    if *mutated {
        cancel.guard_after_mutation(operation, call).await
    } else {
        cancel.guard(operation, true, call).await?;
        *mutated = true;
        Ok(())
    }
}
