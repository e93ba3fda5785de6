//! OS signal handling.
//!
//! # Responsibilities
//! - Translate SIGINT (Ctrl-C) into cancellation of the running pass
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A second Ctrl-C is left to the default handler once this task exits

use std::sync::Arc;

use crate::lifecycle::cancel::Cancellation;

/// Spawn a task that cancels `cancellation` on the first Ctrl-C.
pub fn cancel_on_ctrl_c(cancellation: Arc<Cancellation>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupt received, cancelling reconciliation");
                cancellation.cancel();
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
        }
    })
}
