//! Listener subsystem.
//!
//! # Data Flow
//! ```text
//! desired ListenerSpec set (from the service)
//!     → validation.rs (required fields, port uniqueness)
//!     → client.rs describe (current set, per protocol)
//!     → diff.rs (to_create / to_update / to_delete by port)
//!     → reconcile.rs (apply: update, create, batch delete)
//! ```
//!
//! # Design Decisions
//! - One sum type for all protocols; dispatch by protocol tag
//! - The listener port is the identifier and never changes in place
//! - Nothing is sent until every local check has passed

pub mod client;
pub mod diff;
pub mod reconcile;
pub mod spec;
pub mod validation;

pub use client::ListenerReconciler;
pub use diff::ListenerDiff;
pub use reconcile::reconcile_listeners;
pub use spec::{
    HealthCheck, HttpOptions, HttpsOptions, ListenerSpec, Protocol, ProtocolSpec, Scheduler,
};
pub use validation::{DeleteListenersArgs, ListenerValidator};
