//! Load-balancer reconciler library.
//!
//! Keeps exactly one provider load balancer per service and converges its
//! listeners to the service's desired set.

pub mod blb;
pub mod config;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod listener;
pub mod manifest;
pub mod observability;
pub mod placement;
pub mod resilience;
pub mod transport;

pub use config::schema::ReconcilerConfig;
pub use error::{BlbError, BlbResult};
pub use lifecycle::{CancelSignal, Cancellation, LifecycleManager};
pub use listener::ListenerReconciler;
