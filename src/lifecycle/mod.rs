//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! EnsureExists (manager.rs):
//!     Resolve → Found                       (done, nothing written)
//!     Resolve → Create → poll until fetchable → write hints → Ready
//!
//! EnsureDeleted (manager.rs):
//!     record? → delete by id → Deleted      (absent is success)
//!
//! Cancellation (cancel.rs, signals.rs):
//!     Ctrl-C → Cancellation::cancel → every guarded call returns Cancelled
//! ```
//!
//! # Design Decisions
//! - Bounded readiness poll instead of a blind settle delay
//! - Hints are persisted only after readiness is confirmed
//! - At most one pass per service at a time; the caller serializes

pub mod cancel;
pub mod manager;
pub mod signals;

pub use cancel::{CancelSignal, Cancellation};
pub use manager::{Ensured, LifecycleManager, LifecycleState, Released};
