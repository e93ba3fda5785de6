//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Load balancer created:
//!     → backoff.rs (delay before each readiness fetch)
//!     → capped attempts, then the pass fails
//! ```
//!
//! # Design Decisions
//! - No retry across passes; the external control loop owns that
//! - Jittered backoff so many services created together do not poll in lockstep
//! - Every wait is interruptible by the cancellation signal

pub mod backoff;

pub use backoff::Backoff;
