//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! blb / listener / lifecycle produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters via the metrics facade)
//! ```
//!
//! # Design Decisions
//! - Every provider call logs operation and identifier
//! - State transitions are both logged and counted

pub mod logging;
pub mod metrics;
