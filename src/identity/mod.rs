//! Service identity subsystem.
//!
//! # Data Flow
//! ```text
//! service annotations
//!     → service.rs (ServiceIdentityHints, deterministic name)
//!     → resolver.rs (explicit → legacy → auto-assigned → name)
//!     → Option<Resolution { record, source }>
//! ```
//!
//! # Design Decisions
//! - Absence is a normal result, not an error
//! - Resolution is read-only; the lifecycle manager applies hint changes

pub mod resolver;
pub mod service;

pub use resolver::{HintSource, IdentityResolver, Resolution};
pub use service::{ServiceIdentityHints, ServiceRef};
