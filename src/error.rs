//! Error taxonomy for load-balancer reconciliation.
//!
//! # Classes
//! - `Validation`: caught locally, no request was sent, never retried
//! - `NotFound`: a lookup came back empty; resolvers treat it as `None`
//! - `Transient`: timeout, connection failure or provider 5xx; retry next pass
//! - `Rejected`: provider refused the arguments (4xx); retrying will not help
//! - `InvariantViolation`: provider state contradicts what we were told
//! - `Cancelled`: the caller aborted the pass

use thiserror::Error;

use crate::transport::TransportError;

/// A request that failed local validation before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation}: {reason}")]
pub struct ValidationError {
    pub operation: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(operation: &'static str, reason: impl Into<String>) -> Self {
        Self {
            operation,
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the reconciliation core.
#[derive(Debug, Error)]
pub enum BlbError {
    #[error("invalid arguments for {0}")]
    Validation(#[from] ValidationError),

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    #[error("{operation} on {target} failed transiently: {source}")]
    Transient {
        operation: &'static str,
        target: String,
        #[source]
        source: TransportError,
    },

    #[error("{operation} on {target} rejected by provider: {source}")]
    Rejected {
        operation: &'static str,
        target: String,
        #[source]
        source: TransportError,
    },

    #[error("{operation} for {id}: {detail}")]
    InvariantViolation {
        operation: &'static str,
        id: String,
        detail: String,
    },

    #[error("{operation} cancelled (outcome unknown: {outcome_unknown})")]
    Cancelled {
        operation: &'static str,
        outcome_unknown: bool,
    },

    #[error("placement lookup failed: {0}")]
    Placement(String),

    #[error("failed to encode {operation} payload: {source}")]
    Encode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode {operation} response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for reconciliation operations.
pub type BlbResult<T> = Result<T, BlbError>;

impl BlbError {
    /// Classify a transport failure for `operation` against `target`.
    pub fn from_transport(
        operation: &'static str,
        resource: &'static str,
        target: impl Into<String>,
        source: TransportError,
    ) -> Self {
        let target = target.into();
        if source.is_not_found() {
            BlbError::NotFound {
                resource,
                id: target,
            }
        } else if source.is_transient() {
            BlbError::Transient {
                operation,
                target,
                source,
            }
        } else {
            BlbError::Rejected {
                operation,
                target,
                source,
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BlbError::NotFound { .. })
    }

    /// Whether the next reconciliation pass may retry the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BlbError::Transient { .. }
                | BlbError::InvariantViolation { .. }
                | BlbError::Cancelled { .. }
                | BlbError::Placement(_)
        )
    }
}
