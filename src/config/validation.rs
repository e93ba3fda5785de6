//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, attempts > 0)
//! - Check the endpoint can be resolved
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ReconcilerConfig → Result<(), Vec<ConfigValidationError>>

use thiserror::Error;

use crate::config::schema::ReconcilerConfig;
use crate::transport::region_endpoint;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ConfigValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ConfigValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a loaded configuration for semantic errors.
pub fn validate_config(config: &ReconcilerConfig) -> Result<(), Vec<ConfigValidationError>> {
    let mut errors = Vec::new();

    if config.cloud.cluster_id.trim().is_empty() {
        errors.push(ConfigValidationError::new("cloud.cluster_id", "must not be empty"));
    }

    let has_endpoint = config
        .cloud
        .endpoint
        .as_deref()
        .is_some_and(|e| !e.is_empty());
    if !has_endpoint && region_endpoint(&config.cloud.region).is_none() {
        errors.push(ConfigValidationError::new(
            "cloud.region",
            format!("unknown region '{}' and no endpoint override", config.cloud.region),
        ));
    }

    if config.cloud.request_timeout_secs == 0 {
        errors.push(ConfigValidationError::new("cloud.request_timeout_secs", "must be > 0"));
    }

    if config.readiness.max_attempts == 0 {
        errors.push(ConfigValidationError::new("readiness.max_attempts", "must be > 0"));
    }

    if config.readiness.base_delay_ms > config.readiness.max_delay_ms {
        errors.push(ConfigValidationError::new(
            "readiness.base_delay_ms",
            "must not exceed readiness.max_delay_ms",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
