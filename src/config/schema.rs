//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the reconciler.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the reconciler.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Provider endpoint and cluster identity.
    pub cloud: CloudConfig,

    /// Post-creation readiness polling.
    pub readiness: ReadinessConfig,

    /// Network placement for newly created load balancers.
    pub placement: PlacementConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Provider and cluster configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Region short name (bj, gz, su, hk, bd).
    pub region: String,

    /// Explicit endpoint host or URL; overrides the region table.
    pub endpoint: Option<String>,

    /// Scheme used when `endpoint` has none.
    pub scheme: String,

    /// Cluster identifier, part of every derived load-balancer name.
    pub cluster_id: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Environment variable holding the Authorization header value.
    pub auth_token_env: Option<String>,

    /// Description prefix marking load balancers as system-managed.
    pub description_prefix: String,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            region: "bj".to_string(),
            endpoint: None,
            scheme: "https".to_string(),
            cluster_id: String::new(),
            request_timeout_secs: 30,
            auth_token_env: Some("BLB_AUTHORIZATION".to_string()),
            description_prefix: "auto generated by cce".to_string(),
        }
    }
}

/// Bounded poll after a creation call.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Maximum number of fetch-by-ID attempts.
    pub max_attempts: u32,

    /// Delay before the first attempt, doubled on each retry.
    pub base_delay_ms: u64,

    /// Upper bound for a single delay.
    pub max_delay_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay_ms: 2000,
            max_delay_ms: 10_000,
        }
    }
}

/// Static VPC placement.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PlacementConfig {
    pub vpc_id: String,
    pub subnet_id: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
