//! Load-balancer resource types and wire payloads.

use serde::{Deserialize, Serialize};

/// Provider-reported status of a load balancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadBalancerStatus {
    Creating,
    Available,
    Updating,
    Paused,
    Unavailable,
    #[default]
    #[serde(other)]
    Unknown,
}

/// One provisioned load balancer as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerRecord {
    /// Provider-assigned identifier.
    #[serde(rename = "blbId")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Assigned once the load balancer is available.
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub status: LoadBalancerStatus,
    #[serde(default)]
    pub desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
}

impl LoadBalancerRecord {
    pub fn is_available(&self) -> bool {
        self.status == LoadBalancerStatus::Available
    }
}

/// Arguments for `POST v1/blb`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoadBalancerArgs {
    pub name: String,
    pub vpc_id: String,
    pub subnet_id: String,
    pub desc: String,
    pub allocate_vip: bool,
}

/// Response of `POST v1/blb`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateLoadBalancerResponse {
    pub blb_id: String,
    pub name: String,
    pub address: String,
    pub desc: String,
}

/// Filters for `GET v1/blb`. Unset filters are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribeLoadBalancersArgs {
    pub blb_id: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
}

impl DescribeLoadBalancersArgs {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            blb_id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// One page of `GET v1/blb`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DescribeLoadBalancersResponse {
    pub blb_list: Vec<LoadBalancerRecord>,
    pub marker: String,
    pub is_truncated: bool,
    pub next_marker: String,
    pub max_keys: u32,
}
