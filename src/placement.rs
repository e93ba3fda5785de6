//! Network placement for new load balancers.

use async_trait::async_trait;

use crate::config::PlacementConfig;
use crate::error::{BlbError, BlbResult};
use crate::identity::ServiceRef;

/// Network and subnet a load balancer is created in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub vpc_id: String,
    pub subnet_id: String,
}

/// Decides where a service's load balancer lives.
#[async_trait]
pub trait PlacementResolver: Send + Sync {
    async fn resolve_placement(&self, service: &ServiceRef) -> BlbResult<Placement>;
}

/// Places every load balancer in one configured VPC and subnet.
#[derive(Debug, Clone)]
pub struct StaticPlacement {
    placement: Placement,
}

impl StaticPlacement {
    pub fn new(vpc_id: impl Into<String>, subnet_id: impl Into<String>) -> Self {
        Self {
            placement: Placement {
                vpc_id: vpc_id.into(),
                subnet_id: subnet_id.into(),
            },
        }
    }
}

impl From<&PlacementConfig> for StaticPlacement {
    fn from(config: &PlacementConfig) -> Self {
        Self::new(config.vpc_id.clone(), config.subnet_id.clone())
    }
}

#[async_trait]
impl PlacementResolver for StaticPlacement {
    async fn resolve_placement(&self, service: &ServiceRef) -> BlbResult<Placement> {
        if self.placement.vpc_id.is_empty() || self.placement.subnet_id.is_empty() {
            return Err(BlbError::Placement(format!(
                "no vpc/subnet configured for {}",
                service.key()
            )));
        }
        Ok(self.placement.clone())
    }
}
