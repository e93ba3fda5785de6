//! Load-balancer identity resolution.

use crate::blb::{BlbClient, LoadBalancerRecord};
use crate::error::BlbResult;
use crate::identity::service::ServiceRef;

/// Which hint located the load balancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintSource {
    Explicit,
    LegacyReserved,
    AutoAssigned,
    Name,
}

impl HintSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            HintSource::Explicit => "explicit",
            HintSource::LegacyReserved => "legacy_reserved",
            HintSource::AutoAssigned => "auto_assigned",
            HintSource::Name => "name",
        }
    }
}

/// A load balancer found for a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub record: LoadBalancerRecord,
    pub source: HintSource,
}

/// Finds the load balancer that already belongs to a service, if any.
///
/// Lookups run in a fixed order and stop at the first hit:
/// explicit id, legacy reserved id, auto-assigned id, then the derived name.
/// A stale id falls through to the next step. Resolution never mutates the
/// service; callers act on [`Resolution::source`].
#[derive(Clone)]
pub struct IdentityResolver {
    blb: BlbClient,
    cluster_id: String,
}

impl IdentityResolver {
    pub fn new(blb: BlbClient, cluster_id: impl Into<String>) -> Self {
        Self {
            blb,
            cluster_id: cluster_id.into(),
        }
    }

    pub async fn resolve(&self, service: &ServiceRef) -> BlbResult<Option<Resolution>> {
        let hints = &service.hints;
        let by_id = [
            (HintSource::Explicit, hints.explicit_load_balancer_id.as_deref()),
            (HintSource::LegacyReserved, hints.legacy_reserved_id.as_deref()),
            (HintSource::AutoAssigned, hints.auto_assigned_id.as_deref()),
        ];

        for (source, id) in by_id {
            let Some(id) = id.filter(|id| !id.trim().is_empty()) else {
                continue;
            };
            match self.blb.get_by_id(id).await? {
                Some(record) => {
                    tracing::debug!(
                        service = %service.key(),
                        load_balancer_id = %record.id,
                        source = source.as_str(),
                        "Resolved load balancer"
                    );
                    return Ok(Some(Resolution { record, source }));
                }
                None => {
                    tracing::info!(
                        service = %service.key(),
                        load_balancer_id = %id,
                        source = source.as_str(),
                        "Identity hint is stale, falling through"
                    );
                }
            }
        }

        let name = service.load_balancer_name(&self.cluster_id);
        let found = self.blb.get_by_name(&name).await?;
        if let Some(record) = &found {
            tracing::debug!(
                service = %service.key(),
                load_balancer_id = %record.id,
                name = %name,
                "Resolved load balancer by name"
            );
        }
        Ok(found.map(|record| Resolution {
            record,
            source: HintSource::Name,
        }))
    }
}
