//! Load-balancer lifecycle state machine.
//!
//! # States
//! ```text
//! Unresolved → Resolving ─┬→ Found                          (fast path, no mutation)
//!                         └→ Creating → AwaitingReady → Ready
//!                 any step ─→ Failed
//!
//! Deleting → Deleted                                        (independent path)
//! ```
//! Hints are written back to the service only on `Ready`, and then both
//! identifier hints at once.

use std::sync::Arc;

use crate::blb::{BlbClient, CreateLoadBalancerArgs, LoadBalancerRecord};
use crate::config::ReconcilerConfig;
use crate::error::{BlbError, BlbResult};
use crate::identity::{HintSource, IdentityResolver, Resolution, ServiceRef};
use crate::lifecycle::cancel::CancelSignal;
use crate::observability::metrics;
use crate::placement::PlacementResolver;
use crate::resilience::Backoff;
use crate::transport::Transport;

const AWAIT_READY_OP: &str = "AwaitLoadBalancerReady";

/// Lifecycle states of the load balancer belonging to one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unresolved,
    Resolving,
    Found,
    Creating,
    AwaitingReady,
    Ready,
    Failed,
    Deleting,
    Deleted,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Unresolved => "unresolved",
            LifecycleState::Resolving => "resolving",
            LifecycleState::Found => "found",
            LifecycleState::Creating => "creating",
            LifecycleState::AwaitingReady => "awaiting_ready",
            LifecycleState::Ready => "ready",
            LifecycleState::Failed => "failed",
            LifecycleState::Deleting => "deleting",
            LifecycleState::Deleted => "deleted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleState::Found | LifecycleState::Ready | LifecycleState::Failed | LifecycleState::Deleted
        )
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful `ensure_exists`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ensured {
    pub record: LoadBalancerRecord,
    /// `Found` for an existing load balancer, `Ready` for a new one.
    pub state: LifecycleState,
}

impl Ensured {
    pub fn created(&self) -> bool {
        self.state == LifecycleState::Ready
    }
}

/// Outcome of releasing a service's load balancer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Released {
    /// Nothing was found for the service.
    Absent,
    /// Found but marked reserve; left in place.
    Reserved(String),
    Deleted(String),
}

/// Top-level entry point: makes sure exactly one load balancer exists for a
/// service, or removes it.
pub struct LifecycleManager {
    blb: BlbClient,
    resolver: IdentityResolver,
    placement: Arc<dyn PlacementResolver>,
    cluster_id: String,
    description_prefix: String,
    readiness: Backoff,
}

impl LifecycleManager {
    pub fn new(
        blb: BlbClient,
        placement: Arc<dyn PlacementResolver>,
        cluster_id: impl Into<String>,
        description_prefix: impl Into<String>,
        readiness: Backoff,
    ) -> Self {
        let cluster_id = cluster_id.into();
        Self {
            resolver: IdentityResolver::new(blb.clone(), cluster_id.clone()),
            blb,
            placement,
            cluster_id,
            description_prefix: description_prefix.into(),
            readiness,
        }
    }

    pub fn from_config(
        transport: Arc<dyn Transport>,
        placement: Arc<dyn PlacementResolver>,
        config: &ReconcilerConfig,
    ) -> Self {
        Self::new(
            BlbClient::new(transport),
            placement,
            config.cloud.cluster_id.clone(),
            config.cloud.description_prefix.clone(),
            Backoff::from(&config.readiness),
        )
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    /// Make sure a load balancer exists for `service`, creating it if needed.
    ///
    /// On success the service's hints identify the returned record. On
    /// failure no identifier hint has been written. A `Cancelled` error with
    /// `outcome_unknown` means a creation may have happened; the next pass
    /// finds it by name before creating again.
    pub async fn ensure_exists(&self, service: &mut ServiceRef, cancel: &CancelSignal) -> BlbResult<Ensured> {
        let key = service.key();
        self.enter(&key, LifecycleState::Unresolved);

        match self.try_ensure_exists(&key, service, cancel).await {
            Ok(ensured) => Ok(ensured),
            Err(e) => {
                tracing::warn!(
                    service = %key,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Failed to ensure load balancer"
                );
                self.enter(&key, LifecycleState::Failed);
                Err(e)
            }
        }
    }

    async fn try_ensure_exists(
        &self,
        key: &str,
        service: &mut ServiceRef,
        cancel: &CancelSignal,
    ) -> BlbResult<Ensured> {
        self.enter(key, LifecycleState::Resolving);
        let resolved = cancel
            .guard("ResolveLoadBalancer", false, self.resolver.resolve(service))
            .await?;

        if let Some(Resolution { record, source }) = resolved {
            if source == HintSource::LegacyReserved && !service.hints.reserve {
                tracing::info!(
                    service = %key,
                    load_balancer_id = %record.id,
                    "Load balancer found through the legacy hint, marking it reserved"
                );
                service.hints.reserve = true;
            }
            self.enter(key, LifecycleState::Found);
            return Ok(Ensured {
                record,
                state: LifecycleState::Found,
            });
        }

        self.enter(key, LifecycleState::Creating);
        let placement = cancel
            .guard("ResolvePlacement", false, self.placement.resolve_placement(service))
            .await?;

        let args = CreateLoadBalancerArgs {
            name: service.load_balancer_name(&self.cluster_id),
            vpc_id: placement.vpc_id,
            subnet_id: placement.subnet_id,
            desc: format!("{}:{}", self.description_prefix, self.cluster_id),
            allocate_vip: service.hints.allocate_virtual_ip,
        };
        tracing::info!(service = %key, name = %args.name, vpc_id = %args.vpc_id, "Creating load balancer");

        let created = cancel
            .guard("CreateLoadBalancer", true, self.blb.create_load_balancer(&args))
            .await?;
        if created.blb_id.is_empty() {
            return Err(BlbError::InvariantViolation {
                operation: "CreateLoadBalancer",
                id: args.name,
                detail: "provider returned an empty identifier".to_string(),
            });
        }

        self.enter(key, LifecycleState::AwaitingReady);
        let record = self.await_ready(key, &created.blb_id, cancel).await?;

        service.hints.record_assigned(&record.id);
        self.enter(key, LifecycleState::Ready);
        tracing::info!(
            service = %key,
            load_balancer_id = %record.id,
            address = %record.address,
            "Load balancer ready"
        );
        Ok(Ensured {
            record,
            state: LifecycleState::Ready,
        })
    }

    /// Poll until the new load balancer is fetchable by id.
    ///
    /// Not-found and transient failures are retried up to the attempt cap.
    /// Anything else ends the poll at once.
    async fn await_ready(&self, key: &str, id: &str, cancel: &CancelSignal) -> BlbResult<LoadBalancerRecord> {
        let mut last_transient: Option<BlbError> = None;

        for attempt in 1..=self.readiness.max_attempts {
            cancel
                .sleep(AWAIT_READY_OP, true, self.readiness.delay(attempt))
                .await?;

            match cancel.guard_after_mutation(AWAIT_READY_OP, self.blb.get_by_id(id)).await {
                Ok(Some(record)) => return Ok(record),
                Ok(None) => {
                    tracing::debug!(service = %key, load_balancer_id = %id, attempt, "Load balancer not visible yet");
                    last_transient = None;
                }
                Err(e @ BlbError::Transient { .. }) => {
                    tracing::debug!(service = %key, load_balancer_id = %id, attempt, error = %e, "Readiness check failed");
                    last_transient = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_transient.unwrap_or_else(|| BlbError::InvariantViolation {
            operation: AWAIT_READY_OP,
            id: id.to_string(),
            detail: format!(
                "created but not fetchable after {} attempts",
                self.readiness.max_attempts
            ),
        }))
    }

    /// Delete `record`. `None`, or a record the provider no longer has, is success.
    pub async fn ensure_deleted(&self, record: Option<&LoadBalancerRecord>, cancel: &CancelSignal) -> BlbResult<()> {
        let Some(record) = record else {
            tracing::debug!("No load balancer to delete");
            return Ok(());
        };

        self.enter(&record.id, LifecycleState::Deleting);
        cancel
            .guard("DeleteLoadBalancer", true, self.blb.delete_load_balancer(&record.id))
            .await?;
        self.enter(&record.id, LifecycleState::Deleted);
        Ok(())
    }

    /// Resolve the service's load balancer and delete it unless reserved.
    pub async fn release(&self, service: &mut ServiceRef, cancel: &CancelSignal) -> BlbResult<Released> {
        let resolved = cancel
            .guard("ResolveLoadBalancer", false, self.resolver.resolve(service))
            .await?;

        let Some(Resolution { record, source }) = resolved else {
            self.ensure_deleted(None, cancel).await?;
            return Ok(Released::Absent);
        };

        if source == HintSource::LegacyReserved {
            service.hints.reserve = true;
        }
        if service.hints.reserve {
            tracing::info!(service = %service.key(), load_balancer_id = %record.id, "Load balancer is reserved, keeping it");
            return Ok(Released::Reserved(record.id));
        }

        self.ensure_deleted(Some(&record), cancel).await?;
        Ok(Released::Deleted(record.id))
    }

    fn enter(&self, subject: &str, state: LifecycleState) {
        tracing::debug!(subject = %subject, state = %state, "Lifecycle transition");
        metrics::record_transition(state.as_str());
    }
}
