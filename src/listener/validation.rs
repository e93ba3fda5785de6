//! Listener argument validation.
//!
//! # Responsibilities
//! - Check required fields before any network call
//! - Reject desired sets that reuse a listener port
//!
//! # Design Decisions
//! - Pure and synchronous: a failure here means nothing was sent
//! - Returns the first problem found, named after the provider operation

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ValidationError;
use crate::listener::spec::{ListenerSpec, Protocol, ProtocolSpec};

/// Arguments of the batch delete call.
///
/// `port_list` distinguishes "no list given" (`None`, invalid) from an
/// empty list (valid, nothing to delete).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteListenersArgs {
    #[serde(skip)]
    pub load_balancer_id: String,
    pub port_list: Option<Vec<u16>>,
}

impl DeleteListenersArgs {
    pub fn new(load_balancer_id: impl Into<String>, ports: Vec<u16>) -> Self {
        Self {
            load_balancer_id: load_balancer_id.into(),
            port_list: Some(ports),
        }
    }
}

/// Stateless validator for listener operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListenerValidator;

impl ListenerValidator {
    pub fn validate_create(load_balancer_id: &str, spec: &ListenerSpec) -> Result<(), ValidationError> {
        let op = spec.protocol().create_op();
        require_load_balancer(op, load_balancer_id)?;
        require_port(op, spec.listener_port)
    }

    pub fn validate_update(
        load_balancer_id: &str,
        listener_port: u16,
        spec: &ListenerSpec,
    ) -> Result<(), ValidationError> {
        let op = spec.protocol().update_op();
        require_load_balancer(op, load_balancer_id)?;
        require_port(op, listener_port)?;

        if spec.listener_port != 0 && spec.listener_port != listener_port {
            return Err(ValidationError::new(
                op,
                format!(
                    "listenerPort is immutable ({} -> {}), delete and recreate instead",
                    listener_port, spec.listener_port
                ),
            ));
        }

        if let ProtocolSpec::Udp { health_check_string } = &spec.protocol {
            if spec.backend_port == 0 {
                return Err(ValidationError::new(op, "backendPort is required"));
            }
            if spec.scheduler.is_none() {
                return Err(ValidationError::new(op, "scheduler is required"));
            }
            if health_check_string.as_deref().map_or(true, str::is_empty) {
                return Err(ValidationError::new(op, "healthCheckString is required"));
            }
        }
        Ok(())
    }

    pub fn validate_describe(load_balancer_id: &str, protocol: Protocol) -> Result<(), ValidationError> {
        require_load_balancer(protocol.describe_op(), load_balancer_id)
    }

    pub fn validate_delete(args: &DeleteListenersArgs) -> Result<(), ValidationError> {
        const OP: &str = "DeleteListeners";
        require_load_balancer(OP, &args.load_balancer_id)?;
        if args.port_list.is_none() {
            return Err(ValidationError::new(OP, "portList is required"));
        }
        Ok(())
    }

    /// A desired listener set must not use the same port twice, across protocols.
    pub fn validate_desired_set(specs: &[ListenerSpec]) -> Result<(), ValidationError> {
        const OP: &str = "ReconcileListeners";
        let mut seen: BTreeMap<u16, Protocol> = BTreeMap::new();
        for spec in specs {
            require_port(OP, spec.listener_port)?;
            if let Some(previous) = seen.insert(spec.listener_port, spec.protocol()) {
                return Err(ValidationError::new(
                    OP,
                    format!(
                        "listenerPort {} used by both {} and {}",
                        spec.listener_port,
                        previous,
                        spec.protocol()
                    ),
                ));
            }
        }
        Ok(())
    }
}

fn require_load_balancer(op: &'static str, load_balancer_id: &str) -> Result<(), ValidationError> {
    if load_balancer_id.trim().is_empty() {
        return Err(ValidationError::new(op, "loadBalancerId is required"));
    }
    Ok(())
}

fn require_port(op: &'static str, port: u16) -> Result<(), ValidationError> {
    if port == 0 {
        return Err(ValidationError::new(op, "listenerPort is required"));
    }
    Ok(())
}
