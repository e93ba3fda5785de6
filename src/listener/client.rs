//! Listener operations for one load balancer.
//!
//! # Responsibilities
//! - Create / describe / update listeners per protocol family
//! - Batch-delete listeners by port
//! - Validate every call before it reaches the transport

use std::sync::Arc;

use crate::error::{BlbError, BlbResult};
use crate::listener::spec::{DescribeListenersResponse, ListenerSpec, Protocol};
use crate::listener::validation::{DeleteListenersArgs, ListenerValidator};
use crate::transport::{self, ApiRequest, Transport, CLIENT_TOKEN_PARAM};

const RESOURCE: &str = "listener";
const PAGE_SIZE: u32 = 1000;
const MAX_PAGES: usize = 100;

fn listener_path(load_balancer_id: &str, protocol: Protocol) -> String {
    format!("v1/blb/{}/{}", load_balancer_id, protocol.path_segment())
}

/// Issues listener calls against the provider.
#[derive(Clone)]
pub struct ListenerReconciler {
    transport: Arc<dyn Transport>,
}

impl ListenerReconciler {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Create a listener. The provider returns no identifier; the port is the key.
    pub async fn create(&self, load_balancer_id: &str, spec: &ListenerSpec) -> BlbResult<()> {
        ListenerValidator::validate_create(load_balancer_id, spec)?;
        let protocol = spec.protocol();
        let op = protocol.create_op();

        let request = ApiRequest::post(listener_path(load_balancer_id, protocol))
            .query(CLIENT_TOKEN_PARAM, self.transport.client_token())
            .json(&spec.wire_body(true))
            .map_err(|source| BlbError::Encode { operation: op, source })?;

        let target = format!("{}:{}", load_balancer_id, spec.listener_port);
        transport::call(self.transport.as_ref(), op, RESOURCE, &target, request).await?;
        tracing::info!(load_balancer_id, port = spec.listener_port, protocol = %protocol, "Listener created");
        Ok(())
    }

    /// List listeners of one protocol, or only the one on `port`.
    ///
    /// Ordering is whatever the provider returns.
    pub async fn describe(
        &self,
        load_balancer_id: &str,
        protocol: Protocol,
        port: Option<u16>,
    ) -> BlbResult<Vec<ListenerSpec>> {
        ListenerValidator::validate_describe(load_balancer_id, protocol)?;
        let op = protocol.describe_op();

        let mut listeners = Vec::new();
        let mut marker: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut request = ApiRequest::get(listener_path(load_balancer_id, protocol))
                .query("maxKeys", PAGE_SIZE.to_string());
            if let Some(port) = port {
                request = request.query("listenerPort", port.to_string());
            }
            if let Some(m) = &marker {
                request = request.query("marker", m.as_str());
            }

            let body = transport::call(self.transport.as_ref(), op, RESOURCE, load_balancer_id, request).await?;
            let page: DescribeListenersResponse = transport::decode(op, &body)?;
            listeners.extend(
                page.listener_list
                    .into_iter()
                    .map(|wire| wire.into_spec(protocol))
                    .filter(|spec| port.map_or(true, |p| spec.listener_port == p)),
            );

            if !page.is_truncated || page.next_marker.is_empty() {
                return Ok(listeners);
            }
            marker = Some(page.next_marker);
        }

        tracing::warn!(load_balancer_id, protocol = %protocol, "Listener pagination did not terminate");
        Err(BlbError::InvariantViolation {
            operation: op,
            id: load_balancer_id.to_string(),
            detail: format!("pagination did not terminate after {} pages", MAX_PAGES),
        })
    }

    /// All listeners on the load balancer, across the four protocol families.
    pub async fn describe_all(&self, load_balancer_id: &str) -> BlbResult<Vec<ListenerSpec>> {
        let mut all = Vec::new();
        for protocol in Protocol::ALL {
            all.extend(self.describe(load_balancer_id, protocol, None).await?);
        }
        Ok(all)
    }

    /// Replace the mutable fields of the listener on `port`.
    pub async fn update(&self, load_balancer_id: &str, port: u16, spec: &ListenerSpec) -> BlbResult<()> {
        ListenerValidator::validate_update(load_balancer_id, port, spec)?;
        let protocol = spec.protocol();
        let op = protocol.update_op();

        let request = ApiRequest::put(listener_path(load_balancer_id, protocol))
            .query("listenerPort", port.to_string())
            .query(CLIENT_TOKEN_PARAM, self.transport.client_token())
            .json(&spec.wire_body(false))
            .map_err(|source| BlbError::Encode { operation: op, source })?;

        let target = format!("{}:{}", load_balancer_id, port);
        transport::call(self.transport.as_ref(), op, RESOURCE, &target, request).await?;
        tracing::info!(load_balancer_id, port, protocol = %protocol, "Listener updated");
        Ok(())
    }

    /// Delete every listed port in one call.
    pub async fn delete_many(&self, load_balancer_id: &str, ports: &[u16]) -> BlbResult<()> {
        self.delete(&DeleteListenersArgs::new(load_balancer_id, ports.to_vec()))
            .await
    }

    /// Batch delete. An empty port list is valid and sends nothing.
    pub async fn delete(&self, args: &DeleteListenersArgs) -> BlbResult<()> {
        const OP: &str = "DeleteListeners";
        ListenerValidator::validate_delete(args)?;

        if args.port_list.as_ref().is_some_and(|ports| ports.is_empty()) {
            tracing::debug!(load_balancer_id = %args.load_balancer_id, "No listeners to delete");
            return Ok(());
        }

        let request = ApiRequest::put(format!("v1/blb/{}/listener", args.load_balancer_id))
            .query("batchdelete", "")
            .query(CLIENT_TOKEN_PARAM, self.transport.client_token())
            .json(args)
            .map_err(|source| BlbError::Encode { operation: OP, source })?;

        transport::call(self.transport.as_ref(), OP, RESOURCE, &args.load_balancer_id, request).await?;
        tracing::info!(load_balancer_id = %args.load_balancer_id, ports = ?args.port_list, "Listeners deleted");
        Ok(())
    }
}

impl std::fmt::Debug for ListenerReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerReconciler").finish_non_exhaustive()
    }
}
