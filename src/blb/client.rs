//! Load-balancer resource client.
//!
//! # Responsibilities
//! - Create a load balancer with an idempotency token
//! - Describe load balancers by id or name, following pagination
//! - Delete a load balancer, treating "already gone" as success

use std::sync::Arc;

use crate::blb::types::{
    CreateLoadBalancerArgs, CreateLoadBalancerResponse, DescribeLoadBalancersArgs,
    DescribeLoadBalancersResponse, LoadBalancerRecord,
};
use crate::error::{BlbError, BlbResult, ValidationError};
use crate::transport::{self, ApiRequest, Transport, CLIENT_TOKEN_PARAM};

const BLB_PATH: &str = "v1/blb";
const RESOURCE: &str = "load balancer";
const PAGE_SIZE: u32 = 1000;
/// Guard against a provider that keeps returning the same marker.
const MAX_PAGES: usize = 100;

/// Client for load-balancer level operations.
#[derive(Clone)]
pub struct BlbClient {
    transport: Arc<dyn Transport>,
}

impl BlbClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Create a load balancer. The response carries the new identifier.
    pub async fn create_load_balancer(
        &self,
        args: &CreateLoadBalancerArgs,
    ) -> BlbResult<CreateLoadBalancerResponse> {
        const OP: &str = "CreateLoadBalancer";
        if args.name.is_empty() {
            return Err(ValidationError::new(OP, "name is required").into());
        }

        let request = ApiRequest::post(BLB_PATH)
            .query(CLIENT_TOKEN_PARAM, self.transport.client_token())
            .json(args)
            .map_err(|source| BlbError::Encode { operation: OP, source })?;

        let body = transport::call(self.transport.as_ref(), OP, RESOURCE, &args.name, request).await?;
        transport::decode(OP, &body)
    }

    /// List load balancers matching `args`, across all pages.
    pub async fn describe_load_balancers(
        &self,
        args: &DescribeLoadBalancersArgs,
    ) -> BlbResult<Vec<LoadBalancerRecord>> {
        const OP: &str = "DescribeLoadBalancers";
        let target = args
            .blb_id
            .as_deref()
            .or(args.name.as_deref())
            .or(args.address.as_deref())
            .unwrap_or("*")
            .to_string();

        let mut records = Vec::new();
        let mut marker: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut request = ApiRequest::get(BLB_PATH).query("maxKeys", PAGE_SIZE.to_string());
            if let Some(id) = &args.blb_id {
                request = request.query("blbId", id.as_str());
            }
            if let Some(name) = &args.name {
                request = request.query("name", name.as_str());
            }
            if let Some(address) = &args.address {
                request = request.query("address", address.as_str());
            }
            if let Some(m) = &marker {
                request = request.query("marker", m.as_str());
            }

            let body = transport::call(self.transport.as_ref(), OP, RESOURCE, &target, request).await?;
            let page: DescribeLoadBalancersResponse = transport::decode(OP, &body)?;
            records.extend(page.blb_list);

            if !page.is_truncated || page.next_marker.is_empty() {
                return Ok(records);
            }
            marker = Some(page.next_marker);
        }

        // a partial list is not a valid "absent" answer
        tracing::warn!(target = %target, pages = MAX_PAGES, "Load balancer pagination did not terminate");
        Err(BlbError::InvariantViolation {
            operation: OP,
            id: target,
            detail: format!("pagination did not terminate after {} pages", MAX_PAGES),
        })
    }

    /// Fetch a load balancer by identifier. `None` if the provider has no such resource.
    pub async fn get_by_id(&self, id: &str) -> BlbResult<Option<LoadBalancerRecord>> {
        if id.is_empty() {
            return Err(ValidationError::new("DescribeLoadBalancers", "load balancer id is required").into());
        }

        match self
            .describe_load_balancers(&DescribeLoadBalancersArgs::by_id(id))
            .await
        {
            Ok(records) => Ok(records.into_iter().find(|lb| lb.id == id)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Fetch a load balancer by exact name.
    ///
    /// The provider's name filter is a substring match, so results are
    /// filtered locally. Multiple exact matches keep the first one.
    pub async fn get_by_name(&self, name: &str) -> BlbResult<Option<LoadBalancerRecord>> {
        if name.is_empty() {
            return Err(ValidationError::new("DescribeLoadBalancers", "name is required").into());
        }

        let records = match self
            .describe_load_balancers(&DescribeLoadBalancersArgs::by_name(name))
            .await
        {
            Ok(records) => records,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut matches = records.into_iter().filter(|lb| lb.name == name);
        let first = matches.next();
        let extra = matches.count();
        if extra > 0 {
            tracing::warn!(name = %name, duplicates = extra, "Multiple load balancers share a name, using the first");
        }
        Ok(first)
    }

    /// Delete a load balancer. A provider not-found is reported as success.
    pub async fn delete_load_balancer(&self, id: &str) -> BlbResult<()> {
        const OP: &str = "DeleteLoadBalancer";
        if id.is_empty() {
            return Err(ValidationError::new(OP, "load balancer id is required").into());
        }

        let request = ApiRequest::delete(format!("{}/{}", BLB_PATH, id))
            .query(CLIENT_TOKEN_PARAM, self.transport.client_token());

        match transport::call(self.transport.as_ref(), OP, RESOURCE, id, request).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::info!(load_balancer_id = %id, "Load balancer already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for BlbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlbClient").finish_non_exhaustive()
    }
}
