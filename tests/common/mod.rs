//! In-memory provider shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use blb_reconciler::blb::{LoadBalancerRecord, LoadBalancerStatus};
use blb_reconciler::lifecycle::Cancellation;
use blb_reconciler::listener::{ListenerSpec, Protocol};
use blb_reconciler::transport::{ApiRequest, Method, Transport, TransportError};

/// A fake provider that implements the load-balancer and listener APIs
/// against in-memory state and records every request it receives.
#[derive(Default)]
pub struct FakeCloud {
    state: Mutex<State>,
    tokens: AtomicU64,
}

#[derive(Default)]
struct State {
    load_balancers: BTreeMap<String, LoadBalancerRecord>,
    /// Remaining lookups that will not see a load balancer yet.
    hidden: BTreeMap<String, u32>,
    /// (load balancer id, protocol) → port → wire body.
    listeners: BTreeMap<(String, Protocol), BTreeMap<u16, Map<String, Value>>>,
    calls: Vec<ApiRequest>,
    failures: Vec<(Method, String, TransportError)>,
    next_id: u32,
    hide_new_for: u32,
    empty_create_id: bool,
    create_delay: Option<Duration>,
    listener_page_size: Option<usize>,
    /// Every list call answers "truncated" with the same marker.
    endless_pages: bool,
    /// Cancel once this many mutating calls have succeeded.
    cancel_after: Option<(usize, Arc<Cancellation>)>,
}

impl FakeCloud {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_load_balancer(&self, id: &str, name: &str) -> LoadBalancerRecord {
        let record = LoadBalancerRecord {
            id: id.to_string(),
            name: name.to_string(),
            address: "10.0.0.100".to_string(),
            status: LoadBalancerStatus::Available,
            desc: String::new(),
            vpc_id: Some("vpc-1".to_string()),
            public_ip: None,
        };
        self.lock().load_balancers.insert(id.to_string(), record.clone());
        record
    }

    pub fn add_listener(&self, load_balancer_id: &str, spec: &ListenerSpec) {
        self.lock()
            .listeners
            .entry((load_balancer_id.to_string(), spec.protocol()))
            .or_default()
            .insert(spec.listener_port, spec.wire_body(true));
    }

    /// New load balancers stay invisible to the next `lookups` describes.
    pub fn hide_new_load_balancers_for(&self, lookups: u32) {
        self.lock().hide_new_for = lookups;
    }

    /// Creation succeeds but reports an empty identifier.
    pub fn return_empty_id(&self) {
        self.lock().empty_create_id = true;
    }

    pub fn delay_creation(&self, delay: Duration) {
        self.lock().create_delay = Some(delay);
    }

    pub fn set_listener_page_size(&self, size: usize) {
        self.lock().listener_page_size = Some(size);
    }

    pub fn repeat_pagination_marker(&self) {
        self.lock().endless_pages = true;
    }

    pub fn cancel_after_mutations(&self, mutations: usize, cancellation: Arc<Cancellation>) {
        self.lock().cancel_after = Some((mutations, cancellation));
    }

    /// Fail the next request matching `method` and `path`.
    pub fn fail_next(&self, method: Method, path: &str, error: TransportError) {
        self.lock().failures.push((method, path.to_string(), error));
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.lock().calls.clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    /// Requests other than GET.
    pub fn mutating_calls(&self) -> Vec<ApiRequest> {
        self.calls()
            .into_iter()
            .filter(|c| c.method != Method::Get)
            .collect()
    }

    pub fn load_balancer_ids(&self) -> Vec<String> {
        self.lock().load_balancers.keys().cloned().collect()
    }

    /// Ports currently configured on a load balancer, with their protocol.
    pub fn listener_ports(&self, load_balancer_id: &str) -> BTreeMap<u16, Protocol> {
        let state = self.lock();
        let mut ports = BTreeMap::new();
        for ((lb, protocol), listeners) in &state.listeners {
            if lb == load_balancer_id {
                for port in listeners.keys() {
                    ports.insert(*port, *protocol);
                }
            }
        }
        ports
    }

    pub fn listener_body(&self, load_balancer_id: &str, protocol: Protocol, port: u16) -> Option<Map<String, Value>> {
        self.lock()
            .listeners
            .get(&(load_balancer_id.to_string(), protocol))
            .and_then(|l| l.get(&port).cloned())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn handle(&self, request: &ApiRequest) -> Result<Value, TransportError> {
        let mut state = self.lock();

        let segments: Vec<&str> = request.path.split('/').collect();
        match (request.method, segments.as_slice()) {
            (Method::Get, ["v1", "blb"]) => Ok(state.describe_load_balancers(request)),
            (Method::Post, ["v1", "blb"]) => state.create_load_balancer(request),
            (Method::Delete, ["v1", "blb", id]) => state
                .load_balancers
                .remove(*id)
                .map(|_| json!({}))
                .ok_or_else(|| not_found(id)),
            (Method::Put, ["v1", "blb", id, "listener"]) if request.query_value("batchdelete").is_some() => {
                state.batch_delete(id, request)
            }
            (method, ["v1", "blb", id, segment]) => {
                let protocol = Protocol::ALL
                    .into_iter()
                    .find(|p| p.path_segment() == *segment)
                    .ok_or_else(|| bad_request("unknown resource"))?;
                if !state.load_balancers.contains_key(*id) {
                    return Err(not_found(id));
                }
                match method {
                    Method::Post => state.create_listener(id, protocol, request),
                    Method::Get => Ok(state.describe_listeners(id, protocol, request)),
                    Method::Put => state.update_listener(id, protocol, request),
                    Method::Delete => Err(bad_request("unsupported")),
                }
            }
            _ => Err(bad_request("unknown resource")),
        }
    }
}

#[async_trait]
impl Transport for FakeCloud {
    async fn execute(&self, request: ApiRequest) -> Result<Vec<u8>, TransportError> {
        let delay = {
            let mut state = self.lock();
            state.calls.push(request.clone());

            if let Some(idx) = state
                .failures
                .iter()
                .position(|(m, p, _)| *m == request.method && *p == request.path)
            {
                let (_, _, error) = state.failures.remove(idx);
                return Err(error);
            }

            if state.endless_pages && request.method == Method::Get {
                let page = json!({
                    "blbList": [],
                    "listenerList": [],
                    "isTruncated": true,
                    "nextMarker": "m",
                });
                return Ok(serde_json::to_vec(&page).unwrap());
            }

            match (request.method, request.path.as_str()) {
                (Method::Post, "v1/blb") => state.create_delay,
                _ => None,
            }
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let value = self.handle(&request)?;

        if request.method != Method::Get {
            let mut state = self.lock();
            if let Some((remaining, cancellation)) = state.cancel_after.as_mut() {
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    cancellation.cancel();
                }
            }
        }

        Ok(serde_json::to_vec(&value).unwrap())
    }

    fn client_token(&self) -> String {
        format!("token-{}", self.tokens.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

impl State {
    fn describe_load_balancers(&mut self, request: &ApiRequest) -> Value {
        let by_id = request.query_value("blbId").map(str::to_string);
        let by_name = request.query_value("name").map(str::to_string);

        let mut list = Vec::new();
        for (id, record) in &self.load_balancers {
            if by_id.as_ref().is_some_and(|want| want != id) {
                continue;
            }
            if by_name.as_ref().is_some_and(|want| !record.name.contains(want.as_str())) {
                continue;
            }
            if let Some(remaining) = self.hidden.get_mut(id) {
                if *remaining > 0 {
                    *remaining -= 1;
                    continue;
                }
            }
            list.push(record.clone());
        }

        json!({ "blbList": list, "isTruncated": false, "nextMarker": "", "marker": "" })
    }

    fn create_load_balancer(&mut self, request: &ApiRequest) -> Result<Value, TransportError> {
        let body = body_of(request)?;
        let name = body["name"].as_str().unwrap_or_default().to_string();

        if self.empty_create_id {
            return Ok(json!({ "blbId": "", "name": name }));
        }

        self.next_id += 1;
        let id = format!("lb-{:04}", self.next_id);
        let record = LoadBalancerRecord {
            id: id.clone(),
            name: name.clone(),
            address: format!("10.0.1.{}", self.next_id),
            status: LoadBalancerStatus::Available,
            desc: body["desc"].as_str().unwrap_or_default().to_string(),
            vpc_id: body["vpcId"].as_str().map(str::to_string),
            public_ip: None,
        };
        self.load_balancers.insert(id.clone(), record.clone());
        if self.hide_new_for > 0 {
            self.hidden.insert(id.clone(), self.hide_new_for);
        }

        Ok(json!({ "blbId": id, "name": name, "address": record.address, "desc": record.desc }))
    }

    fn create_listener(&mut self, id: &str, protocol: Protocol, request: &ApiRequest) -> Result<Value, TransportError> {
        let body = body_of(request)?;
        let port = body["listenerPort"]
            .as_u64()
            .ok_or_else(|| bad_request("listenerPort required"))? as u16;

        let taken = self
            .listeners
            .iter()
            .any(|((lb, _), l)| lb == id && l.contains_key(&port));
        if taken {
            return Err(TransportError::Status {
                status: 400,
                code: "DuplicateListener".to_string(),
                message: format!("port {} in use", port),
                request_id: None,
            });
        }

        let map = body.as_object().cloned().unwrap_or_default();
        self.listeners
            .entry((id.to_string(), protocol))
            .or_default()
            .insert(port, map);
        Ok(json!({}))
    }

    fn describe_listeners(&self, id: &str, protocol: Protocol, request: &ApiRequest) -> Value {
        let port = request.query_value("listenerPort").and_then(|p| p.parse::<u16>().ok());
        let all: Vec<Value> = self
            .listeners
            .get(&(id.to_string(), protocol))
            .map(|l| {
                l.iter()
                    .filter(|(p, _)| port.map_or(true, |want| **p == want))
                    .map(|(_, body)| Value::Object(body.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let start: usize = request
            .query_value("marker")
            .and_then(|m| m.parse().ok())
            .unwrap_or(0);
        let size = self.listener_page_size.unwrap_or(usize::MAX);
        let end = start.saturating_add(size).min(all.len());
        let truncated = end < all.len();

        let page = all[start..end].to_vec();

        json!({
            "listenerList": page,
            "marker": start.to_string(),
            "isTruncated": truncated,
            "nextMarker": if truncated { end.to_string() } else { String::new() },
            "maxKeys": 1000,
        })
    }

    fn update_listener(&mut self, id: &str, protocol: Protocol, request: &ApiRequest) -> Result<Value, TransportError> {
        let port: u16 = request
            .query_value("listenerPort")
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| bad_request("listenerPort required"))?;
        let body = body_of(request)?;

        let existing = self
            .listeners
            .get_mut(&(id.to_string(), protocol))
            .and_then(|l| l.get_mut(&port))
            .ok_or_else(|| not_found(&format!("{}:{}", id, port)))?;
        if let Value::Object(fields) = body {
            existing.extend(fields);
        }
        Ok(json!({}))
    }

    fn batch_delete(&mut self, id: &str, request: &ApiRequest) -> Result<Value, TransportError> {
        if !self.load_balancers.contains_key(id) {
            return Err(not_found(id));
        }
        let body = body_of(request)?;
        let ports: Vec<u16> = serde_json::from_value(body["portList"].clone())
            .map_err(|_| bad_request("portList required"))?;

        for ((lb, _), listeners) in self.listeners.iter_mut() {
            if lb == id {
                for port in &ports {
                    listeners.remove(port);
                }
            }
        }
        Ok(json!({}))
    }
}

fn body_of(request: &ApiRequest) -> Result<Value, TransportError> {
    let bytes = request.body.as_deref().ok_or_else(|| bad_request("body required"))?;
    serde_json::from_slice(bytes).map_err(|_| bad_request("malformed body"))
}

fn not_found(what: &str) -> TransportError {
    TransportError::Status {
        status: 404,
        code: "NoSuchObject".to_string(),
        message: format!("{} does not exist", what),
        request_id: Some("req-fake".to_string()),
    }
}

fn bad_request(message: &str) -> TransportError {
    TransportError::Status {
        status: 400,
        code: "BadRequest".to_string(),
        message: message.to_string(),
        request_id: None,
    }
}

/// Body of a recorded request as JSON.
pub fn json_body(request: &ApiRequest) -> Value {
    request
        .body
        .as_deref()
        .map(|b| serde_json::from_slice(b).unwrap())
        .unwrap_or(Value::Null)
}
