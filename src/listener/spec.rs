//! Listener specifications.
//!
//! A listener is a closed sum type: the fields every protocol shares live on
//! [`ListenerSpec`], the protocol-specific payload on [`ProtocolSpec`].
//! Optional fields are `Option`s so that "unset" and "explicitly zero" stay
//! distinct; unset fields are left out of the wire payload.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Listener protocol family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "UDP")]
    Udp,
    #[serde(rename = "HTTP")]
    Http,
    #[serde(rename = "HTTPS")]
    Https,
}

impl Protocol {
    pub const ALL: [Protocol; 4] = [Protocol::Tcp, Protocol::Udp, Protocol::Http, Protocol::Https];

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Http => "HTTP",
            Protocol::Https => "HTTPS",
        }
    }

    /// Path segment under the load balancer, e.g. `TCPlistener`.
    pub fn path_segment(&self) -> String {
        format!("{}listener", self.as_str())
    }

    pub(crate) fn create_op(&self) -> &'static str {
        match self {
            Protocol::Tcp => "CreateTCPListener",
            Protocol::Udp => "CreateUDPListener",
            Protocol::Http => "CreateHTTPListener",
            Protocol::Https => "CreateHTTPSListener",
        }
    }

    pub(crate) fn update_op(&self) -> &'static str {
        match self {
            Protocol::Tcp => "UpdateTCPListener",
            Protocol::Udp => "UpdateUDPListener",
            Protocol::Http => "UpdateHTTPListener",
            Protocol::Https => "UpdateHTTPSListener",
        }
    }

    pub(crate) fn describe_op(&self) -> &'static str {
        match self {
            Protocol::Tcp => "DescribeTCPListeners",
            Protocol::Udp => "DescribeUDPListeners",
            Protocol::Http => "DescribeHTTPListeners",
            Protocol::Https => "DescribeHTTPSListeners",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend selection algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scheduler {
    RoundRobin,
    LeastConnection,
    Hash,
}

impl Scheduler {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheduler::RoundRobin => "RoundRobin",
            Scheduler::LeastConnection => "LeastConnection",
            Scheduler::Hash => "Hash",
        }
    }
}

impl FromStr for Scheduler {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RoundRobin" => Ok(Scheduler::RoundRobin),
            "LeastConnection" => Ok(Scheduler::LeastConnection),
            "Hash" => Ok(Scheduler::Hash),
            other => Err(format!("unknown scheduler '{}'", other)),
        }
    }
}

/// Health-check policy shared by all protocols.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_timeout_in_second: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unhealthy_threshold: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthy_threshold: Option<u32>,
}

/// Session affinity and HTTP health-check settings for HTTP and HTTPS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_session: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_session_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_session_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_session_cookie_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_forward_for: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_normal_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_timeout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_port: Option<u16>,
}

/// HTTPS adds certificates on top of the HTTP options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpsOptions {
    #[serde(flatten)]
    pub http: HttpOptions,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cert_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ie6_compatible: Option<bool>,
}

/// Protocol-specific listener payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol")]
pub enum ProtocolSpec {
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "UDP")]
    Udp {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        health_check_string: Option<String>,
    },
    #[serde(rename = "HTTP")]
    Http(HttpOptions),
    #[serde(rename = "HTTPS")]
    Https(HttpsOptions),
}

impl ProtocolSpec {
    pub fn protocol(&self) -> Protocol {
        match self {
            ProtocolSpec::Tcp => Protocol::Tcp,
            ProtocolSpec::Udp { .. } => Protocol::Udp,
            ProtocolSpec::Http(_) => Protocol::Http,
            ProtocolSpec::Https(_) => Protocol::Https,
        }
    }
}

/// Desired or observed state of one listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerSpec {
    /// Identifies the listener within its load balancer; immutable.
    pub listener_port: u16,
    /// 0 means unset.
    #[serde(default)]
    pub backend_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<Scheduler>,
    #[serde(flatten)]
    pub health_check: HealthCheck,
    #[serde(flatten)]
    pub protocol: ProtocolSpec,
}

impl ListenerSpec {
    pub fn tcp(listener_port: u16, backend_port: u16, scheduler: Scheduler) -> Self {
        Self::new(listener_port, backend_port, scheduler, ProtocolSpec::Tcp)
    }

    pub fn udp(
        listener_port: u16,
        backend_port: u16,
        scheduler: Scheduler,
        health_check_string: impl Into<String>,
    ) -> Self {
        Self::new(
            listener_port,
            backend_port,
            scheduler,
            ProtocolSpec::Udp {
                health_check_string: Some(health_check_string.into()),
            },
        )
    }

    pub fn http(listener_port: u16, backend_port: u16, scheduler: Scheduler) -> Self {
        Self::new(
            listener_port,
            backend_port,
            scheduler,
            ProtocolSpec::Http(HttpOptions::default()),
        )
    }

    pub fn https(
        listener_port: u16,
        backend_port: u16,
        scheduler: Scheduler,
        cert_ids: Vec<String>,
    ) -> Self {
        Self::new(
            listener_port,
            backend_port,
            scheduler,
            ProtocolSpec::Https(HttpsOptions {
                cert_ids,
                ..HttpsOptions::default()
            }),
        )
    }

    fn new(listener_port: u16, backend_port: u16, scheduler: Scheduler, protocol: ProtocolSpec) -> Self {
        Self {
            listener_port,
            backend_port,
            scheduler: Some(scheduler),
            health_check: HealthCheck::default(),
            protocol,
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol.protocol()
    }

    /// Whether an observed listener already has everything this spec asks for.
    ///
    /// Fields left unset here accept any provider value.
    pub fn is_satisfied_by(&self, current: &ListenerSpec) -> bool {
        if self.listener_port != current.listener_port || self.protocol() != current.protocol() {
            return false;
        }
        if self.backend_port != 0 && self.backend_port != current.backend_port {
            return false;
        }
        if !wanted(&self.scheduler, &current.scheduler) {
            return false;
        }
        if !self.health_check.is_satisfied_by(&current.health_check) {
            return false;
        }

        match (&self.protocol, &current.protocol) {
            (ProtocolSpec::Tcp, ProtocolSpec::Tcp) => true,
            (
                ProtocolSpec::Udp { health_check_string: want },
                ProtocolSpec::Udp { health_check_string: have },
            ) => wanted(want, have),
            (ProtocolSpec::Http(want), ProtocolSpec::Http(have)) => want.is_satisfied_by(have),
            (ProtocolSpec::Https(want), ProtocolSpec::Https(have)) => {
                if !want.http.is_satisfied_by(&have.http) || !wanted(&want.ie6_compatible, &have.ie6_compatible) {
                    return false;
                }
                if want.cert_ids.is_empty() {
                    return true;
                }
                let mut a = want.cert_ids.clone();
                let mut b = have.cert_ids.clone();
                a.sort();
                b.sort();
                a == b
            }
            _ => false,
        }
    }

    /// Flat wire payload. `listenerPort` is omitted for updates, where the
    /// port travels in the query string.
    pub fn wire_body(&self, include_listener_port: bool) -> Map<String, Value> {
        let mut body = Map::new();
        if include_listener_port {
            body.insert("listenerPort".into(), self.listener_port.into());
        }
        if self.backend_port != 0 {
            body.insert("backendPort".into(), self.backend_port.into());
        }
        put(&mut body, "scheduler", self.scheduler.map(|s| s.as_str()));

        let hc = &self.health_check;
        put(&mut body, "healthCheckTimeoutInSecond", hc.health_check_timeout_in_second);
        put(&mut body, "healthCheckInterval", hc.health_check_interval);
        put(&mut body, "unhealthyThreshold", hc.unhealthy_threshold);
        put(&mut body, "healthyThreshold", hc.healthy_threshold);

        match &self.protocol {
            ProtocolSpec::Tcp => {}
            ProtocolSpec::Udp { health_check_string } => {
                put(&mut body, "healthCheckString", health_check_string.clone());
            }
            ProtocolSpec::Http(http) => http.write_wire(&mut body),
            ProtocolSpec::Https(https) => {
                https.http.write_wire(&mut body);
                if !https.cert_ids.is_empty() {
                    body.insert("certIds".into(), https.cert_ids.clone().into());
                }
                put(&mut body, "ie6Compatible", https.ie6_compatible);
            }
        }
        body
    }
}

impl HealthCheck {
    fn is_satisfied_by(&self, current: &HealthCheck) -> bool {
        wanted(&self.health_check_timeout_in_second, &current.health_check_timeout_in_second)
            && wanted(&self.health_check_interval, &current.health_check_interval)
            && wanted(&self.unhealthy_threshold, &current.unhealthy_threshold)
            && wanted(&self.healthy_threshold, &current.healthy_threshold)
    }
}

impl HttpOptions {
    fn is_satisfied_by(&self, current: &HttpOptions) -> bool {
        wanted(&self.keep_session, &current.keep_session)
            && wanted(&self.keep_session_type, &current.keep_session_type)
            && wanted(&self.keep_session_duration, &current.keep_session_duration)
            && wanted(&self.keep_session_cookie_name, &current.keep_session_cookie_name)
            && wanted(&self.x_forward_for, &current.x_forward_for)
            && wanted(&self.health_check_type, &current.health_check_type)
            && wanted(&self.health_check_port, &current.health_check_port)
            && wanted(&self.health_check_uri, &current.health_check_uri)
            && wanted(&self.health_check_host, &current.health_check_host)
            && wanted(&self.health_check_normal_status, &current.health_check_normal_status)
            && wanted(&self.server_timeout, &current.server_timeout)
            && wanted(&self.redirect_port, &current.redirect_port)
    }

    fn write_wire(&self, body: &mut Map<String, Value>) {
        put(body, "keepSession", self.keep_session);
        put(body, "keepSessionType", self.keep_session_type.clone());
        put(body, "keepSessionDuration", self.keep_session_duration);
        put(body, "keepSessionCookieName", self.keep_session_cookie_name.clone());
        put(body, "xForwardFor", self.x_forward_for);
        put(body, "healthCheckType", self.health_check_type.clone());
        put(body, "healthCheckPort", self.health_check_port);
        put(body, "healthCheckURI", self.health_check_uri.clone());
        put(body, "healthCheckHost", self.health_check_host.clone());
        put(body, "healthCheckNormalStatus", self.health_check_normal_status.clone());
        put(body, "serverTimeout", self.server_timeout);
        put(body, "redirectPort", self.redirect_port);
    }
}

fn wanted<T: PartialEq>(desired: &Option<T>, current: &Option<T>) -> bool {
    desired.is_none() || desired == current
}

fn put<T: Into<Value>>(body: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(v) = value {
        body.insert(key.to_string(), v.into());
    }
}

/// A listener entry as returned by the describe calls.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct WireListener {
    listener_port: u16,
    backend_port: u16,
    scheduler: Option<String>,
    health_check_timeout_in_second: Option<u32>,
    health_check_interval: Option<u32>,
    unhealthy_threshold: Option<u32>,
    healthy_threshold: Option<u32>,
    health_check_string: Option<String>,
    keep_session: Option<bool>,
    keep_session_type: Option<String>,
    keep_session_duration: Option<u32>,
    // some regions report this as a number
    keep_session_cookie_name: Option<Value>,
    x_forward_for: Option<bool>,
    health_check_type: Option<String>,
    health_check_port: Option<u16>,
    #[serde(rename = "healthCheckURI")]
    health_check_uri: Option<String>,
    health_check_host: Option<String>,
    health_check_normal_status: Option<String>,
    server_timeout: Option<u32>,
    redirect_port: Option<u16>,
    cert_ids: Vec<String>,
    ie6_compatible: Option<bool>,
}

impl WireListener {
    pub(crate) fn into_spec(self, protocol: Protocol) -> ListenerSpec {
        let scheduler = self.scheduler.as_deref().and_then(|s| match s.parse() {
            Ok(scheduler) => Some(scheduler),
            Err(e) => {
                tracing::warn!(port = self.listener_port, error = %e, "Ignoring listener scheduler");
                None
            }
        });

        let http = HttpOptions {
            keep_session: self.keep_session,
            keep_session_type: self.keep_session_type,
            keep_session_duration: self.keep_session_duration,
            keep_session_cookie_name: self.keep_session_cookie_name.and_then(|v| match v {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
            x_forward_for: self.x_forward_for,
            health_check_type: self.health_check_type,
            health_check_port: self.health_check_port,
            health_check_uri: self.health_check_uri,
            health_check_host: self.health_check_host,
            health_check_normal_status: self.health_check_normal_status,
            server_timeout: self.server_timeout,
            redirect_port: self.redirect_port,
        };

        let protocol = match protocol {
            Protocol::Tcp => ProtocolSpec::Tcp,
            Protocol::Udp => ProtocolSpec::Udp {
                health_check_string: self.health_check_string,
            },
            Protocol::Http => ProtocolSpec::Http(http),
            Protocol::Https => ProtocolSpec::Https(HttpsOptions {
                http,
                cert_ids: self.cert_ids,
                ie6_compatible: self.ie6_compatible,
            }),
        };

        ListenerSpec {
            listener_port: self.listener_port,
            backend_port: self.backend_port,
            scheduler,
            health_check: HealthCheck {
                health_check_timeout_in_second: self.health_check_timeout_in_second,
                health_check_interval: self.health_check_interval,
                unhealthy_threshold: self.unhealthy_threshold,
                healthy_threshold: self.healthy_threshold,
            },
            protocol,
        }
    }
}

/// One page of a describe-listeners call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct DescribeListenersResponse {
    pub listener_list: Vec<WireListener>,
    pub marker: String,
    pub is_truncated: bool,
    pub next_marker: String,
    pub max_keys: u32,
}
