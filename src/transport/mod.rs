//! Provider transport subsystem.
//!
//! # Data Flow
//! ```text
//! blb / listener clients
//!     → ApiRequest (method, path, query, JSON body)
//!     → Transport::execute (signed HTTP in production, fake in tests)
//!     → raw response body or TransportError
//! ```
//!
//! # Design Decisions
//! - Transport is injected as `Arc<dyn Transport>`; there is no global client
//! - Request signing lives behind the trait, this crate never sees credentials
//! - Idempotency tokens come from the transport so tests can make them stable

pub mod endpoint;
pub mod http;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::error::{BlbError, BlbResult};
use crate::observability::metrics;

pub use endpoint::region_endpoint;
pub use http::HttpTransport;

/// Query parameter carrying the idempotency token on mutating calls.
pub const CLIENT_TOKEN_PARAM: &str = "clientToken";

/// HTTP methods used by the provider API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// A single provider API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the endpoint root, e.g. `v1/blb/lb-1/TCPlistener`.
    pub path: String,
    /// Query parameters in insertion order.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Serialize `body` as the JSON payload.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    /// Look up the first value of a query parameter.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Errors returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The provider answered with a non-success status.
    #[error("HTTP {status} {code}: {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
        request_id: Option<String>,
    },

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("network error: {0}")]
    Network(String),

    /// The request could not be built (bad URL, bad header value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    pub fn is_not_found(&self) -> bool {
        match self {
            TransportError::Status { status, code, .. } => {
                *status == 404 || code == "NoSuchObject"
            }
            _ => false,
        }
    }

    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Status { status, .. } => *status == 429 || *status >= 500,
            TransportError::Timeout | TransportError::Connect(_) | TransportError::Network(_) => {
                true
            }
            TransportError::InvalidRequest(_) => false,
        }
    }
}

/// The consumed `Execute` interface of the provider.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the raw response body.
    async fn execute(&self, request: ApiRequest) -> Result<Vec<u8>, TransportError>;

    /// Generate a fresh idempotency token for a mutating call.
    fn client_token(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Execute `request` and classify any failure for `operation` on `target`.
pub(crate) async fn call(
    transport: &dyn Transport,
    operation: &'static str,
    resource: &'static str,
    target: &str,
    request: ApiRequest,
) -> BlbResult<Vec<u8>> {
    tracing::debug!(operation, target, method = request.method.as_str(), path = %request.path, "Provider call");

    let result = transport.execute(request).await;
    metrics::record_api_call(operation, result.is_ok());

    result.map_err(|source| {
        tracing::warn!(operation, target, error = %source, "Provider call failed");
        BlbError::from_transport(operation, resource, target, source)
    })
}

/// Decode a JSON response body.
pub(crate) fn decode<T: DeserializeOwned>(operation: &'static str, body: &[u8]) -> BlbResult<T> {
    serde_json::from_slice(body).map_err(|source| BlbError::Decode { operation, source })
}
