//! HTTP transport backed by reqwest.
//!
//! # Responsibilities
//! - Resolve the endpoint root from region or explicit override
//! - Attach the pre-computed Authorization header, if configured
//! - Enforce a per-request timeout
//! - Decode provider error bodies into `TransportError::Status`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use url::Url;

use crate::config::CloudConfig;
use crate::transport::{region_endpoint, ApiRequest, Method, Transport, TransportError};

/// Error body returned by the provider on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProviderErrorBody {
    code: String,
    message: String,
    request_id: Option<String>,
}

/// Production transport talking to the provider over HTTP.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    authorization: Option<HeaderValue>,
}

impl HttpTransport {
    /// Create a transport rooted at `base_url`.
    pub fn new(
        base_url: Url,
        timeout: Duration,
        authorization: Option<String>,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("failed to build client: {}", e)))?;

        let authorization = authorization
            .map(|value| {
                HeaderValue::from_str(&value).map_err(|e| {
                    TransportError::InvalidRequest(format!("invalid authorization value: {}", e))
                })
            })
            .transpose()?;

        Ok(Self {
            client,
            base_url: with_trailing_slash(base_url),
            authorization,
        })
    }

    /// Build a transport from the `[cloud]` config section.
    ///
    /// The Authorization value is read from the env var named by
    /// `auth_token_env`; an unset variable means unauthenticated requests.
    pub fn from_config(config: &CloudConfig) -> Result<Self, TransportError> {
        let base_url = endpoint_url(config)?;
        let authorization = config
            .auth_token_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok());

        if authorization.is_none() {
            tracing::warn!("No provider authorization configured, requests will be unsigned");
        }

        Self::new(
            base_url,
            Duration::from_secs(config.request_timeout_secs),
            authorization,
        )
    }

    /// The endpoint root requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn build_url(&self, request: &ApiRequest) -> Result<Url, TransportError> {
        let mut url = self
            .base_url
            .join(&request.path)
            .map_err(|e| TransportError::InvalidRequest(format!("bad path '{}': {}", request.path, e)))?;

        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Vec<u8>, TransportError> {
        let url = self.build_url(&request)?;
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        tracing::debug!(method = request.method.as_str(), url = %url, "Sending provider request");

        let mut builder = self.client.request(method, url);
        if let Some(auth) = &self.authorization {
            builder = builder.header(AUTHORIZATION, auth.clone());
        }
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        if status.is_success() {
            return Ok(body.to_vec());
        }

        let parsed: ProviderErrorBody = serde_json::from_slice(&body).unwrap_or_default();
        let message = if parsed.message.is_empty() {
            String::from_utf8_lossy(&body).into_owned()
        } else {
            parsed.message
        };

        Err(TransportError::Status {
            status: status.as_u16(),
            code: parsed.code,
            message,
            request_id: parsed.request_id,
        })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .field("authorized", &self.authorization.is_some())
            .finish()
    }
}

/// Resolve the endpoint root URL for the configured region.
pub fn endpoint_url(config: &CloudConfig) -> Result<Url, TransportError> {
    let host = match config.endpoint.as_deref() {
        Some(endpoint) if !endpoint.is_empty() => endpoint.to_string(),
        _ => region_endpoint(&config.region)
            .ok_or_else(|| {
                TransportError::InvalidRequest(format!("unknown region '{}'", config.region))
            })?
            .to_string(),
    };

    let raw = if host.contains("://") {
        host
    } else {
        format!("{}://{}", config.scheme, host)
    };

    Url::parse(&raw)
        .map(with_trailing_slash)
        .map_err(|e| TransportError::InvalidRequest(format!("bad endpoint '{}': {}", raw, e)))
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Network(err.to_string())
    }
}
