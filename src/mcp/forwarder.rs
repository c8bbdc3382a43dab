//! Relays authorized tool calls to the upstream rendering API.
//!
//! One `tools/call` produces exactly one HTTP POST of the client's envelope,
//! authenticated with a bearer token. There are no retries; a failed round
//! trip is reported to the client immediately.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;

use crate::error::UpstreamError;

/// The network operations the gateway performs.
#[async_trait]
pub trait Upstream: Send + Sync + 'static {
    /// Posts a JSON-RPC envelope and returns the parsed JSON-RPC response.
    async fn call(&self, envelope: &Value, token: &str) -> Result<Value, UpstreamError>;

    /// Downloads a rendered artifact.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, UpstreamError>;
}

/// [`Upstream`] backed by a `reqwest` client and one fixed endpoint.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
    endpoint: String,
}

impl HttpUpstream {
    /// Creates an upstream posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// The configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn headers(token: &str) -> Result<HeaderMap, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| UpstreamError::Request("invalid API token header value".to_string()))?;
        headers.insert(AUTHORIZATION, auth);
        Ok(headers)
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn call(&self, envelope: &Value, token: &str) -> Result<Value, UpstreamError> {
        let body = serde_json::to_vec(envelope)
            .map_err(|e| UpstreamError::Request(format!("cannot encode request: {e}")))?;

        let response = self
            .client
            .post(&self.endpoint)
            .headers(Self::headers(token)?)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(response.json::<Value>().await?)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, UpstreamError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: String::new(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
