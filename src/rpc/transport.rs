//! HTTP transport to the native backend process.
//!
//! Sends each call as a JSON envelope to the local RPC bridge and returns
//! the raw response body. Payload semantics belong to the callers in
//! `methods`; this layer only moves bytes and normalizes failures.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

/// Upper bound on any single in-flight call. Exceeding it cancels the
/// request and yields [`RpcError::Timeout`].
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error returned by transport operations.
///
/// Timeouts, connection failures and non-2xx statuses all land here in one
/// shape; no retries happen at this layer — retry policy belongs to
/// callers.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("request timed out after {}s", REQUEST_TIMEOUT.as_secs())]
    Timeout,
    #[error("backend returned HTTP {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid endpoint url: {0}")]
    Endpoint(String),
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RpcError::Timeout
        } else {
            RpcError::Network(err.to_string())
        }
    }
}

/// Which sub-endpoint a call is routed through. Queries go through the
/// async route; the injector wants the blocking one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Async,
    Sync,
}

impl Route {
    fn path(&self) -> &'static str {
        match self {
            Route::Async => "rpc",
            Route::Sync => "sync_rpc",
        }
    }
}

/// Transport seam for the RPC bridge. The production implementation is
/// [`HttpTransport`]; tests substitute their own.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Call a backend method and return the raw response body as text.
    async fn call(&self, route: Route, method: &str, params: Value) -> Result<String, RpcError>;
}

/// Production transport: HTTP POST against the local backend endpoint.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RpcError::Endpoint(e.to_string()))?;

        let base_url: String = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn call(&self, route: Route, method: &str, params: Value) -> Result<String, RpcError> {
        let url = format!("{}/{}/{}", self.base_url, route.path(), method);

        let response = self
            .http
            .post(&url)
            .json(&json!({ "params": params }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!(method, status = status.as_u16(), "RPC request failed");
            return Err(RpcError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_map_to_sub_endpoints() {
        assert_eq!(Route::Async.path(), "rpc");
        assert_eq!(Route::Sync.path(), "sync_rpc");
    }

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let transport = HttpTransport::new("http://127.0.0.1:46290/").unwrap();
        assert_eq!(transport.base_url, "http://127.0.0.1:46290");
    }
}
