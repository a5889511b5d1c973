use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde_json::{json, Value};
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use crate::{
    logs::{LogQuery, LogSource, RawLog},
    types::{JsonRpcRequest, JsonRpcResponse},
    upstream::UpstreamError,
    utils::BlockParameter,
};

/// Timeouts for a JSON-RPC or GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self { connect_timeout: Duration::from_secs(5), request_timeout: Duration::from_secs(60) }
    }
}

/// Builds the shared reqwest client used by every upstream.
pub(crate) fn build_client(config: &HttpClientConfig) -> Result<Client, UpstreamError> {
    ClientBuilder::new()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .use_rustls_tls()
        .user_agent(concat!("votecalc/", env!("CARGO_PKG_VERSION")))
        .tcp_nodelay(true)
        .build()
        .map_err(|e| {
            tracing::error!(error = %e, "failed to build http client");
            UpstreamError::ConnectionFailed(format!("HTTP client build failed: {e}"))
        })
}

/// Maps a transport failure to an [`UpstreamError`] without leaking the URL.
pub(crate) fn classify_network_error(error: reqwest::Error) -> UpstreamError {
    if error.is_timeout() {
        UpstreamError::Timeout
    } else if error.is_connect() {
        UpstreamError::ConnectionFailed("connection refused or unreachable".to_string())
    } else {
        UpstreamError::Network(error)
    }
}

/// JSON-RPC client for a single EVM node.
///
/// Requests are issued one at a time by callers; the client keeps no connection state beyond
/// reqwest's pool and a request id counter.
pub struct JsonRpcClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn new(url: impl Into<String>) -> Result<Self, UpstreamError> {
        Self::with_config(url, &HttpClientConfig::default())
    }

    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn with_config(
        url: impl Into<String>,
        config: &HttpClientConfig,
    ) -> Result<Self, UpstreamError> {
        Ok(Self { client: build_client(config)?, url: url.into(), next_id: AtomicU64::new(1) })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends one JSON-RPC call and returns its `result`.
    ///
    /// # Errors
    ///
    /// - [`UpstreamError::HttpError`] for non-success HTTP status codes
    /// - [`UpstreamError::RpcError`] when the response carries an `error` object
    /// - [`UpstreamError::InvalidResponse`] when the body is not a JSON-RPC response
    /// - [`UpstreamError::Timeout`], [`UpstreamError::ConnectionFailed`] or
    ///   [`UpstreamError::Network`] for transport failures
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, UpstreamError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(method, Some(params), json!(id));

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(classify_network_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(method, status = status.as_u16(), "rpc http error");
            return Err(UpstreamError::HttpError(status.as_u16(), body));
        }

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(format!("malformed JSON-RPC body: {e}")))?;

        if let Some(error) = body.error {
            tracing::debug!(method, code = error.code, message = %error.message, "rpc error");
            return Err(UpstreamError::RpcError(error.code, error.message));
        }

        body.result
            .ok_or_else(|| UpstreamError::InvalidResponse("response has neither result nor error".into()))
    }
}

#[async_trait]
impl LogSource for JsonRpcClient {
    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<RawLog>, UpstreamError> {
        let result = self.call("eth_getLogs", json!([query.to_filter()])).await?;
        let entries = result
            .as_array()
            .ok_or_else(|| UpstreamError::InvalidResponse("eth_getLogs result is not an array".into()))?;

        tracing::trace!(
            from_block = query.from_block,
            to_block = query.to_block,
            count = entries.len(),
            "eth_getLogs"
        );
        entries.iter().map(RawLog::from_json).collect()
    }

    async fn block_number(&self) -> Result<u64, UpstreamError> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        BlockParameter::from_json_value(&result)
            .ok_or_else(|| UpstreamError::InvalidResponse(format!("invalid block number: {result}")))
    }
}
