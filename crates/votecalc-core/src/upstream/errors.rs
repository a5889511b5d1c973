use thiserror::Error;

/// Classification of JSON-RPC errors returned by a log provider.
///
/// Only [`RpcErrorCategory::RangeLimit`] is recoverable: the range fetcher bisects the block
/// range and tries again. Every other category is fatal to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcErrorCategory {
    /// The provider refused the request as invalid or oversized (-32600, -32602).
    /// Providers use these codes for block-range and result-size limits they do not publish.
    RangeLimit,
    /// Rate limiting at JSON-RPC level (-32005).
    RateLimit,
    /// Method not found.
    ClientError,
    /// Internal error or anything in the server error range.
    ProviderError,
    /// Parse error from upstream.
    ParseError,
}

impl RpcErrorCategory {
    /// Classifies a JSON-RPC error code.
    ///
    /// - -32700: Parse error
    /// - -32600: Invalid Request (range/response too large on most providers)
    /// - -32601: Method not found
    /// - -32602: Invalid params (block range too wide on most providers)
    /// - -32603: Internal error
    /// - -32005: Limit exceeded
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        match code {
            -32700 => Self::ParseError,
            -32600 | -32602 => Self::RangeLimit,
            -32601 => Self::ClientError,
            -32005 => Self::RateLimit,
            _ => Self::ProviderError,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RangeLimit => "range_limit",
            Self::RateLimit => "rate_limit",
            Self::ClientError => "client_error",
            Self::ProviderError => "provider_error",
            Self::ParseError => "parse_error",
        }
    }
}

/// Errors that can occur when talking to a JSON-RPC or GraphQL upstream.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UpstreamError {
    /// Request exceeded the configured timeout duration.
    #[error("Request timeout")]
    Timeout,

    /// Failed to establish a connection to the upstream endpoint.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// HTTP-level error occurred (non-2xx status code).
    #[error("HTTP error {0}: {1}")]
    HttpError(u16, String),

    /// JSON-RPC error returned by the upstream provider.
    #[error("RPC error {0}: {1}")]
    RpcError(i32, String),

    /// GraphQL `errors` array returned by an attestation indexer.
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// Network-level error from the underlying HTTP client.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response could not be parsed or was malformed.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl UpstreamError {
    /// Returns the RPC error category if this is an RPC error.
    #[must_use]
    pub fn rpc_category(&self) -> Option<RpcErrorCategory> {
        match self {
            Self::RpcError(code, _) => Some(RpcErrorCategory::from_code(*code)),
            _ => None,
        }
    }

    /// Returns `true` if the provider rejected the request because the range or response was
    /// too large.
    ///
    /// HTTP 413 is treated the same way: some gateways reject oversized responses before the
    /// node produces a JSON-RPC error.
    #[must_use]
    pub fn is_range_limit(&self) -> bool {
        match self {
            Self::RpcError(..) => self.rpc_category() == Some(RpcErrorCategory::RangeLimit),
            Self::HttpError(status, _) => *status == 413,
            _ => false,
        }
    }
}
