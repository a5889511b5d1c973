use async_trait::async_trait;
use std::sync::Arc;

use super::types::{LogQuery, RawLog};
use crate::upstream::UpstreamError;

/// A block-oriented log provider.
///
/// Implementations must report provider range/size rejections as errors for which
/// [`UpstreamError::is_range_limit`] returns `true`; the range fetcher relies on that to tell
/// recoverable rejections apart from fatal failures.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Returns every log matching `query`, in provider order.
    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<RawLog>, UpstreamError>;

    /// Returns the current chain head.
    async fn block_number(&self) -> Result<u64, UpstreamError>;
}

#[async_trait]
impl<T: LogSource + ?Sized> LogSource for Arc<T> {
    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<RawLog>, UpstreamError> {
        (**self).get_logs(query).await
    }

    async fn block_number(&self) -> Result<u64, UpstreamError> {
        (**self).block_number().await
    }
}
