//! In-memory log source with a provider-style block range limit.

use std::sync::Mutex;

use async_trait::async_trait;
use votecalc_core::{
    logs::{LogQuery, LogSource, RawLog},
    upstream::UpstreamError,
};

/// JSON-RPC code most providers use for "block range too large".
pub const RANGE_LIMIT_CODE: i32 = -32602;

/// Serves a fixed set of logs and rejects any query spanning more than `max_blocks` blocks.
///
/// Every query is recorded so tests can assert on the ranges that were actually requested.
pub struct LimitedLogSource {
    logs: Vec<RawLog>,
    max_blocks: u64,
    head: u64,
    failing_block: Option<u64>,
    queries: Mutex<Vec<LogQuery>>,
}

impl LimitedLogSource {
    #[must_use]
    pub fn new(logs: Vec<RawLog>, max_blocks: u64) -> Self {
        let head = logs.iter().map(|log| log.block_number).max().unwrap_or(0);
        Self { logs, max_blocks, head, failing_block: None, queries: Mutex::new(Vec::new()) }
    }

    #[must_use]
    pub fn with_head(mut self, head: u64) -> Self {
        self.head = head;
        self
    }

    /// Any accepted query covering `block` fails with an internal error instead.
    #[must_use]
    pub fn failing_at(mut self, block: u64) -> Self {
        self.failing_block = Some(block);
        self
    }

    /// Ranges requested so far, in request order.
    pub fn requested_ranges(&self) -> Vec<(u64, u64)> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .map(|q| (q.from_block, q.to_block))
            .collect()
    }

    pub fn queries(&self) -> Vec<LogQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogSource for LimitedLogSource {
    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<RawLog>, UpstreamError> {
        self.queries.lock().unwrap().push(query.clone());

        if query.block_count() > self.max_blocks {
            return Err(UpstreamError::RpcError(
                RANGE_LIMIT_CODE,
                format!("block range exceeds {} blocks", self.max_blocks),
            ));
        }
        if let Some(block) = self.failing_block {
            if (query.from_block..=query.to_block).contains(&block) {
                return Err(UpstreamError::RpcError(-32603, "internal error".into()));
            }
        }

        Ok(self.logs.iter().filter(|log| query.matches(log)).cloned().collect())
    }

    async fn block_number(&self) -> Result<u64, UpstreamError> {
        Ok(self.head)
    }
}
