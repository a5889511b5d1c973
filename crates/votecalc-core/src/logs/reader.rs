use tracing::{debug, info, warn};

use super::{
    errors::FetchError,
    fetcher::RangeFetcher,
    source::LogSource,
    types::RawLog,
};

/// Providers accept at most four alternatives in one topic position.
pub const MAX_TOPICS_PER_QUERY: usize = 4;

/// Window size used when neither chain nor configuration says otherwise.
pub const DEFAULT_BLOCK_SPAN: u64 = 2000;

/// Window size for chains with short block times (OP Mainnet and OP Sepolia).
pub const FAST_CHAIN_BLOCK_SPAN: u64 = 12_000;

const FAST_CHAINS: [u64; 2] = [10, 11_155_420];

/// Picks the block window size.
///
/// An explicit override always wins; otherwise the span depends on the chain.
///
/// ```
/// use votecalc_core::logs::resolve_block_span;
///
/// assert_eq!(resolve_block_span(Some(10), None), 12_000);
/// assert_eq!(resolve_block_span(Some(1), None), 2000);
/// assert_eq!(resolve_block_span(Some(10), Some(500)), 500);
/// ```
#[must_use]
pub fn resolve_block_span(chain_id: Option<u64>, override_span: Option<u64>) -> u64 {
    if let Some(span) = override_span.filter(|s| *s > 0) {
        return span;
    }
    match chain_id {
        Some(id) if FAST_CHAINS.contains(&id) => FAST_CHAIN_BLOCK_SPAN,
        _ => DEFAULT_BLOCK_SPAN,
    }
}

/// A contract and the event selectors wanted from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSubscription {
    pub address: String,
    pub topics: Vec<String>,
}

impl LogSubscription {
    #[must_use]
    pub fn new(address: impl Into<String>, topics: Vec<String>) -> Self {
        Self { address: address.into(), topics }
    }
}

/// Sorts logs into canonical chain order by numeric `(block, tx index, log index)`.
///
/// The sort is stable, so duplicates keep their fetch order.
pub fn sort_logs(logs: &mut [RawLog]) {
    logs.sort_by_key(RawLog::position);
}

/// Walks a block span in fixed windows and topic groups, fetching each piece through a
/// [`RangeFetcher`] and returning every log in canonical order.
pub struct PaginatedLogReader<'a, S: ?Sized> {
    fetcher: RangeFetcher<'a, S>,
    step: u64,
    topic_chunk_size: usize,
}

impl<'a, S: LogSource + ?Sized> PaginatedLogReader<'a, S> {
    /// A step of zero is treated as one.
    #[must_use]
    pub fn new(source: &'a S, step: u64) -> Self {
        Self {
            fetcher: RangeFetcher::new(source),
            step: step.max(1),
            topic_chunk_size: MAX_TOPICS_PER_QUERY,
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.fetcher = self.fetcher.with_max_depth(max_depth);
        self
    }

    /// Sets the topic group size, clamped to `1..=4`.
    #[must_use]
    pub fn with_topic_chunk_size(mut self, size: usize) -> Self {
        self.topic_chunk_size = size.clamp(1, MAX_TOPICS_PER_QUERY);
        self
    }

    #[must_use]
    pub fn step(&self) -> u64 {
        self.step
    }

    #[must_use]
    pub fn topic_chunk_size(&self) -> usize {
        self.topic_chunk_size
    }

    /// Reads every subscribed log in `[from_block, to_block]`.
    ///
    /// When `to_block` is `None` the source's current head is used. A start beyond the end
    /// yields no logs. A subscription with no topics matches every log of its contract.
    ///
    /// # Errors
    /// Any [`FetchError`] from head resolution or from a window fetch aborts the read.
    pub async fn read(
        &self,
        subscriptions: &[LogSubscription],
        from_block: u64,
        to_block: Option<u64>,
    ) -> Result<Vec<RawLog>, FetchError> {
        let end = match to_block {
            Some(block) => block,
            None => self.fetcher.source().block_number().await?,
        };

        if from_block > end {
            warn!(from_block, to_block = end, "start block is past end block, nothing to read");
            return Ok(Vec::new());
        }

        let mut logs = Vec::new();
        for subscription in subscriptions {
            self.read_subscription(subscription, from_block, end, &mut logs).await?;
        }

        sort_logs(&mut logs);
        info!(count = logs.len(), from_block, to_block = end, "log read complete");
        Ok(logs)
    }

    async fn read_subscription(
        &self,
        subscription: &LogSubscription,
        from_block: u64,
        end: u64,
        out: &mut Vec<RawLog>,
    ) -> Result<(), FetchError> {
        let groups: Vec<&[String]> = if subscription.topics.is_empty() {
            vec![subscription.topics.as_slice()]
        } else {
            subscription.topics.chunks(self.topic_chunk_size).collect()
        };

        info!(
            address = %subscription.address,
            topic_groups = groups.len(),
            from_block,
            to_block = end,
            "reading logs"
        );

        let mut window_start = from_block;
        loop {
            let window_end = window_start.saturating_add(self.step - 1).min(end);
            let mut window_count = 0usize;

            for group in &groups {
                let batch = self
                    .fetcher
                    .fetch(&subscription.address, group, window_start, window_end)
                    .await?;
                window_count += batch.len();
                out.extend(batch);
            }

            if window_count > 0 {
                debug!(
                    address = %subscription.address,
                    from_block = window_start,
                    to_block = window_end,
                    count = window_count,
                    "window fetched"
                );
            }

            if window_end >= end {
                break;
            }
            window_start = window_end + 1;
        }

        Ok(())
    }
}
