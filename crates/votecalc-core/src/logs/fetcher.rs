use tracing::{debug, error};

use super::{
    errors::FetchError,
    source::LogSource,
    types::{LogQuery, RawLog},
};

/// Default bound on how many times a single window may be bisected.
///
/// 64 halvings exhaust any `u64` range, so the default only trips on a provider that keeps
/// rejecting ranges it has already been asked about.
pub const DEFAULT_MAX_SPLIT_DEPTH: u32 = 64;

#[derive(Debug, Clone, Copy)]
struct PendingRange {
    from_block: u64,
    to_block: u64,
    depth: u32,
}

impl PendingRange {
    /// Splits into `[from, mid - 1]` and `[mid, to]`.
    ///
    /// `mid` rounds up so a two-block range always yields two single-block halves.
    fn split(self) -> (Self, Self) {
        let mid = self.from_block + (self.to_block - self.from_block).div_ceil(2);
        let depth = self.depth + 1;
        (
            Self { from_block: self.from_block, to_block: mid - 1, depth },
            Self { from_block: mid, to_block: self.to_block, depth },
        )
    }
}

/// Fetches logs for an inclusive block range, bisecting whenever the provider rejects the range
/// as too large.
///
/// The output is the concatenation of the logs of every accepted sub-range, in ascending block
/// range order. Sub-ranges are walked with an explicit stack, so pathological providers cannot
/// exhaust the call stack; the depth bound is enforced separately.
pub struct RangeFetcher<'a, S: ?Sized> {
    source: &'a S,
    max_depth: u32,
}

impl<'a, S: LogSource + ?Sized> RangeFetcher<'a, S> {
    #[must_use]
    pub fn new(source: &'a S) -> Self {
        Self { source, max_depth: DEFAULT_MAX_SPLIT_DEPTH }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    #[must_use]
    pub fn source(&self) -> &'a S {
        self.source
    }

    /// Fetches `[from_block, to_block]` starting at split depth 0.
    ///
    /// # Errors
    /// See [`RangeFetcher::fetch_at_depth`].
    pub async fn fetch(
        &self,
        address: &str,
        topics: &[String],
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RawLog>, FetchError> {
        self.fetch_at_depth(address, topics, from_block, to_block, 0).await
    }

    /// Fetches `[from_block, to_block]` as if it were already `depth` splits deep.
    ///
    /// # Errors
    /// - [`FetchError::InvalidRange`] if `from_block > to_block`
    /// - [`FetchError::SingleBlockRejected`] if a one-block range is rejected
    /// - [`FetchError::DepthExceeded`] if a split would go past `max_depth`
    /// - [`FetchError::Source`] for any other source failure
    pub async fn fetch_at_depth(
        &self,
        address: &str,
        topics: &[String],
        from_block: u64,
        to_block: u64,
        depth: u32,
    ) -> Result<Vec<RawLog>, FetchError> {
        if from_block > to_block {
            return Err(FetchError::InvalidRange { from_block, to_block });
        }

        let template = LogQuery::new(address, topics.to_vec(), from_block, to_block);
        let mut pending = vec![PendingRange { from_block, to_block, depth }];
        let mut logs = Vec::new();

        while let Some(range) = pending.pop() {
            let query = template.with_range(range.from_block, range.to_block);

            match self.source.get_logs(&query).await {
                Ok(mut batch) => logs.append(&mut batch),
                Err(e) if e.is_range_limit() => {
                    if range.from_block == range.to_block {
                        error!(block = range.from_block, error = %e, "provider rejected single block");
                        return Err(FetchError::SingleBlockRejected {
                            block: range.from_block,
                            source: e,
                        });
                    }
                    if range.depth >= self.max_depth {
                        error!(
                            from_block = range.from_block,
                            to_block = range.to_block,
                            max_depth = self.max_depth,
                            "range split depth exceeded"
                        );
                        return Err(FetchError::DepthExceeded {
                            from_block: range.from_block,
                            to_block: range.to_block,
                            max_depth: self.max_depth,
                        });
                    }

                    let (left, right) = range.split();
                    debug!(
                        from_block = range.from_block,
                        to_block = range.to_block,
                        depth = left.depth,
                        error = %e,
                        "range rejected, splitting"
                    );
                    // left on top so it is fetched first
                    pending.push(right);
                    pending.push(left);
                }
                Err(e) => return Err(FetchError::Source(e)),
            }
        }

        Ok(logs)
    }
}
