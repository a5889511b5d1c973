use crate::upstream::UpstreamError;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Any log source failure other than a range rejection.
    #[error("log source error: {0}")]
    Source(#[from] UpstreamError),

    /// Bisection needed more levels than `max_depth` allows.
    #[error("range split depth {max_depth} exceeded at blocks {from_block}..={to_block}")]
    DepthExceeded { from_block: u64, to_block: u64, max_depth: u32 },

    /// The provider rejected a range that cannot be split further.
    #[error("provider rejected single block {block}: {source}")]
    SingleBlockRejected {
        block: u64,
        #[source]
        source: UpstreamError,
    },

    #[error("invalid block range {from_block}..={to_block}")]
    InvalidRange { from_block: u64, to_block: u64 },
}
