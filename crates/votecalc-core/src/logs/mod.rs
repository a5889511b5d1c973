//! Log retrieval: range bisection, windowed pagination and canonical ordering.

pub mod errors;
pub mod fetcher;
pub mod reader;
pub mod source;
pub mod types;

pub use errors::FetchError;
pub use fetcher::{RangeFetcher, DEFAULT_MAX_SPLIT_DEPTH};
pub use reader::{
    resolve_block_span, sort_logs, LogSubscription, PaginatedLogReader, DEFAULT_BLOCK_SPAN,
    FAST_CHAIN_BLOCK_SPAN, MAX_TOPICS_PER_QUERY,
};
pub use source::LogSource;
pub use types::{LogPosition, LogQuery, RawLog};
