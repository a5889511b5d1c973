//! Integration tests for `RangeFetcher` against a provider with a block range limit.

use crate::mock_infrastructure::{raw_log, test_topic, LimitedLogSource, GOVERNOR};
use proptest::prelude::*;
use votecalc_core::{
    logs::{FetchError, RangeFetcher, RawLog},
    upstream::UpstreamError,
};

fn logs_in_blocks(blocks: &[u64]) -> Vec<RawLog> {
    blocks
        .iter()
        .enumerate()
        .map(|(i, block)| raw_log(*block, 0, u32::try_from(i).unwrap(), &test_topic(0)))
        .collect()
}

#[tokio::test]
async fn test_bisects_until_ranges_fit() {
    let source = LimitedLogSource::new(logs_in_blocks(&[0, 3, 4, 9, 15]), 4);
    let fetcher = RangeFetcher::new(&source);

    let logs = fetcher.fetch(GOVERNOR, &[], 0, 15).await.unwrap();

    let blocks: Vec<u64> = logs.iter().map(|l| l.block_number).collect();
    assert_eq!(blocks, vec![0, 3, 4, 9, 15]);
    assert_eq!(
        source.requested_ranges(),
        vec![(0, 15), (0, 7), (0, 3), (4, 7), (8, 15), (8, 11), (12, 15)]
    );
}

#[tokio::test]
async fn test_accepted_range_is_a_single_request() {
    let source = LimitedLogSource::new(logs_in_blocks(&[1, 2]), 100);
    let logs = RangeFetcher::new(&source).fetch(GOVERNOR, &[], 0, 99).await.unwrap();

    assert_eq!(logs.len(), 2);
    assert_eq!(source.requested_ranges(), vec![(0, 99)]);
}

#[tokio::test]
async fn test_odd_range_splits_with_upper_midpoint() {
    let source = LimitedLogSource::new(Vec::new(), 2);
    RangeFetcher::new(&source).fetch(GOVERNOR, &[], 10, 14).await.unwrap();

    // mid = 10 + ceil(4 / 2) = 12; [10, 11] fits, [12, 14] splits at 13.
    assert_eq!(source.requested_ranges(), vec![(10, 14), (10, 11), (12, 14), (12, 12), (13, 14)]);
}

#[tokio::test]
async fn test_depth_exceeded_is_fatal() {
    let source = LimitedLogSource::new(Vec::new(), 1);
    let err = RangeFetcher::new(&source)
        .with_max_depth(3)
        .fetch(GOVERNOR, &[], 0, 1023)
        .await
        .unwrap_err();

    match err {
        FetchError::DepthExceeded { from_block, to_block, max_depth } => {
            assert_eq!(max_depth, 3);
            assert_eq!((from_block, to_block), (0, 127));
        }
        other => panic!("expected DepthExceeded, got {other:?}"),
    }
    // Depth 0, 1, 2 and 3 each issued one request down the leftmost branch.
    assert_eq!(source.requested_ranges().len(), 4);
}

#[tokio::test]
async fn test_single_block_rejection_is_fatal() {
    let source = LimitedLogSource::new(Vec::new(), 0);
    let err = RangeFetcher::new(&source).fetch(GOVERNOR, &[], 5, 5).await.unwrap_err();

    match err {
        FetchError::SingleBlockRejected { block, source } => {
            assert_eq!(block, 5);
            assert!(source.is_range_limit());
        }
        other => panic!("expected SingleBlockRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_other_errors_propagate_without_splitting() {
    let source = LimitedLogSource::new(logs_in_blocks(&[1]), 4).failing_at(7);
    let err = RangeFetcher::new(&source).fetch(GOVERNOR, &[], 0, 15).await.unwrap_err();

    assert!(matches!(err, FetchError::Source(UpstreamError::RpcError(-32603, _))));
    // [0, 3] succeeded, [4, 7] failed; nothing after it was requested.
    assert_eq!(source.requested_ranges(), vec![(0, 15), (0, 7), (0, 3), (4, 7)]);
}

#[tokio::test]
async fn test_inverted_range_is_rejected() {
    let source = LimitedLogSource::new(Vec::new(), 10);
    let err = RangeFetcher::new(&source).fetch(GOVERNOR, &[], 9, 3).await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidRange { from_block: 9, to_block: 3 }));
    assert!(source.requested_ranges().is_empty());
}

#[tokio::test]
async fn test_topics_are_forwarded_to_every_subrange() {
    let topics = vec![test_topic(1), test_topic(2)];
    let source = LimitedLogSource::new(Vec::new(), 2);
    RangeFetcher::new(&source).fetch(GOVERNOR, &topics, 0, 7).await.unwrap();

    let queries = source.queries();
    assert!(queries.len() > 1);
    assert!(queries.iter().all(|q| q.topics == topics && q.address == GOVERNOR));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Whatever the provider limit, bisection returns exactly the logs of the range in
    /// ascending block order.
    #[test]
    fn prop_bisection_matches_unlimited_fetch(
        blocks in prop::collection::vec(0u64..200, 0..40),
        limit in 1u64..50,
        from in 0u64..100,
        span in 0u64..100,
    ) {
        let to = from + span;
        let mut blocks = blocks;
        blocks.sort_unstable();
        let logs = logs_in_blocks(&blocks);
        let mut expected: Vec<RawLog> = logs
            .iter()
            .filter(|l| (from..=to).contains(&l.block_number))
            .cloned()
            .collect();
        expected.sort_by_key(|l| l.block_number);

        let source = LimitedLogSource::new(logs, limit);
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let fetched = runtime
            .block_on(RangeFetcher::new(&source).fetch(GOVERNOR, &[], from, to))
            .unwrap();

        prop_assert_eq!(fetched, expected);
        for (lo, hi) in source.requested_ranges() {
            prop_assert!(lo >= from && hi <= to && lo <= hi);
        }
    }
}
