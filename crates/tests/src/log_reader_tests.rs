//! Integration tests for `PaginatedLogReader`: windows, topic groups and canonical order.

use crate::mock_infrastructure::{raw_log, test_topic, LimitedLogSource, GOVERNOR};
use proptest::prelude::*;
use votecalc_core::logs::{LogPosition, LogSubscription, PaginatedLogReader, RawLog};

fn topics(n: u64) -> Vec<String> {
    (1..=n).map(test_topic).collect()
}

fn positions(logs: &[RawLog]) -> Vec<(u64, u32, u32)> {
    logs.iter().map(|l| (l.block_number, l.transaction_index, l.log_index)).collect()
}

#[tokio::test]
async fn test_windows_cover_span_exactly() {
    let source = LimitedLogSource::new(Vec::new(), 1_000);
    let reader = PaginatedLogReader::new(&source, 10);

    reader.read(&[LogSubscription::new(GOVERNOR, topics(1))], 0, Some(25)).await.unwrap();

    assert_eq!(source.requested_ranges(), vec![(0, 9), (10, 19), (20, 25)]);
}

#[tokio::test]
async fn test_topics_grouped_by_four() {
    let source = LimitedLogSource::new(Vec::new(), 1_000);
    let reader = PaginatedLogReader::new(&source, 100);
    let all = topics(6);

    reader.read(&[LogSubscription::new(GOVERNOR, all.clone())], 0, Some(99)).await.unwrap();

    let queries = source.queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].topics, all[..4].to_vec());
    assert_eq!(queries[1].topics, all[4..].to_vec());
}

#[tokio::test]
async fn test_topic_chunk_size_is_clamped() {
    let source = LimitedLogSource::new(Vec::new(), 1_000);
    let reader = PaginatedLogReader::new(&source, 100).with_topic_chunk_size(10);
    assert_eq!(reader.topic_chunk_size(), 4);

    let reader = PaginatedLogReader::new(&source, 100).with_topic_chunk_size(1);
    reader.read(&[LogSubscription::new(GOVERNOR, topics(3))], 0, Some(0)).await.unwrap();
    assert!(source.queries().iter().all(|q| q.topics.len() == 1));
    assert_eq!(source.queries().len(), 3);
}

#[tokio::test]
async fn test_output_is_numerically_ordered_across_windows_and_groups() {
    let logs = vec![
        raw_log(100, 0, 0, &test_topic(1)),
        raw_log(10, 2, 5, &test_topic(5)),
        raw_log(10, 2, 1, &test_topic(1)),
        raw_log(9, 7, 0, &test_topic(5)),
        raw_log(10, 0, 3, &test_topic(2)),
    ];
    let source = LimitedLogSource::new(logs, 1_000);
    let reader = PaginatedLogReader::new(&source, 50);

    let out = reader
        .read(&[LogSubscription::new(GOVERNOR, topics(5))], 0, Some(120))
        .await
        .unwrap();

    assert_eq!(positions(&out), vec![(9, 7, 0), (10, 0, 3), (10, 2, 1), (10, 2, 5), (100, 0, 0)]);
    assert!(out.windows(2).all(|w| w[0].position() <= w[1].position()));
}

#[tokio::test]
async fn test_open_end_reads_to_head() {
    let source = LimitedLogSource::new(vec![raw_log(42, 0, 0, &test_topic(1))], 1_000).with_head(45);
    let reader = PaginatedLogReader::new(&source, 20);

    let out = reader.read(&[LogSubscription::new(GOVERNOR, topics(1))], 0, None).await.unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(source.requested_ranges(), vec![(0, 19), (20, 39), (40, 45)]);
}

#[tokio::test]
async fn test_start_past_end_reads_nothing() {
    let source = LimitedLogSource::new(vec![raw_log(5, 0, 0, &test_topic(1))], 1_000);
    let reader = PaginatedLogReader::new(&source, 10);

    let out = reader.read(&[LogSubscription::new(GOVERNOR, topics(1))], 50, Some(10)).await.unwrap();

    assert!(out.is_empty());
    assert!(source.requested_ranges().is_empty());
}

#[tokio::test]
async fn test_empty_topics_query_unfiltered() {
    let logs = vec![raw_log(1, 0, 0, &test_topic(7)), raw_log(2, 0, 0, &test_topic(8))];
    let source = LimitedLogSource::new(logs, 1_000);
    let reader = PaginatedLogReader::new(&source, 10);

    let out = reader.read(&[LogSubscription::new(GOVERNOR, Vec::new())], 0, Some(9)).await.unwrap();

    assert_eq!(out.len(), 2);
    let queries = source.queries();
    assert_eq!(queries.len(), 1);
    assert!(queries[0].topics.is_empty());
}

#[tokio::test]
async fn test_windows_larger_than_provider_limit_are_bisected() {
    let logs: Vec<RawLog> = (0..32).map(|b| raw_log(b, 0, 0, &test_topic(1))).collect();
    let source = LimitedLogSource::new(logs, 4);
    let reader = PaginatedLogReader::new(&source, 16);

    let out = reader.read(&[LogSubscription::new(GOVERNOR, topics(1))], 0, Some(31)).await.unwrap();

    assert_eq!(out.len(), 32);
    assert_eq!(out.first().map(RawLog::position), Some(LogPosition {
        block_number: 0,
        transaction_index: 0,
        log_index: 0
    }));
    assert!(source.requested_ranges().iter().any(|(from, to)| (*from, *to) == (16, 31)));
}

#[tokio::test]
async fn test_multiple_subscriptions_merge_in_order() {
    let other = "0x0000000000000000000000000000000000000abc";
    let mut late = raw_log(3, 0, 0, &test_topic(1));
    late.address = other.to_string();
    let logs = vec![raw_log(8, 0, 0, &test_topic(1)), late];
    let source = LimitedLogSource::new(logs, 1_000);
    let reader = PaginatedLogReader::new(&source, 100);

    let out = reader
        .read(
            &[LogSubscription::new(GOVERNOR, topics(1)), LogSubscription::new(other, topics(1))],
            0,
            Some(10),
        )
        .await
        .unwrap();

    assert_eq!(out.iter().map(|l| l.block_number).collect::<Vec<_>>(), vec![3, 8]);
    assert_eq!(out[0].address, other);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_output_is_complete_and_ordered(
        positions in prop::collection::vec((0u64..300, 0u32..4, 0u32..4, 1u64..7), 0..60),
        step in 1u64..80,
        limit in 1u64..40,
    ) {
        let logs: Vec<RawLog> = positions
            .iter()
            .map(|(block, tx, log, topic)| raw_log(*block, *tx, *log, &test_topic(*topic)))
            .collect();
        let source = LimitedLogSource::new(logs.clone(), limit);
        let reader = PaginatedLogReader::new(&source, step);
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

        let out = runtime
            .block_on(reader.read(&[LogSubscription::new(GOVERNOR, topics(6))], 0, Some(299)))
            .unwrap();

        prop_assert_eq!(out.len(), logs.len());
        prop_assert!(out.windows(2).all(|w| w[0].position() <= w[1].position()));
    }
}
