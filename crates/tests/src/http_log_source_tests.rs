//! Integration tests for the JSON-RPC client as a log source and governor reader.
//!
//! These run the real HTTP client against a mockito server.

use crate::mock_infrastructure::{create_test_log, create_test_logs, test_topic, RpcMockBuilder, GOVERNOR};
use ethabi::ParamType;
use num::BigUint;
use serial_test::serial;
use votecalc_core::{
    logs::{FetchError, LogQuery, LogSource, LogSubscription, PaginatedLogReader},
    upstream::{GovernorReader, JsonRpcClient, RpcErrorCategory},
};

fn selector(function: &str) -> String {
    hex::encode(ethabi::short_signature(function, &[ParamType::Uint(256)]))
}

fn word(value: u64) -> String {
    format!("0x{value:064x}")
}

#[tokio::test]
#[serial]
async fn test_get_logs_parses_provider_shape() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_get_logs(&create_test_logs(16, 18));
    let client = JsonRpcClient::new(mock.url()).unwrap();

    let logs = client
        .get_logs(&LogQuery::new(GOVERNOR, vec![test_topic(0)], 16, 18))
        .await
        .unwrap();

    assert_eq!(logs.len(), 3);
    assert_eq!(logs[0].block_number, 16);
    assert_eq!(logs[2].block_number, 18);
    assert_eq!(logs[0].topic0(), Some(test_topic(0).as_str()));
    mock.assert_all();
}

#[tokio::test]
#[serial]
async fn test_block_number() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_block_number(0x1234);
    let client = JsonRpcClient::new(mock.url()).unwrap();
    assert_eq!(client.block_number().await.unwrap(), 0x1234);
}

#[tokio::test]
#[serial]
async fn test_range_limit_error_triggers_bisection() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_get_logs_error_for_range(0, 7, -32602, "query returned more than 10000 results")
        .mock_get_logs_for_range(0, 3, &[create_test_log(2, 0, 0)])
        .mock_get_logs_for_range(4, 7, &[create_test_log(5, 0, 0), create_test_log(7, 1, 0)]);
    let client = JsonRpcClient::new(mock.url()).unwrap();

    let logs = PaginatedLogReader::new(&client, 8)
        .read(&[LogSubscription::new(GOVERNOR, vec![test_topic(0)])], 0, Some(7))
        .await
        .unwrap();

    assert_eq!(logs.iter().map(|l| l.block_number).collect::<Vec<_>>(), vec![2, 5, 7]);
    mock.assert_all();
}

#[tokio::test]
#[serial]
async fn test_payload_too_large_status_triggers_bisection() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_get_logs_status_for_range(10, 11, 413)
        .mock_get_logs_for_range(10, 10, &[create_test_log(10, 0, 0)])
        .mock_get_logs_for_range(11, 11, &[]);
    let client = JsonRpcClient::new(mock.url()).unwrap();

    let logs = PaginatedLogReader::new(&client, 2)
        .read(&[LogSubscription::new(GOVERNOR, vec![test_topic(0)])], 10, Some(11))
        .await
        .unwrap();

    assert_eq!(logs.len(), 1);
    mock.assert_all();
}

#[tokio::test]
#[serial]
async fn test_rate_limit_is_not_bisected() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_get_logs_error_for_range(0, 99, -32005, "rate limited");
    let client = JsonRpcClient::new(mock.url()).unwrap();

    let err = PaginatedLogReader::new(&client, 100)
        .read(&[LogSubscription::new(GOVERNOR, vec![test_topic(0)])], 0, Some(99))
        .await
        .unwrap_err();

    match err {
        FetchError::Source(source) => {
            assert_eq!(source.rpc_category(), Some(RpcErrorCategory::RateLimit));
        }
        other => panic!("expected a source error, got {other:?}"),
    }
}

#[tokio::test]
#[serial]
async fn test_governor_pools() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_eth_call(&selector("proposalSnapshot"), &word(100))
        .mock_eth_call(&selector("votableSupply"), &word(1_000_000))
        .mock_eth_call(&selector("quorum"), &word(300_000));
    let client = JsonRpcClient::new(mock.url()).unwrap();

    let pools = GovernorReader::new(&client, GOVERNOR).pools(&BigUint::from(7u8)).await.unwrap();

    assert_eq!(pools.snapshot_block, 100);
    assert_eq!(pools.votable_supply, BigUint::from(1_000_000u32));
    assert_eq!(pools.quorum, BigUint::from(300_000u32));
    mock.assert_all();
}
