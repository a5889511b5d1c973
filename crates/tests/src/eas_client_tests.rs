//! Integration tests for `EasClient` paging and the citizen vote join.

use std::collections::HashMap;

use crate::mock_infrastructure::{
    account, attestation_json, citizen_payload, vote_payload, EasMockBuilder,
};
use serial_test::serial;
use votecalc_core::{
    events::{citizen_categories, offchain_votes},
    tally::Scheme,
    types::{Category, Support},
    upstream::{EasClient, UpstreamError},
};

const VOTE_SCHEMA: &str = "0xaaaa";
const CITIZEN_SCHEMA: &str = "0xbbbb";
const MIXED_CASE_CITIZEN: &str = "0xAbCdEf0000000000000000000000000000000001";

fn votes(ids: std::ops::Range<u64>) -> Vec<serde_json::Value> {
    ids.map(|i| attestation_json(&format!("0x{i:x}"), &account(1), VOTE_SCHEMA, &vote_payload(1, "[1]")))
        .collect()
}

#[tokio::test]
#[serial]
async fn test_pages_until_short_page() {
    let mut mock = EasMockBuilder::new().await;
    mock.mock_attestations_page(VOTE_SCHEMA, 0, &votes(0..2))
        .mock_attestations_page(VOTE_SCHEMA, 2, &votes(2..4))
        .mock_attestations_page(VOTE_SCHEMA, 4, &votes(4..5));
    let client = EasClient::new(mock.url()).unwrap().with_page_size(2);

    let attestations = client.get_attestations(VOTE_SCHEMA).await.unwrap();

    assert_eq!(attestations.len(), 5);
    assert_eq!(attestations[4].id, "0x4");
    mock.assert_all();
}

#[tokio::test]
#[serial]
async fn test_full_last_page_needs_one_empty_page() {
    let mut mock = EasMockBuilder::new().await;
    mock.mock_attestations_page(VOTE_SCHEMA, 0, &votes(0..2))
        .mock_attestations_page(VOTE_SCHEMA, 2, &[]);
    let client = EasClient::new(mock.url()).unwrap().with_page_size(2);

    assert_eq!(client.get_attestations(VOTE_SCHEMA).await.unwrap().len(), 2);
    mock.assert_all();
}

#[tokio::test]
#[serial]
async fn test_graphql_errors_are_reported() {
    let mut mock = EasMockBuilder::new().await;
    mock.mock_graphql_error("schema not indexed");
    let client = EasClient::new(mock.url()).unwrap();

    let err = client.get_attestations(VOTE_SCHEMA).await.unwrap_err();
    match err {
        UpstreamError::GraphQl(message) => assert!(message.contains("schema not indexed")),
        other => panic!("expected a GraphQL error, got {other:?}"),
    }
}

#[tokio::test]
#[serial]
async fn test_votes_joined_with_citizens() {
    let mut mock = EasMockBuilder::new().await;
    mock.mock_attestations_page(
        CITIZEN_SCHEMA,
        0,
        &[
            attestation_json("0xc1", MIXED_CASE_CITIZEN, CITIZEN_SCHEMA, &citizen_payload(11, "5.1")),
            attestation_json("0xc2", &account(2), CITIZEN_SCHEMA, &citizen_payload(12, "5.3")),
        ],
    )
    .mock_attestations_page(
        VOTE_SCHEMA,
        0,
        &[
            attestation_json("0xv1", &MIXED_CASE_CITIZEN.to_lowercase(), VOTE_SCHEMA, &vote_payload(9, "[0]")),
            attestation_json("0xv2", &account(2), VOTE_SCHEMA, &vote_payload(9, "[1]")),
            attestation_json("0xv3", &account(3), VOTE_SCHEMA, &vote_payload(9, "[1]")),
        ],
    );
    let client = EasClient::new(mock.url()).unwrap();

    let citizens = citizen_categories(&client.get_attestations(CITIZEN_SCHEMA).await.unwrap());
    let schemes: HashMap<String, Scheme> = [("9".to_string(), Scheme::Basic)].into_iter().collect();
    let ballots = offchain_votes(&client.get_attestations(VOTE_SCHEMA).await.unwrap(), &citizens, &schemes);

    assert_eq!(citizens.len(), 2);
    assert_eq!(ballots.len(), 2);
    assert_eq!(ballots[0].support, Support::Against);
    assert_eq!(ballots[0].category, Some(Category::App));
    assert_eq!(ballots[1].support, Support::For);
    assert_eq!(ballots[1].category, Some(Category::Chain));
}
