//! End-to-end: provider logs through decoding, the data store and the calculator.

use std::collections::HashMap;

use crate::mock_infrastructure::{account, vote_cast_log, RpcMockBuilder, GOVERNOR};
use num::BigUint;
use serial_test::serial;
use tempfile::TempDir;
use votecalc_core::{
    events::{signatures::VOTE_EVENTS, EventCaster},
    logs::{LogSubscription, PaginatedLogReader},
    proposal::{
        calculate, CalculationContext, OffChainProposalRecord, OnChainProposalRecord, ProposalError,
        ProposalRecords, ProposalRegistry, ProposalTypeConfig, ProposalTypes, VoteTable,
    },
    store::DataStore,
    tally::{Scheme, TallyError},
    types::{Support, VoteRecord},
    upstream::{JsonRpcClient, OnChainPools},
};

fn standard_types() -> ProposalTypes {
    ProposalTypes::from([
        (
            0,
            ProposalTypeConfig {
                name: "Standard".into(),
                quorum_bps: 3_000,
                approval_threshold_bps: 5_100,
                include_abstain: true,
                tiers: Vec::new(),
            },
        ),
        (
            2,
            ProposalTypeConfig {
                name: "Citizen standard".into(),
                quorum_bps: 2_000,
                approval_threshold_bps: 7_000,
                include_abstain: true,
                tiers: Vec::new(),
            },
        ),
    ])
}

fn offchain_record(id: &str, onchain_id: &str, type_id: u32) -> OffChainProposalRecord {
    OffChainProposalRecord {
        id: id.into(),
        onchain_proposal_id: onchain_id.into(),
        proposal_type: "STANDARD".into(),
        proposal_type_id: type_id,
        description: "Protocol upgrade".into(),
        choices: Vec::new(),
        tiers: Vec::new(),
    }
}

fn governor_pools(proposal_id: &str) -> HashMap<String, OnChainPools> {
    HashMap::from([(
        proposal_id.to_string(),
        OnChainPools { snapshot_block: 5, votable_supply: BigUint::from(1_000u32), quorum: BigUint::from(300u32) },
    )])
}

fn onchain_record(proposal_id: &str) -> OnChainProposalRecord {
    OnChainProposalRecord {
        proposal_id: proposal_id.into(),
        proposal_type: 0,
        scheme: Scheme::Basic,
        description: "Protocol upgrade\n\nDetails".into(),
        choices: Vec::new(),
        block_number: 5,
    }
}

async fn fetch_votes(mock: &RpcMockBuilder) -> Vec<VoteRecord> {
    let client = JsonRpcClient::new(mock.url()).unwrap();
    let caster = EventCaster::new(&VOTE_EVENTS).unwrap();
    let logs = PaginatedLogReader::new(&client, 100)
        .read(&[LogSubscription::new(GOVERNOR, caster.topics())], 0, Some(99))
        .await
        .unwrap();
    logs.iter()
        .map(|log| VoteRecord::from_vote_event(&caster.decode(log).unwrap()).unwrap())
        .collect()
}

#[tokio::test]
#[serial]
async fn test_onchain_votes_fetched_stored_and_tallied() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_get_logs(&[
        vote_cast_log(10, 0, 1, 7, 1, 600),
        vote_cast_log(11, 0, 2, 7, 0, 100),
        vote_cast_log(12, 0, 3, 7, 2, 50),
    ]);

    let votes = fetch_votes(&mock).await;
    assert_eq!(votes.len(), 3);
    assert_eq!(votes[0].voter.as_deref(), Some(account(1).as_str()));
    assert_eq!(votes[0].support, Support::For);
    assert_eq!(votes[1].support, Support::Against);
    assert_eq!(votes[2].weight, BigUint::from(50u32));

    let dir = TempDir::new().unwrap();
    let store = DataStore::new(dir.path(), "test");
    store.save_onchain_votes(&votes).unwrap();
    store
        .save_proposals(&ProposalRecords { onchain: vec![onchain_record("7")], offchain: Vec::new() })
        .unwrap();
    store.save_pools(&governor_pools("7")).unwrap();

    let registry = ProposalRegistry::build(&store.load_proposals().unwrap(), &standard_types()).unwrap();
    let ctx = CalculationContext {
        onchain_votes: VoteTable::new(store.load_onchain_votes().unwrap()),
        onchain_pools: store.load_pools().unwrap(),
        ..CalculationContext::default()
    };

    let proposal = registry.get("7").unwrap();
    assert_eq!(proposal.title, "Protocol upgrade");

    let outcome = calculate(proposal, &ctx).unwrap();
    // 750 of 1000 participated; 600 of 750 in favor.
    assert!((outcome.final_tally.quorum - 0.75).abs() < 1e-12);
    assert!((outcome.final_tally.approval - 0.8).abs() < 1e-12);
    assert!(outcome.passed());
    assert_eq!(outcome.tallies.len(), 1);
    assert!(outcome.to_string().contains("Protocol upgrade"));
    mock.assert_all();
}

#[tokio::test]
#[serial]
async fn test_missing_pools_fail_the_onchain_proposal() {
    let registry = ProposalRegistry::build(
        &ProposalRecords { onchain: vec![onchain_record("8")], offchain: Vec::new() },
        &standard_types(),
    )
    .unwrap();

    let err = calculate(registry.get("8").unwrap(), &CalculationContext::default()).unwrap_err();
    assert!(matches!(err, ProposalError::MissingVotableSupply(id) if id == "8"));
}

#[test]
fn test_stored_hybrid_with_drifted_thresholds_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = DataStore::new(dir.path(), "test");
    store
        .save_proposals(&ProposalRecords {
            onchain: vec![onchain_record("7"), onchain_record("8")],
            offchain: vec![offchain_record("9", "7", 2), offchain_record("10", "8", 0)],
        })
        .unwrap();
    let mut pools = governor_pools("7");
    pools.extend(governor_pools("8"));
    store.save_pools(&pools).unwrap();

    let registry = ProposalRegistry::build(&store.load_proposals().unwrap(), &standard_types()).unwrap();
    let ctx = CalculationContext { onchain_pools: store.load_pools().unwrap(), ..CalculationContext::default() };

    // On-chain type 30% / 51% against off-chain type 20% / 70%.
    let err = calculate(registry.get("7-9").unwrap(), &ctx).unwrap_err();
    assert!(matches!(err, ProposalError::Tally(TallyError::ThresholdMismatch { index: 1, .. })));

    // Both sides on the same type calculate normally.
    assert!(calculate(registry.get("8-10").unwrap(), &ctx).is_ok());
}
