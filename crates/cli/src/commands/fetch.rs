use std::collections::HashMap;

use tracing::{info, warn};
use votecalc_core::{
    config::AppConfig,
    events::{
        citizen_categories, offchain_votes,
        signatures::{event_name, GOVERNOR_EVENTS, PROPOSAL_EVENTS, VOTE_EVENTS},
        topic_hash, CitizenAttestation, DecodedEvent, EventCaster, ProposalAttestation,
        VoteAttestation,
    },
    logs::{LogSubscription, PaginatedLogReader},
    proposal::{OffChainProposalRecord, OnChainProposalRecord},
    tally::Scheme,
    types::{weight_string, VoteRecord},
    upstream::{EasClient, GovernorReader, JsonRpcClient},
    utils::BlockRef,
};

use super::utils::{data_store, print_info, print_success, require, CliError, CliResult};

/// Block range to read: command-line bounds win over the configured ones. A `latest` end
/// leaves the range open so the reader stops at the chain head.
fn block_range(config: &AppConfig, from: Option<BlockRef>, to: Option<BlockRef>) -> CliResult<(u64, Option<u64>)> {
    let start = match from {
        Some(block) => block
            .number()
            .ok_or_else(|| CliError::General("--from-block cannot be latest".into()))?,
        None => config.chain.start_block,
    };
    let end = to.map_or(config.chain.end_block, BlockRef::number);
    Ok((start, end))
}

/// Reads governor events, derives on-chain votes, proposals and eligibility pools, and stores
/// them under the environment's data directory.
pub async fn fetch_onchain(config: &AppConfig, from: Option<BlockRef>, to: Option<BlockRef>) -> CliResult<()> {
    let (start_block, end_block) = block_range(config, from, to)?;
    let rpc = JsonRpcClient::new(require("chain.rpc_url", &config.chain.rpc_url)?)?;
    let governor = require("chain.governor_address", &config.chain.governor_address)?;
    let store = data_store(config);

    let caster = EventCaster::new(&GOVERNOR_EVENTS)?;
    let topics = GOVERNOR_EVENTS.iter().map(|spec| topic_hash(spec.signature)).collect();
    let reader = PaginatedLogReader::new(&rpc, config.block_span())
        .with_max_depth(config.logs.max_split_depth)
        .with_topic_chunk_size(config.logs.topic_chunk_size);

    print_info(&format!(
        "Reading governor logs from block {} (window {} blocks)...",
        start_block,
        reader.step()
    ));
    let logs = reader
        .read(&[LogSubscription::new(governor, topics)], start_block, end_block)
        .await?;

    let mut events = Vec::with_capacity(logs.len());
    for log in &logs {
        match caster.decode(log) {
            Ok(event) => events.push(event),
            Err(e) => warn!(
                block_number = log.block_number,
                log_index = log.log_index,
                error = %e,
                "skipping undecodable log"
            ),
        }
    }
    store.save_events(&events)?;

    let votes = onchain_votes(&events)?;
    store.save_onchain_votes(&votes)?;

    let mut records = store.load_proposals()?;
    records.onchain = onchain_proposals(&events)?;
    store.save_proposals(&records)?;

    let governor_reader = GovernorReader::new(&rpc, governor);
    let mut pools = HashMap::with_capacity(records.onchain.len());
    for record in &records.onchain {
        let proposal_id = weight_string::parse(&record.proposal_id).ok_or_else(|| {
            CliError::General(format!("invalid on-chain proposal id {}", record.proposal_id))
        })?;
        pools.insert(record.proposal_id.clone(), governor_reader.pools(&proposal_id).await?);
    }
    store.save_pools(&pools)?;

    print_success(&format!(
        "Stored {} events, {} votes and {} on-chain proposals in {}",
        events.len(),
        votes.len(),
        records.onchain.len(),
        store.root().display()
    ));
    Ok(())
}

/// Reads proposal, citizen and vote attestations and stores the off-chain proposal records and
/// the citizen-weighted ballots.
pub async fn fetch_offchain(config: &AppConfig) -> CliResult<()> {
    let eas = &config.eas;
    let votes_client = EasClient::new(require("eas.votes_url", &eas.votes_url)?)?;
    let proposals_client = EasClient::new(require("eas.proposals_url", &eas.proposals_url)?)?;
    let store = data_store(config);

    print_info("Reading proposal attestations...");
    let proposal_attestations = proposals_client
        .get_attestations(require("eas.create_proposal_schema_id", &eas.create_proposal_schema_id)?)
        .await?;
    store.save_attestations(event_name(ProposalAttestation::SCHEMA), &proposal_attestations)?;

    let mut offchain = Vec::new();
    for attestation in proposal_attestations.iter().filter(|a| !a.revoked) {
        match ProposalAttestation::decode(&attestation.data) {
            Ok(decoded) => offchain.push(OffChainProposalRecord::from(decoded)),
            Err(e) => warn!(id = %attestation.id, error = %e, "skipping undecodable proposal attestation"),
        }
    }
    let schemes = offchain_schemes(&offchain)?;

    print_info("Reading citizen attestations...");
    let citizen_attestations = votes_client
        .get_attestations(require("eas.citizen_schema_id", &eas.citizen_schema_id)?)
        .await?;
    store.save_attestations(event_name(CitizenAttestation::SCHEMA), &citizen_attestations)?;
    let citizens = citizen_categories(&citizen_attestations);

    print_info("Reading vote attestations...");
    let vote_attestations = votes_client
        .get_attestations(require("eas.vote_schema_id", &eas.vote_schema_id)?)
        .await?;
    store.save_attestations(event_name(VoteAttestation::SCHEMA), &vote_attestations)?;
    let votes = offchain_votes(&vote_attestations, &citizens, &schemes);
    store.save_offchain_votes(&votes)?;

    let mut records = store.load_proposals()?;
    records.offchain = offchain;
    store.save_proposals(&records)?;

    info!(citizens = citizens.len(), "citizens joined");
    print_success(&format!(
        "Stored {} off-chain proposals and {} votes from {} citizens in {}",
        records.offchain.len(),
        votes.len(),
        citizens.len(),
        store.root().display()
    ));
    Ok(())
}

fn onchain_votes(events: &[DecodedEvent]) -> CliResult<Vec<VoteRecord>> {
    let vote_signatures: Vec<&str> = VOTE_EVENTS.iter().map(|spec| spec.signature).collect();
    events
        .iter()
        .filter(|event| vote_signatures.contains(&event.signature.as_str()))
        .map(|event| VoteRecord::from_vote_event(event).map_err(CliError::from))
        .collect()
}

fn onchain_proposals(events: &[DecodedEvent]) -> CliResult<Vec<OnChainProposalRecord>> {
    let proposal_signatures: Vec<&str> = PROPOSAL_EVENTS.iter().map(|spec| spec.signature).collect();
    events
        .iter()
        .filter(|event| proposal_signatures.contains(&event.signature.as_str()))
        .map(|event| OnChainProposalRecord::from_event(event).map_err(CliError::from))
        .collect()
}

/// Scheme of each off-chain proposal, used to interpret vote params.
fn offchain_schemes(records: &[OffChainProposalRecord]) -> CliResult<HashMap<String, Scheme>> {
    records
        .iter()
        .map(|record| {
            record
                .proposal_type
                .parse::<Scheme>()
                .map(|scheme| (record.id.clone(), scheme))
                .map_err(|e| CliError::Proposal(format!("proposal {}: {e}", record.id)))
        })
        .collect()
}
