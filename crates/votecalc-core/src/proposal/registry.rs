use std::collections::BTreeMap;

use ethabi::{ParamType, Token};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{title_of, Proposal, ProposalError, ProposalKind, VotingTerms};
use crate::{
    events::{
        decode_hex,
        signatures::{PROPOSAL_CREATED_1, PROPOSAL_CREATED_2, PROPOSAL_CREATED_3, PROPOSAL_CREATED_4},
        DecodedEvent, ProposalAttestation,
    },
    tally::{Scheme, Thresholds, VetoTiers},
};

/// An off-chain record whose on-chain reference is this value stands alone.
pub const NO_ONCHAIN_PROPOSAL: &str = "0";

/// Configured voting parameters for one proposal type id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalTypeConfig {
    pub name: String,
    pub quorum_bps: u32,
    pub approval_threshold_bps: u32,
    #[serde(default)]
    pub include_abstain: bool,
    /// Veto tiers in basis points; entry `i` applies when `i + 1` categories clear it.
    #[serde(default)]
    pub tiers: Vec<u32>,
}

impl ProposalTypeConfig {
    fn thresholds(&self, type_id: u32) -> Result<Thresholds, ProposalError> {
        for (field, bps) in [("quorum", self.quorum_bps), ("approval threshold", self.approval_threshold_bps)] {
            if bps > 10_000 {
                return Err(ProposalError::InvalidThreshold { type_id, field, bps });
            }
        }
        Ok(Thresholds::from_bps(self.quorum_bps, self.approval_threshold_bps))
    }

    /// Approval tallies always count abstentions.
    fn include_abstain(&self, scheme: Scheme) -> bool {
        self.include_abstain || scheme == Scheme::Approval
    }
}

pub type ProposalTypes = BTreeMap<u32, ProposalTypeConfig>;

/// A proposal created by a `ProposalCreated` governor event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnChainProposalRecord {
    pub proposal_id: String,
    /// Proposal type id, `0` for events that carry none.
    pub proposal_type: u32,
    pub scheme: Scheme,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    pub block_number: u64,
}

impl OnChainProposalRecord {
    /// Classifies a decoded `ProposalCreated` event.
    ///
    /// Events without a voting module are basic. Module events are approval when the encoded
    /// proposal data starts with the offset word `0xc0` of the options array, otherwise
    /// optimistic.
    pub fn from_event(event: &DecodedEvent) -> Result<Self, ProposalError> {
        let signature = event.signature.as_str();
        let scheme = if signature == PROPOSAL_CREATED_1.signature || signature == PROPOSAL_CREATED_2.signature {
            Scheme::Basic
        } else if signature == PROPOSAL_CREATED_3.signature || signature == PROPOSAL_CREATED_4.signature {
            module_scheme(event.str_field("proposal_data")?)
        } else {
            return Err(ProposalError::UnknownEvent(event.signature.clone()));
        };

        let proposal_type = match event.fields.get("proposal_type").and_then(|v| v.as_str()) {
            Some(raw) => raw.parse().map_err(|_| crate::events::DecodeError::InvalidField {
                field: "proposal_type".into(),
                value: raw.into(),
            })?,
            None => 0,
        };

        let choices = match scheme {
            Scheme::Approval => approval_options(event.str_field("proposal_data")?).unwrap_or_default(),
            Scheme::Basic | Scheme::Optimistic => Vec::new(),
        };

        Ok(Self {
            proposal_id: event.str_field("proposal_id")?.to_string(),
            proposal_type,
            scheme,
            description: event.str_field("description")?.to_string(),
            choices,
            block_number: event.block_number,
        })
    }
}

fn module_scheme(proposal_data: &str) -> Scheme {
    let data = proposal_data.strip_prefix("0x").unwrap_or(proposal_data);
    let approval_prefix = format!("{}c", "0".repeat(62));
    if data.starts_with(&approval_prefix) {
        Scheme::Approval
    } else {
        Scheme::Optimistic
    }
}

/// Descriptions of the options in approval-module proposal data.
///
/// Two layouts exist; options either carry a leading budget token amount or not.
fn approval_options(proposal_data: &str) -> Option<Vec<String>> {
    let bytes = decode_hex(proposal_data).ok()?;
    let settings = ParamType::Tuple(vec![
        ParamType::Uint(8),
        ParamType::Uint(8),
        ParamType::Address,
        ParamType::Uint(128),
        ParamType::Uint(128),
    ]);
    let calls = [
        ParamType::Array(Box::new(ParamType::Address)),
        ParamType::Array(Box::new(ParamType::Uint(256))),
        ParamType::Array(Box::new(ParamType::Bytes)),
        ParamType::String,
    ];
    let with_budget = ParamType::Tuple([vec![ParamType::Uint(256)], calls.to_vec()].concat());
    let without_budget = ParamType::Tuple(calls.to_vec());

    let tokens = ethabi::decode(&[ParamType::Array(Box::new(with_budget)), settings.clone()], &bytes)
        .or_else(|_| ethabi::decode(&[ParamType::Array(Box::new(without_budget)), settings], &bytes))
        .ok()?;

    match tokens.into_iter().next()? {
        Token::Array(options) => options
            .into_iter()
            .map(|option| match option {
                Token::Tuple(fields) => match fields.into_iter().last()? {
                    Token::String(description) => Some(description),
                    _ => None,
                },
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

/// A proposal announced by a `CreateProposal` attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffChainProposalRecord {
    pub id: String,
    /// `"0"` for proposals that stand alone.
    pub onchain_proposal_id: String,
    /// Voting scheme label, e.g. `approval`.
    pub proposal_type: String,
    pub proposal_type_id: u32,
    pub description: String,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub tiers: Vec<u32>,
}

impl From<ProposalAttestation> for OffChainProposalRecord {
    fn from(a: ProposalAttestation) -> Self {
        Self {
            id: a.id,
            onchain_proposal_id: a.onchain_proposal_id,
            proposal_type: a.proposal_type,
            proposal_type_id: a.proposal_type_id,
            description: a.description,
            choices: a.choices,
            tiers: a.tiers,
        }
    }
}

/// Every proposal record known for one environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRecords {
    pub onchain: Vec<OnChainProposalRecord>,
    pub offchain: Vec<OffChainProposalRecord>,
}

/// Proposals classified as off-chain, on-chain or hybrid.
#[derive(Debug, Clone, Default)]
pub struct ProposalRegistry {
    off_chain: Vec<Proposal>,
    on_chain: Vec<Proposal>,
    hybrid: Vec<Proposal>,
}

impl ProposalRegistry {
    /// Classifies `records`.
    ///
    /// An off-chain record referencing an on-chain proposal forms a hybrid and consumes that
    /// on-chain record. Later records win over earlier ones with the same id.
    ///
    /// # Errors
    /// Unknown proposal types, out-of-range thresholds, unknown scheme labels and references to
    /// on-chain proposals that do not exist.
    pub fn build(records: &ProposalRecords, types: &ProposalTypes) -> Result<Self, ProposalError> {
        let mut onchain: BTreeMap<&str, &OnChainProposalRecord> = BTreeMap::new();
        let mut onchain_order = Vec::new();
        for record in &records.onchain {
            if onchain.insert(record.proposal_id.as_str(), record).is_none() {
                onchain_order.push(record.proposal_id.as_str());
            }
        }

        let mut offchain: BTreeMap<&str, &OffChainProposalRecord> = BTreeMap::new();
        let mut offchain_order = Vec::new();
        for record in &records.offchain {
            if offchain.insert(record.id.as_str(), record).is_some() {
                debug!(id = %record.id, "replacing duplicate off-chain proposal record");
            } else {
                offchain_order.push(record.id.as_str());
            }
        }

        let mut registry = Self::default();
        for id in offchain_order {
            let off = offchain[id];
            if off.onchain_proposal_id == NO_ONCHAIN_PROPOSAL {
                registry.off_chain.push(Self::off_chain_proposal(off, types)?);
                continue;
            }
            let on = onchain.remove(off.onchain_proposal_id.as_str()).ok_or_else(|| {
                ProposalError::DanglingReference {
                    offchain_id: off.id.clone(),
                    onchain_id: off.onchain_proposal_id.clone(),
                }
            })?;
            registry.hybrid.push(Self::hybrid_proposal(on, off, types)?);
        }

        for id in onchain_order {
            if let Some(on) = onchain.get(id) {
                registry.on_chain.push(Self::on_chain_proposal(on, types)?);
            }
        }

        debug!(
            off_chain = registry.off_chain.len(),
            on_chain = registry.on_chain.len(),
            hybrid = registry.hybrid.len(),
            "proposals classified"
        );
        Ok(registry)
    }

    fn type_config(types: &ProposalTypes, type_id: u32) -> Result<&ProposalTypeConfig, ProposalError> {
        types.get(&type_id).ok_or(ProposalError::UnknownProposalType(type_id))
    }

    fn tiers(bps: &[u32]) -> Option<VetoTiers> {
        (!bps.is_empty()).then(|| VetoTiers::from_bps_list(bps))
    }

    fn on_chain_terms(on: &OnChainProposalRecord, types: &ProposalTypes) -> Result<VotingTerms, ProposalError> {
        let config = Self::type_config(types, on.proposal_type)?;
        Ok(VotingTerms {
            scheme: on.scheme,
            type_label: config.name.clone(),
            thresholds: config.thresholds(on.proposal_type)?,
            offchain_thresholds: None,
            include_abstain: config.include_abstain(on.scheme),
            veto_tiers: None,
            choices: on.choices.clone(),
        })
    }

    fn on_chain_proposal(on: &OnChainProposalRecord, types: &ProposalTypes) -> Result<Proposal, ProposalError> {
        Ok(Proposal {
            id: on.proposal_id.clone(),
            title: title_of(&on.description),
            kind: ProposalKind::OnChain { onchain_id: on.proposal_id.clone() },
            terms: Self::on_chain_terms(on, types)?,
        })
    }

    fn off_chain_proposal(off: &OffChainProposalRecord, types: &ProposalTypes) -> Result<Proposal, ProposalError> {
        let config = Self::type_config(types, off.proposal_type_id)?;
        let scheme: Scheme = off.proposal_type.parse()?;
        let tiers = if off.tiers.is_empty() { &config.tiers } else { &off.tiers };
        Ok(Proposal {
            id: off.id.clone(),
            title: title_of(&off.description),
            kind: ProposalKind::OffChain { offchain_id: off.id.clone() },
            terms: VotingTerms {
                scheme,
                type_label: off.proposal_type.clone(),
                thresholds: config.thresholds(off.proposal_type_id)?,
                offchain_thresholds: None,
                include_abstain: config.include_abstain(scheme),
                veto_tiers: Self::tiers(tiers),
                choices: off.choices.clone(),
            },
        })
    }

    /// The on-chain side decides scheme and thresholds; the off-chain side may add veto
    /// tiers and option labels. The off-chain type's thresholds are kept for the citizen-house
    /// tallies and must agree with the on-chain ones when the proposal is calculated.
    fn hybrid_proposal(
        on: &OnChainProposalRecord,
        off: &OffChainProposalRecord,
        types: &ProposalTypes,
    ) -> Result<Proposal, ProposalError> {
        let mut terms = Self::on_chain_terms(on, types)?;
        let off_config = Self::type_config(types, off.proposal_type_id)?;
        terms.offchain_thresholds = Some(off_config.thresholds(off.proposal_type_id)?);
        if let Ok(off_scheme) = off.proposal_type.parse::<Scheme>() {
            if off_scheme != terms.scheme {
                warn!(
                    onchain_id = %on.proposal_id,
                    offchain_id = %off.id,
                    onchain = %terms.scheme,
                    offchain = %off_scheme,
                    "hybrid proposal sides disagree on scheme"
                );
            }
        }
        if terms.scheme == Scheme::Optimistic {
            let config = Self::type_config(types, on.proposal_type)?;
            let tiers = if off.tiers.is_empty() { &config.tiers } else { &off.tiers };
            terms.veto_tiers = Self::tiers(tiers);
        }
        if terms.choices.is_empty() {
            terms.choices = off.choices.clone();
        }

        Ok(Proposal {
            id: format!("{}-{}", on.proposal_id, off.id),
            title: title_of(&on.description),
            kind: ProposalKind::Hybrid { onchain_id: on.proposal_id.clone(), offchain_id: off.id.clone() },
            terms,
        })
    }

    #[must_use]
    pub fn off_chain(&self) -> &[Proposal] {
        &self.off_chain
    }

    #[must_use]
    pub fn on_chain(&self) -> &[Proposal] {
        &self.on_chain
    }

    #[must_use]
    pub fn hybrid(&self) -> &[Proposal] {
        &self.hybrid
    }

    /// All proposals: off-chain, then on-chain, then hybrid.
    pub fn iter(&self) -> impl Iterator<Item = &Proposal> {
        self.off_chain.iter().chain(&self.on_chain).chain(&self.hybrid)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.off_chain.len() + self.on_chain.len() + self.hybrid.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &str) -> Result<&Proposal, ProposalError> {
        self.iter().find(|p| p.id == id).ok_or_else(|| ProposalError::NotFound(id.to_string()))
    }
}
