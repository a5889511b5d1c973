//! Decoders for the attestation schemas that carry off-chain governance data.

use std::collections::HashMap;

use ethabi::{ParamType, Token};
use num::BigUint;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{decode_hex, uint_to_weight, DecodeError};
use crate::{
    tally::Scheme,
    types::{Category, Support, VoteRecord},
    upstream::Attestation,
};

fn decode_payload(schema: &str, types: &[ParamType], data: &str) -> Result<Vec<Token>, DecodeError> {
    let bytes = decode_hex(data)?;
    ethabi::decode(types, &bytes)
        .map_err(|e| DecodeError::Abi { signature: schema.to_string(), reason: e.to_string() })
}

fn invalid(field: &str, value: impl ToString) -> DecodeError {
    DecodeError::InvalidField { field: field.to_string(), value: value.to_string() }
}

fn take_uint(tokens: &mut std::vec::IntoIter<Token>, field: &str) -> Result<BigUint, DecodeError> {
    match tokens.next() {
        Some(Token::Uint(value)) => Ok(uint_to_weight(value)),
        other => Err(invalid(field, format!("{other:?}"))),
    }
}

fn take_string(tokens: &mut std::vec::IntoIter<Token>, field: &str) -> Result<String, DecodeError> {
    match tokens.next() {
        Some(Token::String(value)) => Ok(value),
        other => Err(invalid(field, format!("{other:?}"))),
    }
}

fn take_address(tokens: &mut std::vec::IntoIter<Token>, field: &str) -> Result<String, DecodeError> {
    match tokens.next() {
        Some(Token::Address(value)) => Ok(format!("0x{}", hex::encode(value.as_bytes()))),
        other => Err(invalid(field, format!("{other:?}"))),
    }
}

/// `Vote(uint256 proposalId, string params)`; params is a JSON list of integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteAttestation {
    pub proposal_id: String,
    pub params: Vec<i64>,
}

impl VoteAttestation {
    pub const SCHEMA: &'static str = "Vote(uint256,string)";

    pub fn decode(data: &str) -> Result<Self, DecodeError> {
        let mut tokens = decode_payload(Self::SCHEMA, &[ParamType::Uint(256), ParamType::String], data)?
            .into_iter();
        let proposal_id = take_uint(&mut tokens, "proposal_id")?.to_string();
        let raw_params = take_string(&mut tokens, "params")?;
        Ok(Self { proposal_id, params: parse_params(&raw_params)? })
    }
}

/// Accepts JSON numbers and numeric strings, as both appear in the wild.
fn parse_params(raw: &str) -> Result<Vec<i64>, DecodeError> {
    let values: Vec<Value> = serde_json::from_str(raw).map_err(|_| invalid("params", raw))?;
    values
        .iter()
        .map(|value| match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| invalid("params", raw))
}

/// `Citizens(uint256 farcasterId, string selectionMethod)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitizenAttestation {
    pub farcaster_id: String,
    pub selection_method: String,
}

impl CitizenAttestation {
    pub const SCHEMA: &'static str = "Citizens(uint256,string)";

    pub fn decode(data: &str) -> Result<Self, DecodeError> {
        let mut tokens = decode_payload(Self::SCHEMA, &[ParamType::Uint(256), ParamType::String], data)?
            .into_iter();
        Ok(Self {
            farcaster_id: take_uint(&mut tokens, "farcaster_id")?.to_string(),
            selection_method: take_string(&mut tokens, "selection_method")?,
        })
    }

    #[must_use]
    pub fn category(&self) -> Option<Category> {
        Category::from_selection_method(self.selection_method.trim())
    }
}

/// `CreateProposal` attestation announcing an off-chain proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalAttestation {
    pub contract: String,
    pub id: String,
    pub proposer: String,
    pub description: String,
    pub choices: Vec<String>,
    pub proposal_type_id: u32,
    pub start_block: String,
    pub end_block: String,
    pub proposal_type: String,
    pub tiers: Vec<u32>,
    pub onchain_proposal_id: String,
}

impl ProposalAttestation {
    pub const SCHEMA: &'static str = "CreateProposal(address,uint256,address,string,string[],uint8,uint256,uint256,string,uint256[],uint256)";

    pub fn decode(data: &str) -> Result<Self, DecodeError> {
        let types = [
            ParamType::Address,
            ParamType::Uint(256),
            ParamType::Address,
            ParamType::String,
            ParamType::Array(Box::new(ParamType::String)),
            ParamType::Uint(8),
            ParamType::Uint(256),
            ParamType::Uint(256),
            ParamType::String,
            ParamType::Array(Box::new(ParamType::Uint(256))),
            ParamType::Uint(256),
        ];
        let mut tokens = decode_payload(Self::SCHEMA, &types, data)?.into_iter();

        let contract = take_address(&mut tokens, "contract")?;
        let id = take_uint(&mut tokens, "id")?.to_string();
        let proposer = take_address(&mut tokens, "proposer")?;
        let description = take_string(&mut tokens, "description")?;
        let choices = match tokens.next() {
            Some(Token::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Token::String(s) => Ok(s),
                    other => Err(invalid("choices", format!("{other:?}"))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            other => return Err(invalid("choices", format!("{other:?}"))),
        };
        let type_id = take_uint(&mut tokens, "proposal_type_id")?;
        let proposal_type_id = u32::try_from(&type_id).map_err(|_| invalid("proposal_type_id", &type_id))?;
        let start_block = take_uint(&mut tokens, "start_block")?.to_string();
        let end_block = take_uint(&mut tokens, "end_block")?.to_string();
        let proposal_type = take_string(&mut tokens, "proposal_type")?;
        let tiers = match tokens.next() {
            Some(Token::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Token::Uint(v) if v <= ethabi::Uint::from(u32::MAX) => Ok(v.as_u32()),
                    other => Err(invalid("tiers", format!("{other:?}"))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            other => return Err(invalid("tiers", format!("{other:?}"))),
        };
        let onchain_proposal_id = take_uint(&mut tokens, "onchain_proposal_id")?.to_string();

        Ok(Self {
            contract,
            id,
            proposer,
            description,
            choices,
            proposal_type_id,
            start_block,
            end_block,
            proposal_type,
            tiers,
            onchain_proposal_id,
        })
    }
}

/// Maps each citizen's attester address to its house category.
///
/// Revoked attestations, undecodable payloads and unknown selection methods are skipped.
#[must_use]
pub fn citizen_categories(attestations: &[Attestation]) -> HashMap<String, Category> {
    let mut categories = HashMap::new();
    for attestation in attestations.iter().filter(|a| !a.revoked) {
        let citizen = match CitizenAttestation::decode(&attestation.data) {
            Ok(citizen) => citizen,
            Err(e) => {
                warn!(id = %attestation.id, error = %e, "skipping undecodable citizen attestation");
                continue;
            }
        };
        match citizen.category() {
            Some(category) => {
                categories.insert(attestation.attester.to_lowercase(), category);
            }
            None => debug!(
                id = %attestation.id,
                method = %citizen.selection_method,
                "skipping citizen with unknown selection method"
            ),
        }
    }
    categories
}

/// Joins vote attestations with citizen categories into weighted ballots.
///
/// Every ballot weighs 1. For approval proposals the params are the selected choices and the
/// support is `For`; otherwise `params[0]` is the support value. Ballots from unknown citizens,
/// for unknown proposals, revoked, or with unusable params are skipped.
#[must_use]
pub fn offchain_votes(
    attestations: &[Attestation],
    citizens: &HashMap<String, Category>,
    schemes: &HashMap<String, Scheme>,
) -> Vec<VoteRecord> {
    let mut votes = Vec::new();
    for attestation in attestations.iter().filter(|a| !a.revoked) {
        let vote = match VoteAttestation::decode(&attestation.data) {
            Ok(vote) => vote,
            Err(e) => {
                warn!(id = %attestation.id, error = %e, "skipping undecodable vote attestation");
                continue;
            }
        };
        let attester = attestation.attester.to_lowercase();
        let Some(category) = citizens.get(&attester).copied() else {
            debug!(id = %attestation.id, attester = %attester, "vote from non-citizen");
            continue;
        };
        let Some(scheme) = schemes.get(&vote.proposal_id).copied() else {
            debug!(id = %attestation.id, proposal_id = %vote.proposal_id, "vote for unknown proposal");
            continue;
        };

        let record = match scheme {
            Scheme::Approval => {
                let choices: Option<Vec<u32>> =
                    vote.params.iter().map(|p| u32::try_from(*p).ok()).collect();
                let Some(choices) = choices else {
                    warn!(id = %attestation.id, params = ?vote.params, "negative approval choice");
                    continue;
                };
                VoteRecord::new(&vote.proposal_id, Support::For, 1u32).with_choices(choices)
            }
            Scheme::Basic | Scheme::Optimistic => {
                let support = vote.params.first().map(|p| Support::try_from(*p));
                match support {
                    Some(Ok(support)) => VoteRecord::new(&vote.proposal_id, support, 1u32),
                    _ => {
                        warn!(id = %attestation.id, params = ?vote.params, "vote params carry no support");
                        continue;
                    }
                }
            }
        };

        votes.push(record.with_voter(attester).with_category(category));
    }
    votes
}
