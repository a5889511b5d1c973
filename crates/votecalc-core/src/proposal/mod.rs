//! Proposals and their outcome.
//!
//! A proposal is decided on-chain (token house only), off-chain (three citizen-house
//! categories) or as a hybrid of both. [`ProposalRegistry`] classifies raw proposal records,
//! [`VoteTable`] groups ballots and [`calculate`] turns both into a [`ProposalOutcome`].

pub mod calculator;
pub mod registry;
pub mod votes;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tally::{Scheme, TallyError, Thresholds, UnknownScheme, VetoTiers};

pub use calculator::{
    calculate, calculate_all, CalculationContext, CitizenCounts, LabelledTally, ProposalOutcome, TallyWeights,
};
pub use registry::{
    OffChainProposalRecord, OnChainProposalRecord, ProposalRecords, ProposalRegistry, ProposalTypeConfig,
    ProposalTypes,
};
pub use votes::VoteTable;

#[derive(Debug, Error)]
pub enum ProposalError {
    #[error(transparent)]
    UnknownScheme(#[from] UnknownScheme),

    #[error("proposal type {0} is not configured")]
    UnknownProposalType(u32),

    #[error("invalid {field} of {bps} bps for proposal type {type_id}")]
    InvalidThreshold { type_id: u32, field: &'static str, bps: u32 },

    #[error("off-chain proposal {offchain_id} references unknown on-chain proposal {onchain_id}")]
    DanglingReference { offchain_id: String, onchain_id: String },

    #[error("unrecognized proposal event {0}")]
    UnknownEvent(String),

    #[error("proposal {0} not found")]
    NotFound(String),

    #[error("no votable supply loaded for on-chain proposal {0}")]
    MissingVotableSupply(String),

    #[error("governor quorum rate {onchain} of proposal {proposal_id} differs from configured {configured}")]
    QuorumMismatch { proposal_id: String, onchain: f64, configured: f64 },

    #[error(transparent)]
    Decode(#[from] crate::events::DecodeError),

    #[error(transparent)]
    Tally(#[from] TallyError),
}

/// How a proposal is voted on and judged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VotingTerms {
    pub scheme: Scheme,
    /// Human label of the proposal type as shown in listings.
    pub type_label: String,
    pub thresholds: Thresholds,
    /// Thresholds of the off-chain proposal type of a hybrid. The citizen-house tallies carry
    /// these, so drift from `thresholds` fails aggregation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offchain_thresholds: Option<Thresholds>,
    pub include_abstain: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub veto_tiers: Option<VetoTiers>,
    /// Option labels, approval scheme only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

impl VotingTerms {
    /// Thresholds the token-house tally and the aggregator carry. Optimistic tallies have no
    /// quorum.
    #[must_use]
    pub fn tally_thresholds(&self) -> Thresholds {
        self.for_scheme(self.thresholds)
    }

    /// Thresholds the citizen-house tallies carry.
    #[must_use]
    pub fn citizen_tally_thresholds(&self) -> Thresholds {
        self.for_scheme(self.offchain_thresholds.unwrap_or(self.thresholds))
    }

    fn for_scheme(&self, thresholds: Thresholds) -> Thresholds {
        match self.scheme {
            Scheme::Basic | Scheme::Approval => thresholds,
            Scheme::Optimistic => Thresholds::new(0.0, thresholds.approval_pct),
        }
    }
}

/// Where the votes of a proposal live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposalKind {
    OnChain { onchain_id: String },
    OffChain { offchain_id: String },
    Hybrid { onchain_id: String, offchain_id: String },
}

impl ProposalKind {
    #[must_use]
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::OnChain { .. } => "⛓️",
            Self::OffChain { .. } => "⛓️\u{200d}💥",
            Self::Hybrid { .. } => "☯️",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// On-chain id, off-chain id, or `"{onchain}-{offchain}"` for hybrids.
    pub id: String,
    pub title: String,
    pub kind: ProposalKind,
    pub terms: VotingTerms,
}

impl Proposal {
    #[must_use]
    pub fn onchain_id(&self) -> Option<&str> {
        match &self.kind {
            ProposalKind::OnChain { onchain_id } | ProposalKind::Hybrid { onchain_id, .. } => Some(onchain_id),
            ProposalKind::OffChain { .. } => None,
        }
    }

    #[must_use]
    pub fn offchain_id(&self) -> Option<&str> {
        match &self.kind {
            ProposalKind::OffChain { offchain_id } | ProposalKind::Hybrid { offchain_id, .. } => Some(offchain_id),
            ProposalKind::OnChain { .. } => None,
        }
    }
}

/// First line of a proposal description.
#[must_use]
pub fn title_of(description: &str) -> String {
    description.lines().next().unwrap_or_default().trim().to_string()
}

impl fmt::Display for Proposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: id={}, title={}", self.kind.emoji(), self.terms.type_label, self.id, self.title)
    }
}
