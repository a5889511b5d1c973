use std::{collections::HashMap, fmt};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{Proposal, ProposalError, ProposalKind, VoteTable, VotingTerms};
use crate::{
    tally::{
        ratio, ApprovalTally, BasicTally, FinalReport, FinalTally, OptimisticTally, Scheme, Tally, TallyReport,
        Thresholds, WeightedAggregator,
    },
    types::{Category, Weight},
    upstream::OnChainPools,
};

pub const TOKEN_HOUSE_LABEL: &str = "Token House";

/// Shares of each constituent tally in the final result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TallyWeights {
    /// Token house, then apps, users and chains.
    pub hybrid: Vec<f64>,
    /// Apps, users and chains.
    pub offchain: Vec<f64>,
}

impl Default for TallyWeights {
    fn default() -> Self {
        Self { hybrid: vec![1.0 / 2.0, 1.0 / 6.0, 1.0 / 6.0, 1.0 / 6.0], offchain: vec![1.0 / 3.0; 3] }
    }
}

impl TallyWeights {
    #[must_use]
    pub fn for_kind(&self, kind: &ProposalKind) -> Vec<f64> {
        match kind {
            ProposalKind::OnChain { .. } => vec![1.0],
            ProposalKind::OffChain { .. } => self.offchain.clone(),
            ProposalKind::Hybrid { .. } => self.hybrid.clone(),
        }
    }
}

/// Eligible voters per citizen-house category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitizenCounts {
    pub app: u64,
    pub user: u64,
    pub chain: u64,
}

impl Default for CitizenCounts {
    fn default() -> Self {
        Self { app: 100, user: 10_000, chain: 15 }
    }
}

impl CitizenCounts {
    #[must_use]
    pub fn get(&self, category: Category) -> Weight {
        Weight::from(match category {
            Category::App => self.app,
            Category::User => self.user,
            Category::Chain => self.chain,
        })
    }
}

/// Everything a proposal outcome is computed from.
#[derive(Debug, Clone, Default)]
pub struct CalculationContext {
    pub onchain_votes: VoteTable,
    pub offchain_votes: VoteTable,
    /// Governor figures keyed by on-chain proposal id.
    pub onchain_pools: HashMap<String, OnChainPools>,
    pub citizens: CitizenCounts,
    pub weights: TallyWeights,
}

/// A constituent tally with its report label and share.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelledTally {
    pub label: String,
    pub weight: f64,
    pub tally: Tally,
}

impl LabelledTally {
    #[must_use]
    pub fn report(&self) -> TallyReport<'_> {
        TallyReport::new(&self.label, self.weight, &self.tally)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProposalOutcome {
    pub proposal: Proposal,
    pub tallies: Vec<LabelledTally>,
    pub final_tally: FinalTally,
}

impl ProposalOutcome {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.final_tally.passed()
    }
}

impl fmt::Display for ProposalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.proposal)?;
        writeln!(f)?;
        for tally in &self.tallies {
            writeln!(f, "{}", tally.report())?;
        }
        write!(f, "{}", FinalReport::new(&self.final_tally, self.proposal.terms.include_abstain))
    }
}

fn compute_tally(
    terms: &VotingTerms,
    thresholds: Thresholds,
    eligible: Weight,
    votes: &VoteTable,
    proposal_id: &str,
    category: Option<Category>,
) -> Result<Tally, ProposalError> {
    let support = votes.support_weights(proposal_id, category);
    let tally = match terms.scheme {
        Scheme::Basic => BasicTally::compute(eligible, thresholds, support, terms.include_abstain)?.into(),
        Scheme::Approval => {
            let choices = votes.choice_weights(proposal_id, category, terms.choices.len());
            ApprovalTally::compute(eligible, thresholds, choices, support, terms.include_abstain)?.into()
        }
        Scheme::Optimistic => OptimisticTally::compute(
            eligible,
            thresholds.approval_pct,
            support,
            terms.include_abstain,
            terms.veto_tiers.clone(),
        )?
        .into(),
    };
    Ok(tally)
}

/// The governor's absolute quorum must match the configured quorum rate of a basic proposal.
fn check_onchain_quorum(proposal: &Proposal, pools: &OnChainPools) -> Result<(), ProposalError> {
    if proposal.terms.scheme != Scheme::Basic {
        return Ok(());
    }
    let onchain = ratio(&pools.quorum, &pools.votable_supply);
    let configured = proposal.terms.thresholds.quorum_pct;
    if (onchain - configured).abs() > 1e-9 {
        warn!(proposal = %proposal.id, onchain, configured, "governor quorum differs from configured quorum");
        return Err(ProposalError::QuorumMismatch { proposal_id: proposal.id.clone(), onchain, configured });
    }
    Ok(())
}

/// Computes every constituent tally of `proposal` and their weighted final result.
///
/// # Errors
/// Missing governor figures for an on-chain side, a governor quorum that disagrees with the
/// configured one, tally errors (votes against an empty
/// eligible pool) and aggregation errors such as mismatched thresholds or weight counts.
pub fn calculate(proposal: &Proposal, ctx: &CalculationContext) -> Result<ProposalOutcome, ProposalError> {
    let terms = &proposal.terms;
    let weights = ctx.weights.for_kind(&proposal.kind);
    let mut labelled: Vec<(String, Tally)> = Vec::with_capacity(weights.len());

    if let Some(onchain_id) = proposal.onchain_id() {
        let pools = ctx
            .onchain_pools
            .get(onchain_id)
            .ok_or_else(|| ProposalError::MissingVotableSupply(onchain_id.to_string()))?;
        check_onchain_quorum(proposal, pools)?;
        let tally = compute_tally(
            terms,
            terms.tally_thresholds(),
            pools.votable_supply.clone(),
            &ctx.onchain_votes,
            onchain_id,
            None,
        )?;
        labelled.push((TOKEN_HOUSE_LABEL.to_string(), tally));
    }

    if let Some(offchain_id) = proposal.offchain_id() {
        let thresholds = terms.citizen_tally_thresholds();
        for category in Category::ALL {
            let eligible = ctx.citizens.get(category);
            let tally =
                compute_tally(terms, thresholds, eligible, &ctx.offchain_votes, offchain_id, Some(category))?;
            labelled.push((category.house_label().to_string(), tally));
        }
    }

    let mut aggregator = WeightedAggregator::new(terms.tally_thresholds());
    if let Some(tiers) = &terms.veto_tiers {
        aggregator = aggregator.with_tiers(tiers.clone());
    }
    let tallies: Vec<Tally> = labelled.iter().map(|(_, tally)| tally.clone()).collect();
    let final_tally = aggregator.combine(&tallies, &weights)?;

    info!(
        proposal = %proposal.id,
        scheme = %terms.scheme,
        passed = final_tally.passed(),
        "proposal calculated"
    );

    let tallies = labelled
        .into_iter()
        .zip(&weights)
        .map(|((label, tally), weight)| LabelledTally { label, weight: *weight, tally })
        .collect();

    Ok(ProposalOutcome { proposal: proposal.clone(), tallies, final_tally })
}

/// Calculates proposals in parallel; results keep the input order.
#[must_use]
pub fn calculate_all(proposals: &[Proposal], ctx: &CalculationContext) -> Vec<Result<ProposalOutcome, ProposalError>> {
    proposals.par_iter().map(|proposal| calculate(proposal, ctx)).collect()
}
