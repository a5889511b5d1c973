use std::collections::BTreeMap;

use num::Zero;

use super::{ensure_eligible, ratio, SupportRates, SupportWeights, TallyError, Thresholds};
use crate::types::Weight;

/// One option of an approval vote.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceTally {
    /// Weight of the ballots that selected this choice, by ballot support.
    pub votes: SupportWeights,
    /// Against the tally-wide participation total.
    pub relative: SupportRates,
    pub absolute: SupportRates,
    /// `for / aggregated total`.
    pub approval: f64,
    pub passing_approval: bool,
}

/// Multi-choice approval tally for one category.
///
/// Quorum comes from the aggregated per-ballot support weights, so a ballot that selects
/// several choices is counted once.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalTally {
    pub choices: BTreeMap<u32, ChoiceTally>,
    pub aggregate: SupportWeights,
    pub include_abstain: bool,
    pub total: Weight,
    pub eligible: Weight,
    pub thresholds: Thresholds,
    pub relative: SupportRates,
    pub absolute: SupportRates,
    pub quorum: f64,
    /// Aggregated `for / total`.
    pub approval: f64,
    pub passing_quorum: bool,
    pub passing_approval: bool,
}

impl ApprovalTally {
    /// # Errors
    /// [`TallyError::ZeroEligible`] when there are votes but `eligible` is zero.
    pub fn compute(
        eligible: Weight,
        thresholds: Thresholds,
        choices: BTreeMap<u32, SupportWeights>,
        aggregate: SupportWeights,
        include_abstain: bool,
    ) -> Result<Self, TallyError> {
        let total = aggregate.total(include_abstain);
        ensure_eligible(&total, &eligible)?;
        let active = !total.is_zero();

        let choices = choices
            .into_iter()
            .map(|(choice, votes)| {
                let approval = ratio(&votes.in_favor, &total);
                let tally = ChoiceTally {
                    relative: SupportRates::of(&votes, &total),
                    absolute: SupportRates::of(&votes, &eligible),
                    passing_approval: active && approval >= thresholds.approval_pct,
                    approval,
                    votes,
                };
                (choice, tally)
            })
            .collect();

        let quorum = ratio(&total, &eligible);
        let approval = ratio(&aggregate.in_favor, &total);

        Ok(Self {
            choices,
            relative: SupportRates::of(&aggregate, &total),
            absolute: SupportRates::of(&aggregate, &eligible),
            passing_quorum: active && quorum >= thresholds.quorum_pct,
            passing_approval: active && approval >= thresholds.approval_pct,
            quorum,
            approval,
            aggregate,
            include_abstain,
            total,
            eligible,
            thresholds,
        })
    }

    /// Choices that clear the approval threshold, in index order.
    #[must_use]
    pub fn approved_choices(&self) -> Vec<u32> {
        self.choices.iter().filter(|(_, c)| c.passing_approval).map(|(choice, _)| *choice).collect()
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passing_quorum && self.passing_approval
    }
}
