use num::Zero;

use super::{ensure_eligible, ratio, SupportRates, SupportWeights, TallyError, Thresholds};
use crate::types::Weight;

/// For / against / abstain tally for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicTally {
    pub votes: SupportWeights,
    pub include_abstain: bool,
    pub total: Weight,
    pub eligible: Weight,
    pub thresholds: Thresholds,
    pub relative: SupportRates,
    pub absolute: SupportRates,
    /// `total / eligible`.
    pub quorum: f64,
    /// `for / total`.
    pub approval: f64,
    pub passing_quorum: bool,
    pub passing_approval: bool,
}

impl BasicTally {
    /// Computes the tally.
    ///
    /// With no participation every rate is zero and both flags are false.
    ///
    /// # Errors
    /// [`TallyError::ZeroEligible`] when there are votes but `eligible` is zero.
    pub fn compute(
        eligible: Weight,
        thresholds: Thresholds,
        votes: SupportWeights,
        include_abstain: bool,
    ) -> Result<Self, TallyError> {
        let total = votes.total(include_abstain);
        ensure_eligible(&total, &eligible)?;

        let active = !total.is_zero();
        let quorum = ratio(&total, &eligible);
        let approval = ratio(&votes.in_favor, &total);

        Ok(Self {
            relative: SupportRates::of(&votes, &total),
            absolute: SupportRates::of(&votes, &eligible),
            passing_quorum: active && quorum >= thresholds.quorum_pct,
            passing_approval: active && approval >= thresholds.approval_pct,
            quorum,
            approval,
            votes,
            include_abstain,
            total,
            eligible,
            thresholds,
        })
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passing_quorum && self.passing_approval
    }
}
