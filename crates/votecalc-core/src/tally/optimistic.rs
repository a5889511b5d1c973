use std::collections::BTreeMap;

use num::Zero;
use serde::{Deserialize, Serialize};

use super::{bps_to_fraction, ensure_eligible, ratio, SupportRates, SupportWeights, TallyError, Thresholds};
use crate::types::Weight;

/// Escalating veto rules: required number of categories clearing a rate, mapped to that rate.
///
/// Iteration is always in ascending order of the required count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VetoTiers(BTreeMap<u32, f64>);

/// Result of evaluating veto tiers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierOutcome {
    /// Categories required by the binding tier.
    pub required: u32,
    /// The binding against-rate.
    pub threshold: f64,
    /// Categories that cleared `threshold`.
    pub cleared: usize,
    pub vetoed: bool,
}

impl VetoTiers {
    #[must_use]
    pub fn new(tiers: BTreeMap<u32, f64>) -> Self {
        Self(tiers)
    }

    /// Builds tiers from a list of basis-point rates, where entry `i` applies when `i + 1`
    /// categories clear it.
    ///
    /// ```
    /// use votecalc_core::tally::VetoTiers;
    ///
    /// let tiers = VetoTiers::from_bps_list(&[4000, 1500]);
    /// assert_eq!(tiers.iter().collect::<Vec<_>>(), vec![(1, 0.4), (2, 0.15)]);
    /// ```
    #[must_use]
    pub fn from_bps_list(bps: &[u32]) -> Self {
        Self((1u32..).zip(bps.iter().map(|b| bps_to_fraction(*b))).collect())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// More than one tier means cross-category escalation applies.
    #[must_use]
    pub fn is_tiered(&self) -> bool {
        self.0.len() > 1
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.0.iter().map(|(count, rate)| (*count, *rate))
    }

    /// Walks tiers in ascending count order and stops at the first whose required count is met.
    ///
    /// When no tier is met the last tier examined is reported, not vetoed. Returns `None` for
    /// empty tiers.
    #[must_use]
    pub fn evaluate(&self, tallies: &[&OptimisticTally]) -> Option<TierOutcome> {
        let mut outcome = None;
        for (required, threshold) in self.iter() {
            let cleared = tallies.iter().filter(|t| t.clears(threshold)).count();
            let vetoed = cleared >= usize::try_from(required).unwrap_or(usize::MAX);
            outcome = Some(TierOutcome { required, threshold, cleared, vetoed });
            if vetoed {
                break;
            }
        }
        outcome
    }

    /// Lowest tier rate `rate` reaches, for reporting a single category.
    #[must_use]
    pub fn lowest_tripped(&self, rate: f64) -> Option<f64> {
        self.0.values().copied().filter(|t| rate >= *t).reduce(f64::min)
    }
}

/// Veto-only tally for one category. There is no "for" side.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisticTally {
    pub votes: SupportWeights,
    pub include_abstain: bool,
    /// `against [+ abstain]`.
    pub total: Weight,
    pub eligible: Weight,
    pub against_threshold_pct: f64,
    pub relative: SupportRates,
    pub absolute: SupportRates,
    /// `against / total`.
    pub against_rate: f64,
    /// Whether `against_rate` reached the veto threshold.
    pub vetoed: bool,
    pub tiers: Option<VetoTiers>,
}

impl OptimisticTally {
    /// Any "for" weight in `votes` is ignored.
    ///
    /// # Errors
    /// [`TallyError::ZeroEligible`] when there are votes but `eligible` is zero.
    pub fn compute(
        eligible: Weight,
        against_threshold_pct: f64,
        votes: SupportWeights,
        include_abstain: bool,
        tiers: Option<VetoTiers>,
    ) -> Result<Self, TallyError> {
        let votes = SupportWeights { in_favor: Weight::zero(), ..votes };
        let total = votes.total(include_abstain);
        ensure_eligible(&total, &eligible)?;

        let against_rate = ratio(&votes.against, &total);
        let vetoed = !total.is_zero() && against_rate >= against_threshold_pct;

        Ok(Self {
            relative: SupportRates::of(&votes, &total),
            absolute: SupportRates::of(&votes, &eligible),
            against_rate,
            vetoed,
            votes,
            include_abstain,
            total,
            eligible,
            against_threshold_pct,
            tiers,
        })
    }

    /// Shared-threshold view used by the aggregator; the veto rate sits in `approval_pct`.
    #[must_use]
    pub fn thresholds(&self) -> Thresholds {
        Thresholds { quorum_pct: 0.0, approval_pct: self.against_threshold_pct }
    }

    /// Whether this category's against-rate reaches `threshold`. Zero activity never does.
    #[must_use]
    pub fn clears(&self, threshold: f64) -> bool {
        !self.total.is_zero() && self.against_rate >= threshold
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        !self.vetoed
    }
}
