use std::collections::BTreeMap;

use num::Zero;
use tracing::{debug, warn};

use super::{OptimisticTally, Scheme, SupportRates, Tally, TallyError, Thresholds, TierOutcome, VetoTiers};

/// Weighted combination of per-category tallies.
///
/// Rates are averaged with the caller's weights rather than summing raw votes, because the
/// eligible pools of the categories differ.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalTally {
    pub scheme: Scheme,
    pub thresholds: Thresholds,
    pub weights: Vec<f64>,
    /// Weighted quorum; always zero for optimistic results.
    pub quorum: f64,
    /// Weighted for-rate, or weighted against-rate for optimistic results.
    pub approval: f64,
    pub relative: SupportRates,
    pub absolute: SupportRates,
    /// Weighted per-choice approval, approval scheme only.
    pub choice_approvals: BTreeMap<u32, f64>,
    pub passing_quorum: bool,
    pub passing_approval: bool,
    /// Binding tier, when veto tiers were evaluated.
    pub veto: Option<TierOutcome>,
    pub vetoed: bool,
}

impl FinalTally {
    #[must_use]
    pub fn passed(&self) -> bool {
        match self.scheme {
            Scheme::Basic | Scheme::Approval => self.passing_quorum && self.passing_approval,
            Scheme::Optimistic => !self.vetoed,
        }
    }

    /// Choices whose weighted approval meets the threshold.
    #[must_use]
    pub fn approved_choices(&self) -> Vec<u32> {
        if !self.passing_quorum {
            return Vec::new();
        }
        self.choice_approvals
            .iter()
            .filter(|(_, rate)| **rate >= self.thresholds.approval_pct)
            .map(|(choice, _)| *choice)
            .collect()
    }
}

/// Combines tallies that must all share one pair of thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedAggregator {
    thresholds: Thresholds,
    tiers: Option<VetoTiers>,
}

impl WeightedAggregator {
    #[must_use]
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds, tiers: None }
    }

    /// Veto tiers for optimistic results. Empty tiers are ignored.
    #[must_use]
    pub fn with_tiers(mut self, tiers: VetoTiers) -> Self {
        self.tiers = (!tiers.is_empty()).then_some(tiers);
        self
    }

    #[must_use]
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Combines `tallies` with `weights` (expected to sum to one; not enforced).
    ///
    /// # Errors
    /// - [`TallyError::Empty`] with no tallies
    /// - [`TallyError::WeightCountMismatch`] when the slices differ in length
    /// - [`TallyError::MixedSchemes`] when the tallies use different schemes
    /// - [`TallyError::ThresholdMismatch`] when any tally's thresholds differ from the
    ///   aggregator's, compared exactly
    pub fn combine(&self, tallies: &[Tally], weights: &[f64]) -> Result<FinalTally, TallyError> {
        let first = tallies.first().ok_or(TallyError::Empty)?;
        if tallies.len() != weights.len() {
            return Err(TallyError::WeightCountMismatch { tallies: tallies.len(), weights: weights.len() });
        }
        let scheme = first.scheme();
        for (index, tally) in tallies.iter().enumerate() {
            if tally.scheme() != scheme {
                return Err(TallyError::MixedSchemes { index, expected: scheme, found: tally.scheme() });
            }
            self.check_thresholds(index, tally.thresholds())?;
        }

        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > 1e-9 {
            warn!(sum, "tally weights do not sum to one");
        }

        let active = tallies.iter().any(|t| !t.total().is_zero());
        let weighted = |rate: fn(&Tally) -> f64| -> f64 {
            tallies.iter().zip(weights).map(|(t, w)| rate(t) * w).sum()
        };

        let quorum = weighted(Tally::quorum);
        let approval = weighted(Tally::rate);
        let (relative, absolute) = tallies.iter().zip(weights).fold(
            (SupportRates::default(), SupportRates::default()),
            |(rel, abs), (t, w)| (rel.plus(t.relative().scaled(*w)), abs.plus(t.absolute().scaled(*w))),
        );

        let mut choice_approvals = BTreeMap::new();
        for (tally, weight) in tallies.iter().zip(weights) {
            if let Tally::Approval(approval) = tally {
                for (choice, c) in &approval.choices {
                    *choice_approvals.entry(*choice).or_insert(0.0) += c.approval * weight;
                }
            }
        }

        let mut result = FinalTally {
            scheme,
            thresholds: self.thresholds,
            weights: weights.to_vec(),
            quorum,
            approval,
            relative,
            absolute,
            choice_approvals,
            passing_quorum: false,
            passing_approval: false,
            veto: None,
            vetoed: false,
        };

        match scheme {
            Scheme::Basic | Scheme::Approval => {
                result.passing_quorum = active && quorum >= self.thresholds.quorum_pct;
                result.passing_approval = active && approval >= self.thresholds.approval_pct;
            }
            Scheme::Optimistic => {
                let optimistic: Vec<&OptimisticTally> = tallies
                    .iter()
                    .filter_map(|t| match t {
                        Tally::Optimistic(o) => Some(o),
                        _ => None,
                    })
                    .collect();
                result.passing_approval = active && approval >= self.thresholds.approval_pct;
                result.veto = self.tiers.as_ref().and_then(|tiers| tiers.evaluate(&optimistic));
                result.vetoed = result.veto.map_or(result.passing_approval, |outcome| outcome.vetoed);
            }
        }

        debug!(
            scheme = %scheme,
            quorum = result.quorum,
            approval = result.approval,
            passed = result.passed(),
            "combined {} tallies",
            tallies.len()
        );
        Ok(result)
    }

    #[allow(clippy::float_cmp)]
    fn check_thresholds(&self, index: usize, found: Thresholds) -> Result<(), TallyError> {
        if found.quorum_pct != self.thresholds.quorum_pct {
            return Err(TallyError::ThresholdMismatch {
                index,
                threshold: "quorum",
                found: found.quorum_pct,
                expected: self.thresholds.quorum_pct,
            });
        }
        if found.approval_pct != self.thresholds.approval_pct {
            return Err(TallyError::ThresholdMismatch {
                index,
                threshold: "approval",
                found: found.approval_pct,
                expected: self.thresholds.approval_pct,
            });
        }
        Ok(())
    }
}
