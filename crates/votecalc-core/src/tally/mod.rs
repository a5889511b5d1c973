//! Vote tallying.
//!
//! Weights stay arbitrary-precision integers until a percentage is taken; every rate is an
//! exact big-integer ratio rounded once to `f64`.
//!
//! The meaning of the "approval" threshold differs per scheme and is kept apart by type:
//! [`BasicTally`] compares the for-rate, [`ApprovalTally`] compares each choice's for-rate and
//! [`OptimisticTally`] compares the against-rate (a veto).

pub mod aggregate;
pub mod approval;
pub mod basic;
pub mod optimistic;
pub mod report;

use std::{fmt, str::FromStr};

use num::{BigInt, BigRational, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Support, Weight};

pub use aggregate::{FinalTally, WeightedAggregator};
pub use approval::{ApprovalTally, ChoiceTally};
pub use basic::BasicTally;
pub use optimistic::{OptimisticTally, TierOutcome, VetoTiers};
pub use report::{FinalReport, TallyReport};

/// Voting scheme of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Basic,
    Approval,
    Optimistic,
}

impl Scheme {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Approval => "approval",
            Self::Optimistic => "optimistic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown voting scheme: {0}")]
pub struct UnknownScheme(pub String);

impl FromStr for Scheme {
    type Err = UnknownScheme;

    /// Accepts governor labels case-insensitively; `STANDARD` is the basic scheme.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" | "standard" => Ok(Self::Basic),
            "approval" => Ok(Self::Approval),
            "optimistic" => Ok(Self::Optimistic),
            _ => Err(UnknownScheme(s.to_string())),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quorum and approval thresholds as fractions in `0..=1`.
///
/// For optimistic tallies `approval_pct` is the veto (against) threshold and `quorum_pct` is
/// unused.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub quorum_pct: f64,
    pub approval_pct: f64,
}

impl Thresholds {
    #[must_use]
    pub fn new(quorum_pct: f64, approval_pct: f64) -> Self {
        Self { quorum_pct, approval_pct }
    }

    /// Converts basis points (`10000` = 100%).
    ///
    /// ```
    /// use votecalc_core::tally::Thresholds;
    ///
    /// let t = Thresholds::from_bps(3000, 5100);
    /// assert_eq!(t.quorum_pct, 0.3);
    /// assert_eq!(t.approval_pct, 0.51);
    /// ```
    #[must_use]
    pub fn from_bps(quorum_bps: u32, approval_bps: u32) -> Self {
        Self { quorum_pct: bps_to_fraction(quorum_bps), approval_pct: bps_to_fraction(approval_bps) }
    }
}

#[must_use]
pub fn bps_to_fraction(bps: u32) -> f64 {
    f64::from(bps) / 10_000.0
}

#[derive(Debug, Error)]
pub enum TallyError {
    /// Votes exist but nobody was eligible: a misconfigured pool.
    #[error("{total} votes cast against an eligible pool of zero")]
    ZeroEligible { total: Weight },

    #[error("{threshold} threshold mismatch: tally {index} has {found}, expected {expected}")]
    ThresholdMismatch { index: usize, threshold: &'static str, found: f64, expected: f64 },

    #[error("{tallies} tallies but {weights} weights")]
    WeightCountMismatch { tallies: usize, weights: usize },

    #[error("cannot combine a {found} tally into a {expected} result (tally {index})")]
    MixedSchemes { index: usize, expected: Scheme, found: Scheme },

    #[error("no tallies to combine")]
    Empty,
}

/// Summed weight per support value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportWeights {
    #[serde(with = "crate::types::weight_string")]
    pub against: Weight,
    #[serde(rename = "for", with = "crate::types::weight_string")]
    pub in_favor: Weight,
    #[serde(with = "crate::types::weight_string")]
    pub abstain: Weight,
}

impl SupportWeights {
    #[must_use]
    pub fn new(against: impl Into<Weight>, in_favor: impl Into<Weight>, abstain: impl Into<Weight>) -> Self {
        Self { against: against.into(), in_favor: in_favor.into(), abstain: abstain.into() }
    }

    pub fn add(&mut self, support: Support, weight: &Weight) {
        match support {
            Support::Against => self.against += weight,
            Support::For => self.in_favor += weight,
            Support::Abstain => self.abstain += weight,
        }
    }

    #[must_use]
    pub fn get(&self, support: Support) -> &Weight {
        match support {
            Support::Against => &self.against,
            Support::For => &self.in_favor,
            Support::Abstain => &self.abstain,
        }
    }

    /// Participation total: against and for, plus abstain when it counts.
    #[must_use]
    pub fn total(&self, include_abstain: bool) -> Weight {
        let mut total = &self.against + &self.in_favor;
        if include_abstain {
            total += &self.abstain;
        }
        total
    }
}

/// Per-support percentages of some denominator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportRates {
    pub against: f64,
    #[serde(rename = "for")]
    pub in_favor: f64,
    pub abstain: f64,
}

impl SupportRates {
    /// Each weight divided by `denominator`; all zero when the denominator is zero.
    #[must_use]
    pub fn of(weights: &SupportWeights, denominator: &Weight) -> Self {
        Self {
            against: ratio(&weights.against, denominator),
            in_favor: ratio(&weights.in_favor, denominator),
            abstain: ratio(&weights.abstain, denominator),
        }
    }

    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            against: self.against * factor,
            in_favor: self.in_favor * factor,
            abstain: self.abstain * factor,
        }
    }

    #[must_use]
    pub fn plus(self, other: Self) -> Self {
        Self {
            against: self.against + other.against,
            in_favor: self.in_favor + other.in_favor,
            abstain: self.abstain + other.abstain,
        }
    }
}

/// `numerator / denominator` as `f64`, or `0.0` for a zero denominator.
#[must_use]
pub fn ratio(numerator: &Weight, denominator: &Weight) -> f64 {
    if denominator.is_zero() {
        return 0.0;
    }
    BigRational::new(BigInt::from(numerator.clone()), BigInt::from(denominator.clone()))
        .to_f64()
        .unwrap_or(0.0)
}

/// Fails when there is activity but no eligible pool.
fn ensure_eligible(total: &Weight, eligible: &Weight) -> Result<(), TallyError> {
    if !total.is_zero() && eligible.is_zero() {
        return Err(TallyError::ZeroEligible { total: total.clone() });
    }
    Ok(())
}

/// One computed tally, tagged by scheme.
#[derive(Debug, Clone, PartialEq)]
pub enum Tally {
    Basic(BasicTally),
    Approval(ApprovalTally),
    Optimistic(OptimisticTally),
}

impl Tally {
    #[must_use]
    pub fn scheme(&self) -> Scheme {
        match self {
            Self::Basic(_) => Scheme::Basic,
            Self::Approval(_) => Scheme::Approval,
            Self::Optimistic(_) => Scheme::Optimistic,
        }
    }

    #[must_use]
    pub fn thresholds(&self) -> Thresholds {
        match self {
            Self::Basic(t) => t.thresholds,
            Self::Approval(t) => t.thresholds,
            Self::Optimistic(t) => t.thresholds(),
        }
    }

    /// Participation total the rates are taken over.
    #[must_use]
    pub fn total(&self) -> &Weight {
        match self {
            Self::Basic(t) => &t.total,
            Self::Approval(t) => &t.total,
            Self::Optimistic(t) => &t.total,
        }
    }

    #[must_use]
    pub fn eligible(&self) -> &Weight {
        match self {
            Self::Basic(t) => &t.eligible,
            Self::Approval(t) => &t.eligible,
            Self::Optimistic(t) => &t.eligible,
        }
    }

    /// Participation over the eligible pool; optimistic tallies have none.
    #[must_use]
    pub fn quorum(&self) -> f64 {
        match self {
            Self::Basic(t) => t.quorum,
            Self::Approval(t) => t.quorum,
            Self::Optimistic(_) => 0.0,
        }
    }

    /// The rate compared against the scheme's approval threshold: the for-rate, or the
    /// against-rate for optimistic tallies.
    #[must_use]
    pub fn rate(&self) -> f64 {
        match self {
            Self::Basic(t) => t.approval,
            Self::Approval(t) => t.approval,
            Self::Optimistic(t) => t.against_rate,
        }
    }

    /// Rates relative to the participation total.
    #[must_use]
    pub fn relative(&self) -> SupportRates {
        match self {
            Self::Basic(t) => t.relative,
            Self::Approval(t) => t.relative,
            Self::Optimistic(t) => t.relative,
        }
    }

    /// Rates relative to the eligible pool.
    #[must_use]
    pub fn absolute(&self) -> SupportRates {
        match self {
            Self::Basic(t) => t.absolute,
            Self::Approval(t) => t.absolute,
            Self::Optimistic(t) => t.absolute,
        }
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        match self {
            Self::Basic(t) => t.passed(),
            Self::Approval(t) => t.passed(),
            Self::Optimistic(t) => t.passed(),
        }
    }
}

impl From<BasicTally> for Tally {
    fn from(t: BasicTally) -> Self {
        Self::Basic(t)
    }
}

impl From<ApprovalTally> for Tally {
    fn from(t: ApprovalTally) -> Self {
        Self::Approval(t)
    }
}

impl From<OptimisticTally> for Tally {
    fn from(t: OptimisticTally) -> Self {
        Self::Optimistic(t)
    }
}
