//! Cross-module tally scenarios: per-category tallies flowing through `WeightedAggregator`.

use std::collections::BTreeMap;

use num::BigUint;
use votecalc_core::tally::{
    ApprovalTally, BasicTally, OptimisticTally, Scheme, SupportWeights, Tally, TallyError, Thresholds,
    VetoTiers, WeightedAggregator,
};

fn eligible(n: u32) -> BigUint {
    BigUint::from(n)
}

fn optimistic(against: u32, abstain: u32, threshold: f64) -> OptimisticTally {
    OptimisticTally::compute(eligible(1_000), threshold, SupportWeights::new(against, 0u32, abstain), true, None)
        .unwrap()
}

#[test]
fn test_basic_tally_passes_quorum_and_approval() {
    let tally = BasicTally::compute(
        eligible(1_000),
        Thresholds::new(0.2, 0.5),
        SupportWeights::new(100u32, 150u32, 0u32),
        false,
    )
    .unwrap();

    assert_eq!(tally.total, BigUint::from(250u32));
    assert!((tally.quorum - 0.25).abs() < 1e-12);
    assert!((tally.approval - 0.6).abs() < 1e-12);
    assert!(tally.passing_quorum);
    assert!(tally.passing_approval);
    assert!(tally.passed());
}

#[test]
fn test_basic_tally_abstain_only_counts_when_included() {
    let votes = SupportWeights::new(10u32, 10u32, 80u32);
    let without = BasicTally::compute(eligible(1_000), Thresholds::new(0.01, 0.5), votes.clone(), false).unwrap();
    let with = BasicTally::compute(eligible(1_000), Thresholds::new(0.01, 0.5), votes, true).unwrap();

    assert!(without.passed());
    assert_eq!(with.total, BigUint::from(100u32));
    assert!(!with.passing_approval);
}

#[test]
fn test_optimistic_all_against_is_vetoed() {
    let tally = OptimisticTally::compute(
        eligible(1_000),
        0.125,
        SupportWeights::new(200u32, 0u32, 0u32),
        false,
        None,
    )
    .unwrap();

    assert!((tally.against_rate - 1.0).abs() < f64::EPSILON);
    assert!(tally.vetoed);
    assert!(!tally.passed());
}

#[test]
fn test_optimistic_without_activity_is_never_vetoed() {
    let tally =
        OptimisticTally::compute(eligible(1_000), 0.0, SupportWeights::default(), true, None).unwrap();
    assert!(!tally.vetoed);
    assert!(tally.passed());
}

#[test]
fn test_zero_eligible_with_votes_is_an_error() {
    let err = BasicTally::compute(
        BigUint::default(),
        Thresholds::new(0.1, 0.5),
        SupportWeights::new(1u32, 0u32, 0u32),
        false,
    )
    .unwrap_err();
    assert!(matches!(err, TallyError::ZeroEligible { .. }));
}

#[test]
fn test_tiered_veto_binds_at_first_met_tier() {
    // Against-rates 0.50, 0.10 and 0.05.
    let tallies = [optimistic(50, 50, 0.125), optimistic(10, 90, 0.125), optimistic(5, 95, 0.125)];
    let tiers = VetoTiers::from_bps_list(&[4_000, 1_500]);

    let outcome = tiers.evaluate(&tallies.iter().collect::<Vec<_>>()).unwrap();
    assert_eq!(outcome.required, 1);
    assert!((outcome.threshold - 0.4).abs() < f64::EPSILON);
    assert_eq!(outcome.cleared, 1);
    assert!(outcome.vetoed);

    let combined = WeightedAggregator::new(Thresholds::new(0.0, 0.125))
        .with_tiers(tiers)
        .combine(&tallies.map(Tally::Optimistic), &[1.0 / 3.0; 3])
        .unwrap();
    assert_eq!(combined.scheme, Scheme::Optimistic);
    assert!(combined.vetoed);
    assert!(!combined.passed());
    assert_eq!(combined.veto.map(|v| v.required), Some(1));
}

#[test]
fn test_tiers_escalate_when_no_single_category_clears() {
    // Rates 0.30, 0.20 and 0.05: nobody clears 0.40, two clear 0.15.
    let tallies = [optimistic(30, 70, 0.125), optimistic(20, 80, 0.125), optimistic(5, 95, 0.125)];
    let tiers = VetoTiers::new(BTreeMap::from([(1, 0.40), (2, 0.15)]));

    let outcome = tiers.evaluate(&tallies.iter().collect::<Vec<_>>()).unwrap();
    assert_eq!(outcome.required, 2);
    assert_eq!(outcome.cleared, 2);
    assert!(outcome.vetoed);
}

#[test]
fn test_tiers_report_last_tier_when_none_met() {
    let tallies = [optimistic(10, 90, 0.125), optimistic(5, 95, 0.125)];
    let tiers = VetoTiers::from_bps_list(&[4_000, 1_500]);

    let outcome = tiers.evaluate(&tallies.iter().collect::<Vec<_>>()).unwrap();
    assert_eq!(outcome.required, 2);
    assert_eq!(outcome.cleared, 0);
    assert!(!outcome.vetoed);
}

#[test]
fn test_threshold_mismatch_is_fatal() {
    let a = BasicTally::compute(
        eligible(100),
        Thresholds::new(0.2, 0.5),
        SupportWeights::new(1u32, 9u32, 0u32),
        false,
    )
    .unwrap();
    let b = BasicTally::compute(
        eligible(100),
        Thresholds::new(0.2, 0.51),
        SupportWeights::new(1u32, 9u32, 0u32),
        false,
    )
    .unwrap();

    let err = WeightedAggregator::new(Thresholds::new(0.2, 0.5))
        .combine(&[Tally::Basic(a), Tally::Basic(b)], &[0.5, 0.5])
        .unwrap_err();

    match err {
        TallyError::ThresholdMismatch { index, threshold, .. } => {
            assert_eq!(index, 1);
            assert_eq!(threshold, "approval");
        }
        other => panic!("expected ThresholdMismatch, got {other:?}"),
    }
}

#[test]
fn test_weighted_basic_combination() {
    let thresholds = Thresholds::new(0.2, 0.5);
    // Quorum 0.5 with approval 1.0, quorum 0.1 with approval 0.0.
    let strong =
        BasicTally::compute(eligible(100), thresholds, SupportWeights::new(0u32, 50u32, 0u32), false).unwrap();
    let weak =
        BasicTally::compute(eligible(100), thresholds, SupportWeights::new(10u32, 0u32, 0u32), false).unwrap();

    let combined = WeightedAggregator::new(thresholds)
        .combine(&[Tally::Basic(strong), Tally::Basic(weak)], &[0.5, 0.5])
        .unwrap();

    assert!((combined.quorum - 0.3).abs() < 1e-12);
    assert!((combined.approval - 0.5).abs() < 1e-12);
    assert!(combined.passed());
}

#[test]
fn test_approval_choices_combine_per_choice() {
    let thresholds = Thresholds::new(0.1, 0.5);
    let tally = |first: u32, second: u32| {
        let choices = BTreeMap::from([
            (0, SupportWeights::new(0u32, first, 0u32)),
            (1, SupportWeights::new(0u32, second, 0u32)),
        ]);
        ApprovalTally::compute(eligible(100), thresholds, choices, SupportWeights::new(0u32, 40u32, 0u32), false)
            .unwrap()
    };

    let combined = WeightedAggregator::new(thresholds)
        .combine(&[Tally::Approval(tally(40, 10)), Tally::Approval(tally(20, 30))], &[0.5, 0.5])
        .unwrap();

    // Choice 0: (1.0 + 0.5) / 2, choice 1: (0.25 + 0.75) / 2.
    assert_eq!(combined.approved_choices(), vec![0, 1]);
    assert!((combined.choice_approvals[&0] - 0.75).abs() < 1e-12);
}

#[test]
fn test_mixed_schemes_are_rejected() {
    let thresholds = Thresholds::new(0.0, 0.125);
    let basic =
        BasicTally::compute(eligible(100), thresholds, SupportWeights::new(1u32, 1u32, 0u32), false).unwrap();

    let err = WeightedAggregator::new(thresholds)
        .combine(&[Tally::Basic(basic), Tally::Optimistic(optimistic(1, 0, 0.125))], &[0.5, 0.5])
        .unwrap_err();
    assert!(matches!(err, TallyError::MixedSchemes { index: 1, .. }));
}
