//! Plain-text tally reports.

use std::fmt::{self, Write as _};

use super::{ApprovalTally, BasicTally, FinalTally, OptimisticTally, Scheme, SupportRates, Tally};
use crate::types::Weight;

fn mark(ok: bool) -> &'static str {
    if ok {
        "✅"
    } else {
        "❌"
    }
}

/// `rate` as a percentage with `places` decimals.
///
/// ```
/// use votecalc_core::tally::report::percent;
///
/// assert_eq!(percent(0.125, 2), "12.50%");
/// assert_eq!(percent(0.2, 0), "20%");
/// ```
#[must_use]
pub fn percent(rate: f64, places: usize) -> String {
    format!("{:.*}%", places, rate * 100.0)
}

/// One category's tally with its label and share of the final result.
#[derive(Debug, Clone, Copy)]
pub struct TallyReport<'a> {
    pub label: &'a str,
    pub weight: f64,
    pub tally: &'a Tally,
}

impl<'a> TallyReport<'a> {
    #[must_use]
    pub fn new(label: &'a str, weight: f64, tally: &'a Tally) -> Self {
        Self { label, weight, tally }
    }
}

fn heading(f: &mut fmt::Formatter<'_>, label: &str, weight: f64) -> fmt::Result {
    let mut title = format!("{label} Tally");
    if weight < 1.0 {
        let _ = write!(title, " [{} of Final]", percent(weight, 2));
    }
    writeln!(f, "{title}")?;
    writeln!(f, "{}", "-".repeat(title.chars().count()))
}

fn count_line(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    votes: &Weight,
    relative: f64,
    absolute: f64,
) -> fmt::Result {
    writeln!(
        f,
        "{:<10}{:>32} ({} of total | {} of eligible)",
        format!("{name}:"),
        votes,
        percent(relative, 1),
        percent(absolute, 1)
    )
}

fn rate_line(f: &mut fmt::Formatter<'_>, name: &str, relative: f64, absolute: f64) -> fmt::Result {
    writeln!(f, "{name}: ({} of total | {} of eligible)", percent(relative, 1), percent(absolute, 1))
}

fn verdict(passed: bool, defeat: &str) -> String {
    if passed {
        "✅ PASSING".to_string()
    } else {
        format!("❌ {defeat}")
    }
}

fn write_basic(f: &mut fmt::Formatter<'_>, t: &BasicTally) -> fmt::Result {
    writeln!(f, "{:<10}{:>32}", "Total:", t.total)?;
    writeln!(f, "{:<10}{:>32}", "Eligible:", t.eligible)?;
    count_line(f, "For", &t.votes.in_favor, t.relative.in_favor, t.absolute.in_favor)?;
    count_line(f, "Against", &t.votes.against, t.relative.against, t.absolute.against)?;
    if t.include_abstain {
        count_line(f, "Abstain", &t.votes.abstain, t.relative.abstain, t.absolute.abstain)?;
    }
    writeln!(
        f,
        "Quorum: {} {} ({}), Approval: {} {} ({}) -> {}",
        percent(t.quorum, 2),
        mark(t.passing_quorum),
        percent(t.thresholds.quorum_pct, 0),
        percent(t.approval, 2),
        mark(t.passing_approval),
        percent(t.thresholds.approval_pct, 0),
        verdict(t.passed(), "DEFEATED")
    )
}

fn write_approval(f: &mut fmt::Formatter<'_>, t: &ApprovalTally) -> fmt::Result {
    writeln!(f, "{:<16}{:>32}", "Total Votes:", t.total)?;
    writeln!(f, "{:<16}{:>32}", "Eligible Votes:", t.eligible)?;
    for (index, choice) in &t.choices {
        writeln!(
            f,
            "{:<16}{:>32} {} ({} of total | {} of eligible)",
            format!("Choice {index}:"),
            choice.votes.in_favor,
            mark(choice.passing_approval),
            percent(choice.approval, 1),
            percent(choice.absolute.in_favor, 1)
        )?;
    }
    writeln!(
        f,
        "Quorum: {} {} ({}), Approval: {} {} ({}) -> {}",
        percent(t.quorum, 2),
        mark(t.passing_quorum),
        percent(t.thresholds.quorum_pct, 0),
        percent(t.approval, 2),
        mark(t.passing_approval),
        percent(t.thresholds.approval_pct, 0),
        verdict(t.passed(), "DEFEATED")
    )
}

fn write_optimistic(f: &mut fmt::Formatter<'_>, t: &OptimisticTally) -> fmt::Result {
    writeln!(f, "{:<10}{:>32}", "Total:", t.total)?;
    writeln!(f, "{:<10}{:>32}", "Eligible:", t.eligible)?;
    count_line(f, "Against", &t.votes.against, t.relative.against, t.absolute.against)?;
    if t.include_abstain {
        count_line(f, "Abstain", &t.votes.abstain, t.relative.abstain, t.absolute.abstain)?;
    }
    match t.tiers.as_ref().filter(|tiers| tiers.is_tiered()) {
        Some(tiers) => match tiers.lowest_tripped(t.against_rate) {
            Some(lowest) => {
                writeln!(f, "Against: {} (>= {}-threshold tripped)", percent(t.against_rate, 2), percent(lowest, 2))?;
            }
            None => writeln!(f, "Against: {} (did not clear lowest threshold)", percent(t.against_rate, 2))?,
        },
        None => writeln!(
            f,
            "Against (Outcome): {} {} ({})",
            percent(t.against_rate, 2),
            mark(t.vetoed),
            percent(t.against_threshold_pct, 0)
        )?,
    }
    writeln!(f, "{}", verdict(t.passed(), "VETOED"))
}

impl fmt::Display for TallyReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, self.label, self.weight)?;
        match self.tally {
            Tally::Basic(t) => write_basic(f, t),
            Tally::Approval(t) => write_approval(f, t),
            Tally::Optimistic(t) => write_optimistic(f, t),
        }
    }
}

/// Weighted final result, printed under `label`.
#[derive(Debug, Clone, Copy)]
pub struct FinalReport<'a> {
    pub label: &'a str,
    pub tally: &'a FinalTally,
    pub include_abstain: bool,
}

impl<'a> FinalReport<'a> {
    #[must_use]
    pub fn new(tally: &'a FinalTally, include_abstain: bool) -> Self {
        Self { label: "Final", tally, include_abstain }
    }
}

fn write_rates(f: &mut fmt::Formatter<'_>, rel: SupportRates, abs: SupportRates, with_for: bool, abstain: bool) -> fmt::Result {
    if with_for {
        rate_line(f, "For", rel.in_favor, abs.in_favor)?;
    }
    rate_line(f, "Against", rel.against, abs.against)?;
    if abstain {
        rate_line(f, "Abstain", rel.abstain, abs.abstain)?;
    }
    Ok(())
}

impl fmt::Display for FinalReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.tally;
        heading(f, self.label, 1.0)?;
        match t.scheme {
            Scheme::Basic | Scheme::Approval => {
                if t.scheme == Scheme::Basic {
                    write_rates(f, t.relative, t.absolute, true, self.include_abstain)?;
                } else {
                    for (choice, rate) in &t.choice_approvals {
                        writeln!(
                            f,
                            "Choice {choice}: {} {}",
                            percent(*rate, 3),
                            mark(t.passing_quorum && *rate >= t.thresholds.approval_pct)
                        )?;
                    }
                }
                writeln!(
                    f,
                    "Quorum: {} {} ({}), Approval: {} {} ({}) -> {}",
                    percent(t.quorum, 3),
                    mark(t.passing_quorum),
                    percent(t.thresholds.quorum_pct, 0),
                    percent(t.approval, 3),
                    mark(t.passing_approval),
                    percent(t.thresholds.approval_pct, 0),
                    verdict(t.passed(), "DEFEATED")
                )
            }
            Scheme::Optimistic => {
                if let Some(veto) = t.veto {
                    writeln!(
                        f,
                        "Given relevant against-threshold is {}, and {} cleared that level (needs {}), so this proposal is...",
                        percent(veto.threshold, 2),
                        veto.cleared,
                        veto.required
                    )?;
                } else {
                    write_rates(f, t.relative, t.absolute, false, self.include_abstain)?;
                    writeln!(
                        f,
                        "Against (Outcome): {} {} ({})",
                        percent(t.approval, 2),
                        mark(t.vetoed),
                        percent(t.thresholds.approval_pct, 0)
                    )?;
                }
                writeln!(f, "{}", verdict(t.passed(), "VETOED"))
            }
        }
    }
}
