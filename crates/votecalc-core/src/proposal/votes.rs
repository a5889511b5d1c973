use std::collections::{BTreeMap, HashMap};

use crate::{
    tally::SupportWeights,
    types::{Category, VoteRecord},
};

/// Ballots grouped by proposal id.
#[derive(Debug, Clone, Default)]
pub struct VoteTable {
    by_proposal: HashMap<String, Vec<VoteRecord>>,
    len: usize,
}

impl VoteTable {
    #[must_use]
    pub fn new(records: impl IntoIterator<Item = VoteRecord>) -> Self {
        records.into_iter().collect()
    }

    pub fn push(&mut self, record: VoteRecord) {
        self.by_proposal.entry(record.proposal_id.clone()).or_default().push(record);
        self.len += 1;
    }

    #[must_use]
    pub fn votes(&self, proposal_id: &str) -> &[VoteRecord] {
        self.by_proposal.get(proposal_id).map(Vec::as_slice).unwrap_or_default()
    }

    fn selected<'a>(&'a self, proposal_id: &str, category: Option<Category>) -> impl Iterator<Item = &'a VoteRecord> {
        self.votes(proposal_id)
            .iter()
            .filter(move |record| category.is_none() || record.category == category)
    }

    /// Summed weight per support value. `None` selects every category.
    #[must_use]
    pub fn support_weights(&self, proposal_id: &str, category: Option<Category>) -> SupportWeights {
        let mut weights = SupportWeights::default();
        for record in self.selected(proposal_id, category) {
            weights.add(record.support, &record.weight);
        }
        weights
    }

    /// Per-choice weight by ballot support, seeded with `0..choice_count` so unchosen options
    /// still appear.
    #[must_use]
    pub fn choice_weights(
        &self,
        proposal_id: &str,
        category: Option<Category>,
        choice_count: usize,
    ) -> BTreeMap<u32, SupportWeights> {
        let mut choices: BTreeMap<u32, SupportWeights> =
            (0u32..).take(choice_count).map(|choice| (choice, SupportWeights::default())).collect();
        for record in self.selected(proposal_id, category) {
            for choice in record.choices.iter().flatten() {
                choices.entry(*choice).or_default().add(record.support, &record.weight);
            }
        }
        choices
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn proposal_count(&self) -> usize {
        self.by_proposal.len()
    }

    /// Every ballot, grouped by proposal in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &VoteRecord> {
        self.by_proposal.values().flatten()
    }
}

impl FromIterator<VoteRecord> for VoteTable {
    fn from_iter<I: IntoIterator<Item = VoteRecord>>(iter: I) -> Self {
        let mut table = Self::default();
        for record in iter {
            table.push(record);
        }
        table
    }
}
