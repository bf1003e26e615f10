//! Line-item label merging.

use std::collections::HashMap;

use exhibit_core::{FinancialStatement, LabelGroup, LabelMerger, Result};
use exhibit_normalize::VocabularyNormalizer;
use tracing::debug;

/// Merger that keeps every label as its own group.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityMerger;

impl LabelMerger for IdentityMerger {
    fn name(&self) -> &str {
        "identity"
    }

    fn merge(&self, labels: &[String], _: &[Vec<Option<f64>>]) -> Result<Vec<LabelGroup>> {
        Ok(labels
            .iter()
            .map(|label| (label.clone(), vec![label.clone()]))
            .collect())
    }
}

/// Merger that groups labels by their vocabulary group.
///
/// Labels the vocabulary does not recognise, including deny-listed ones, keep
/// their own text as the canonical name.
#[derive(Clone, Debug, Default)]
pub struct VocabularyMerger {
    vocabulary: VocabularyNormalizer,
}

impl VocabularyMerger {
    /// Creates a merger over the given vocabulary.
    #[must_use]
    pub const fn new(vocabulary: VocabularyNormalizer) -> Self {
        Self { vocabulary }
    }
}

impl LabelMerger for VocabularyMerger {
    fn name(&self) -> &str {
        "vocabulary"
    }

    fn merge(&self, labels: &[String], _: &[Vec<Option<f64>>]) -> Result<Vec<LabelGroup>> {
        let mut groups: Vec<LabelGroup> = Vec::new();
        for label in labels {
            let canonical = self
                .vocabulary
                .normalize_label(label)
                .label_group
                .unwrap_or_else(|| label.clone());
            match groups.iter_mut().find(|(name, _)| *name == canonical) {
                Some((_, members)) => members.push(label.clone()),
                None => groups.push((canonical, vec![label.clone()])),
            }
        }
        Ok(groups)
    }
}

/// Renames and combines the line items of a statement with a [`LabelMerger`].
///
/// Rows mapped to the same canonical name are combined by taking, per period,
/// the first non-null value in row order. Labels the merger leaves out stay as
/// they are. Periods and filing links are unchanged.
///
/// # Errors
/// Returns the merger's error; the statement is not modified in that case.
pub fn apply_label_merger(
    statement: &FinancialStatement,
    merger: &dyn LabelMerger,
) -> Result<FinancialStatement> {
    let labels: Vec<String> = statement.data.iter().map(|item| item.label.clone()).collect();
    let samples: Vec<Vec<Option<f64>>> =
        statement.data.iter().map(|item| item.values.clone()).collect();
    let groups = merger.merge(&labels, &samples)?;

    let mut canonical: HashMap<&str, &str> = HashMap::new();
    for (name, members) in &groups {
        for member in members {
            canonical.entry(member.as_str()).or_insert(name.as_str());
        }
    }

    let len = statement.periods.len();
    let mut merged = FinancialStatement {
        periods: statement.periods.clone(),
        data: Vec::new(),
        filing_links: statement.filing_links.clone(),
    };
    for item in &statement.data {
        let name = canonical
            .get(item.label.as_str())
            .copied()
            .unwrap_or(item.label.as_str());
        let values = merged.values_mut(name, len);
        for (slot, value) in values.iter_mut().zip(&item.values) {
            if slot.is_none() {
                *slot = *value;
            }
        }
    }

    debug!(
        merger = merger.name(),
        before = statement.data.len(),
        after = merged.data.len(),
        "Merged line-item labels"
    );
    Ok(merged)
}
