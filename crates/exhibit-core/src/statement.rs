//! Period-aligned financial statements.
//!
//! A [`FinancialStatement`] is the hand-off format between table extraction and
//! export: an ordered period list plus one value vector per line item. It is built
//! per filing from a selected table and consolidated across filings.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    error::{ExtractError, Result},
    period::StatementType,
    types::FilingMeta,
};

/// One line item of a statement and its value per period.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Line-item label.
    pub label: String,
    /// One entry per statement period.
    pub values: Vec<Option<f64>>,
}

impl LineItem {
    /// Creates a line item.
    #[must_use]
    pub fn new(label: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            label: label.into(),
            values,
        }
    }
}

/// Statement data aligned to an ordered list of periods.
///
/// Every line item holds exactly `periods.len()` values once the statement is
/// finished; use [`FinancialStatement::pad_to_periods`] after growing the
/// period list. Line items keep their insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatement {
    /// Period labels, unique.
    pub periods: Vec<String>,
    /// Line items in presentation order.
    pub data: Vec<LineItem>,
    /// Source exhibit URL per period label.
    pub filing_links: BTreeMap<String, String>,
}

impl FinancialStatement {
    /// Creates a statement with the given periods and no data.
    #[must_use]
    pub fn new(periods: Vec<String>) -> Self {
        Self {
            periods,
            ..Default::default()
        }
    }

    /// Appends or replaces a line item.
    #[must_use]
    pub fn with_line_item(mut self, label: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        self.insert(label, values);
        self
    }

    /// Sets the same source link for every period.
    #[must_use]
    pub fn with_filing_link(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        for period in &self.periods {
            self.filing_links.insert(period.clone(), url.clone());
        }
        self
    }

    /// Returns the values of a line item.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&[Option<f64>]> {
        self.data
            .iter()
            .find(|item| item.label == label)
            .map(|item| item.values.as_slice())
    }

    /// Inserts a line item, replacing the values of an existing one.
    pub fn insert(&mut self, label: impl Into<String>, values: Vec<Option<f64>>) {
        let label = label.into();
        match self.data.iter_mut().find(|item| item.label == label) {
            Some(item) => item.values = values,
            None => self.data.push(LineItem::new(label, values)),
        }
    }

    /// Returns the values of a line item, creating it with `len` nulls if missing.
    pub fn values_mut(&mut self, label: &str, len: usize) -> &mut Vec<Option<f64>> {
        let idx = match self.data.iter().position(|item| item.label == label) {
            Some(idx) => idx,
            None => {
                self.data.push(LineItem::new(label, vec![None; len]));
                self.data.len() - 1
            }
        };
        &mut self.data[idx].values
    }

    /// Returns the line-item labels in order.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.data.iter().map(|item| item.label.as_str()).collect()
    }

    /// Grows or truncates every value vector to the number of periods.
    pub fn pad_to_periods(&mut self) {
        let len = self.periods.len();
        for item in &mut self.data {
            item.values.resize(len, None);
        }
    }

    /// Returns true if there are no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if at least one value is present.
    ///
    /// Distinguishes "no data found" from "data found but sparse".
    #[must_use]
    pub fn has_values(&self) -> bool {
        self.data
            .iter()
            .any(|item| item.values.iter().any(Option::is_some))
    }

    /// Converts the statement to a DataFrame for export.
    ///
    /// Returns a DataFrame with a `line_item` column followed by one `f64` column
    /// per period.
    ///
    /// # Errors
    /// Returns an error if two columns end up with the same name.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.periods.len() + 1);
        columns.push(Column::new(
            "line_item".into(),
            self.data
                .iter()
                .map(|item| item.label.as_str())
                .collect::<Vec<_>>(),
        ));

        for (idx, period) in self.periods.iter().enumerate() {
            let values: Vec<Option<f64>> = self
                .data
                .iter()
                .map(|item| item.values.get(idx).copied().flatten())
                .collect();
            columns.push(Column::new(period.as_str().into(), values));
        }

        DataFrame::new(columns).map_err(|e| ExtractError::Other(e.to_string()))
    }
}

/// The statements extracted from one filing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilingStatements {
    /// Filing the statements came from.
    pub meta: FilingMeta,
    /// Statement per type; types without a usable table are absent.
    pub statements: BTreeMap<StatementType, FinancialStatement>,
}

impl FilingStatements {
    /// Creates an empty set of statements for a filing.
    #[must_use]
    pub const fn new(meta: FilingMeta) -> Self {
        Self {
            meta,
            statements: BTreeMap::new(),
        }
    }

    /// Adds a statement.
    #[must_use]
    pub fn with_statement(
        mut self,
        statement_type: StatementType,
        statement: FinancialStatement,
    ) -> Self {
        self.statements.insert(statement_type, statement);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FinancialStatement {
        FinancialStatement::new(vec!["Q1 2024".to_string(), "Q1 2023".to_string()])
            .with_line_item("Total Revenue", vec![Some(100.0), Some(90.0)])
            .with_line_item("Net income", vec![None, Some(4.0)])
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut statement = sample();
        statement.insert("Total Revenue", vec![Some(1.0), Some(2.0)]);
        assert_eq!(statement.labels(), vec!["Total Revenue", "Net income"]);
        assert_eq!(statement.get("Total Revenue"), Some(&[Some(1.0), Some(2.0)][..]));
    }

    #[test]
    fn test_pad_to_periods() {
        let mut statement = sample();
        statement.periods.push("FY 2023".to_string());
        statement.values_mut("Gross profit", 1)[0] = Some(7.0);
        statement.pad_to_periods();
        assert!(statement.data.iter().all(|item| item.values.len() == 3));
        assert_eq!(statement.get("Gross profit"), Some(&[Some(7.0), None, None][..]));
    }

    #[test]
    fn test_empty_vs_sparse() {
        let empty = FinancialStatement::new(vec!["Q1".to_string()]);
        assert!(empty.is_empty());
        assert!(!empty.has_values());

        let sparse = FinancialStatement::new(vec!["Q1".to_string()])
            .with_line_item("Revenue", vec![None]);
        assert!(!sparse.is_empty());
        assert!(!sparse.has_values());
    }

    #[test]
    fn test_to_frame() {
        let df = sample().to_frame().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);
        let revenue = df.column("Q1 2024").unwrap().f64().unwrap().get(0);
        assert_eq!(revenue, Some(100.0));
    }

    #[test]
    fn test_filing_links() {
        let statement = sample().with_filing_link("https://www.sec.gov/ex99.htm");
        assert_eq!(statement.filing_links.len(), 2);
    }
}
