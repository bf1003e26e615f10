//! Core data types for exhibit table extraction.
//!
//! This module defines the structures that flow through the pipeline:
//!
//! - [`Symbol`] - Ticker of the filing company
//! - [`Cell`] - One grid position of an extracted table
//! - [`HeaderCell`] - Header text plus its parsed period
//! - [`Table`] - A rectangular table extracted from a `<table>` element
//! - [`NumericValue`] - Typed value parsed from cell text
//! - [`LabelMatch`] - Vocabulary match for a line-item label
//! - [`ReconScore`] - Reconciliation likelihood of a table
//! - [`Filing`] / [`FilingMeta`] - Exhibit content handed over by a filing source

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::period::PeriodType;

/// A trading symbol/ticker.
///
/// Symbols are automatically uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, trimming and converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Unit scale stated for a value or a whole table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleHint {
    /// Values are in thousands.
    Thousands,
    /// Values are in millions.
    Millions,
    /// Values are in billions.
    Billions,
}

impl ScaleHint {
    /// Factor that converts a stated value into units.
    #[must_use]
    pub const fn multiplier(&self) -> f64 {
        match self {
            Self::Thousands => 1e3,
            Self::Millions => 1e6,
            Self::Billions => 1e9,
        }
    }
}

impl fmt::Display for ScaleHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Thousands => "thousands",
            Self::Millions => "millions",
            Self::Billions => "billions",
        })
    }
}

/// Currency stated for a value or a whole table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyHint {
    /// US dollar.
    Usd,
    /// Euro.
    Eur,
    /// Pound sterling.
    Gbp,
    /// Canadian dollar.
    Cad,
    /// Japanese yen.
    Jpy,
}

impl fmt::Display for CurrencyHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Cad => "CAD",
            Self::Jpy => "JPY",
        })
    }
}

/// Typed value parsed from the text of a single cell.
///
/// `number_value` is `None` exactly when parsing failed or the text is a
/// recognised non-numeric marker. The sign is already applied.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericValue {
    /// Trimmed cell text.
    pub original_text: String,
    /// Parsed value with sign applied.
    pub number_value: Option<f64>,
    /// Scale from the cell or its table.
    pub scale_hint: Option<ScaleHint>,
    /// Currency from the cell or its table.
    pub currency_hint: Option<CurrencyHint>,
    /// Whether the text was written as a negative amount.
    pub is_negative: bool,
    /// Whether the text contains a percent sign.
    pub is_percentage: bool,
    /// How the value was (or was not) parsed.
    pub parsing_notes: String,
}

impl NumericValue {
    /// Creates an unparsed value for the given text.
    #[must_use]
    pub fn new(original_text: impl Into<String>) -> Self {
        Self {
            original_text: original_text.into(),
            ..Default::default()
        }
    }

    /// Sets the parsing notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.parsing_notes = notes.into();
        self
    }

    /// Returns the value multiplied by its scale, if both are known.
    ///
    /// Percentages are never scaled.
    #[must_use]
    pub fn scaled_value(&self) -> Option<f64> {
        let value = self.number_value?;
        match self.scale_hint {
            Some(scale) if !self.is_percentage => Some(value * scale.multiplier()),
            _ => Some(value),
        }
    }
}

/// A header column's text and the period parsed from it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderCell {
    /// Header text as it appears in the table.
    pub original_header: String,
    /// End date of the period, when one could be derived.
    pub period_end_date: Option<NaiveDate>,
    /// Length of the period.
    pub period_type: Option<PeriodType>,
    /// Whether the column is cumulative from the fiscal year start.
    pub is_ytd: bool,
    /// Fiscal year of the period.
    pub fiscal_year: Option<i32>,
    /// Quarter number (1-4).
    pub quarter: Option<u8>,
    /// How the header was (or was not) parsed.
    pub parsing_notes: String,
}

/// Parsed period information; the same shape as a [`HeaderCell`].
pub type PeriodInfo = HeaderCell;

impl HeaderCell {
    /// Creates a header with no period information.
    #[must_use]
    pub fn new(original_header: impl Into<String>) -> Self {
        Self {
            original_header: original_header.into(),
            ..Default::default()
        }
    }

    /// Sets the parsing notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.parsing_notes = notes.into();
        self
    }

    /// Returns true if a period type was recognised.
    #[must_use]
    pub const fn has_period(&self) -> bool {
        self.period_type.is_some()
    }
}

/// Result of matching a line-item label against the controlled vocabulary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelMatch {
    /// Label text as found in the table.
    pub original_label: String,
    /// Canonical group, if matched.
    pub label_group: Option<String>,
    /// Why the label did or did not match.
    pub label_match_reason: String,
    /// 1.0 for exact matches, the similarity for fuzzy ones, 0.0 otherwise.
    pub confidence_score: f64,
}

impl LabelMatch {
    /// Creates a non-matching result with the given reason.
    #[must_use]
    pub fn unmatched(original_label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            original_label: original_label.into(),
            label_group: None,
            label_match_reason: reason.into(),
            confidence_score: 0.0,
        }
    }

    /// Creates a matching result.
    #[must_use]
    pub fn matched(
        original_label: impl Into<String>,
        label_group: impl Into<String>,
        reason: impl Into<String>,
        confidence_score: f64,
    ) -> Self {
        Self {
            original_label: original_label.into(),
            label_group: Some(label_group.into()),
            label_match_reason: reason.into(),
            confidence_score,
        }
    }

    /// Returns true if the label was assigned a group.
    #[must_use]
    pub const fn is_match(&self) -> bool {
        self.label_group.is_some()
    }
}

/// One grid position of an extracted table.
///
/// Position and text come from the grid builder; `value` and `label` are
/// filled in by the number and vocabulary normalizers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Table the cell belongs to.
    pub table_id: String,
    /// Row index within the data rows.
    pub row_idx: usize,
    /// Column index.
    pub col_idx: usize,
    /// Trimmed text; empty for spanned continuation positions.
    pub original_text: String,
    /// Parsed numeric value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<NumericValue>,
    /// Vocabulary match (first column only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<LabelMatch>,
}

impl Cell {
    /// Creates a cell at the given position.
    #[must_use]
    pub fn new(
        table_id: impl Into<String>,
        row_idx: usize,
        col_idx: usize,
        original_text: impl Into<String>,
    ) -> Self {
        Self {
            table_id: table_id.into(),
            row_idx,
            col_idx,
            original_text: original_text.into(),
            value: None,
            label: None,
        }
    }

    /// Returns the cell text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.original_text
    }

    /// Returns true if the cell has no text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.original_text.trim().is_empty()
    }
}

/// Reconciliation likelihood of one table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReconScore {
    /// Table the score belongs to.
    pub table_id: String,
    /// Total score, rounded to two decimals.
    pub recon_score: f64,
    /// Whether the score reaches the candidate threshold.
    pub recon_candidate: bool,
    /// One line per contributing scorer.
    pub recon_rationale: Vec<String>,
}

impl ReconScore {
    /// Creates a zero score for a table that could not be scored.
    #[must_use]
    pub fn failed(table_id: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            table_id: table_id.into(),
            recon_score: 0.0,
            recon_candidate: false,
            recon_rationale: vec![format!("Scoring failed: {}", reason)],
        }
    }
}

/// A rectangular table extracted from one `<table>` element.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Identifier unique within one extraction run (`table_000`, ...).
    pub table_id: String,
    /// Caption or nearby heading text.
    pub caption: String,
    /// Location of the element in the document.
    pub dom_path: String,
    /// `(data rows, columns)`.
    pub shape: (usize, usize),
    /// Short content hash of headers, first column and shape.
    pub fingerprint: String,
    /// One header per column.
    pub headers: Vec<HeaderCell>,
    /// Data rows, each with one cell per column.
    pub rows: Vec<Vec<Cell>>,
    /// Scale stated in the headers or caption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_hint: Option<ScaleHint>,
    /// Currency stated in the headers or caption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_hint: Option<CurrencyHint>,
    /// Reconciliation score, once classified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recon: Option<ReconScore>,
}

impl Table {
    /// Returns the header texts in column order.
    #[must_use]
    pub fn header_texts(&self) -> Vec<&str> {
        self.headers
            .iter()
            .map(|h| h.original_header.as_str())
            .collect()
    }

    /// Returns the trimmed, non-empty first-column texts of all rows.
    #[must_use]
    pub fn first_column(&self) -> Vec<&str> {
        self.rows
            .iter()
            .filter_map(|row| row.first())
            .map(|cell| cell.original_text.trim())
            .filter(|text| !text.is_empty())
            .collect()
    }

    /// Returns the number of data rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if every row has exactly one cell per header.
    #[must_use]
    pub fn is_rectangular(&self) -> bool {
        self.rows.iter().all(|row| row.len() == self.headers.len())
    }

    /// Iterates over the text of every cell, row by row.
    pub fn cell_texts(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .flat_map(|row| row.iter().map(|cell| cell.original_text.as_str()))
    }
}

/// Metadata supplied by the filing source for one exhibit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingMeta {
    /// Date the 8-K was filed.
    pub filing_date: NaiveDate,
    /// SEC accession number.
    pub accession_number: String,
    /// URL of the exhibit document.
    pub exhibit_url: String,
}

impl FilingMeta {
    /// Creates filing metadata.
    #[must_use]
    pub fn new(
        filing_date: NaiveDate,
        accession_number: impl Into<String>,
        exhibit_url: impl Into<String>,
    ) -> Self {
        Self {
            filing_date,
            accession_number: accession_number.into(),
            exhibit_url: exhibit_url.into(),
        }
    }
}

/// Exhibit HTML together with its filing metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filing {
    /// Filing metadata.
    pub meta: FilingMeta,
    /// Decoded exhibit HTML.
    pub content: String,
}

impl Filing {
    /// Creates a filing.
    #[must_use]
    pub fn new(meta: FilingMeta, content: impl Into<String>) -> Self {
        Self {
            meta,
            content: content.into(),
        }
    }
}
