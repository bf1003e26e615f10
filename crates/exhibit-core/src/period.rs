//! Period and statement type definitions.
//!
//! This module defines [`PeriodType`] for the length of a reporting period parsed
//! from a column header, and [`StatementType`] for the financial statements the
//! pipeline assembles from exhibit tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ExtractError;

/// Length classification of a reporting period.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodType {
    /// A single quarter, or a quarter-end cumulative column.
    #[serde(rename = "Q")]
    Quarter,
    /// Six months (half year).
    #[serde(rename = "H")]
    Half,
    /// Full fiscal year.
    #[serde(rename = "Y")]
    Year,
    /// Trailing twelve months.
    #[serde(rename = "TTM")]
    TrailingTwelveMonths,
    /// Year to date without an explicit length.
    #[serde(rename = "YTD")]
    YearToDate,
}

impl PeriodType {
    /// Returns the short code used in headers and serialized output.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Quarter => "Q",
            Self::Half => "H",
            Self::Year => "Y",
            Self::TrailingTwelveMonths => "TTM",
            Self::YearToDate => "YTD",
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Financial statement kinds assembled from exhibit tables.
///
/// The declaration order is the order statements are consolidated and exported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementType {
    /// Consolidated statement of operations.
    IncomeStatement,
    /// Consolidated balance sheet.
    BalanceSheet,
    /// Consolidated statement of cash flows.
    CashFlow,
    /// GAAP to non-GAAP reconciliation.
    GaapReconciliation,
    /// Stock-based compensation breakdown by expense line.
    SbcBreakdown,
}

impl StatementType {
    /// All statement types in consolidation order.
    pub const ALL: [Self; 5] = [
        Self::IncomeStatement,
        Self::BalanceSheet,
        Self::CashFlow,
        Self::GaapReconciliation,
        Self::SbcBreakdown,
    ];

    /// Returns the snake_case key used in storage and JSON.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IncomeStatement => "income_statement",
            Self::BalanceSheet => "balance_sheet",
            Self::CashFlow => "cash_flow",
            Self::GaapReconciliation => "gaap_reconciliation",
            Self::SbcBreakdown => "sbc_breakdown",
        }
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatementType {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ExtractError::Parse(format!("Invalid statement type: {}", s)))
    }
}
