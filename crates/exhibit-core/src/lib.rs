#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/exhibit/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for SEC exhibit table extraction.
//!
//! This crate provides the foundational abstractions shared by every stage:
//!
//! - [`Table`](types::Table) and [`Cell`](types::Cell) - Extracted table grids
//! - [`NumericValue`](types::NumericValue), [`HeaderCell`](types::HeaderCell),
//!   [`LabelMatch`](types::LabelMatch), [`ReconScore`](types::ReconScore) - Stage outputs
//! - [`FinancialStatement`](statement::FinancialStatement) - Period-aligned statement data
//! - [`PatternStore`](store::PatternStore) - Learned pattern storage
//! - [`FilingProvider`](provider::FilingProvider) and [`LabelMerger`](provider::LabelMerger) -
//!   Collaborator seams

/// Error types for extraction operations.
pub mod error;
/// Period and statement type definitions.
pub mod period;
/// Collaborator traits for filing sources and label merging.
pub mod provider;
/// Period-aligned financial statements.
pub mod statement;
/// Learned pattern store trait and types.
pub mod store;
/// Core data types (Table, Cell, NumericValue, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use error::{ExtractError, Result};
pub use period::{PeriodType, StatementType};
pub use provider::{FilingProvider, LabelGroup, LabelMerger};
pub use statement::{FilingStatements, FinancialStatement, LineItem};
pub use store::{CompanyPatterns, PatternStore, company_key};
pub use types::{
    Cell, CurrencyHint, Filing, FilingMeta, HeaderCell, LabelMatch, NumericValue, PeriodInfo,
    ReconScore, ScaleHint, Symbol, Table,
};
