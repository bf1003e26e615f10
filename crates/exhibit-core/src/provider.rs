//! Collaborator traits at the edges of the pipeline.
//!
//! This module defines the seams to services that are not part of extraction itself:
//!
//! - [`FilingProvider`] - Supplies exhibit HTML and filing metadata
//! - [`LabelMerger`] - Groups semantically equivalent line-item labels

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::Result,
    types::{Filing, Symbol},
};

/// Source of 8-K exhibit documents.
///
/// Implementations own fetching, rate limiting and decoding; the pipeline only
/// sees decoded HTML text.
#[async_trait]
pub trait FilingProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "SEC EDGAR").
    fn name(&self) -> &str;

    /// Fetches the exhibit documents for a company.
    ///
    /// Filings may be returned in any order.
    async fn fetch_filings(&self, symbol: &Symbol) -> Result<Vec<Filing>>;
}

/// Canonical label and the original labels it absorbs.
pub type LabelGroup = (String, Vec<String>);

/// Groups line-item labels that mean the same thing.
///
/// The grouping may be nondeterministic (for example a language model). An
/// implementation must never lose labels: every input label should appear in
/// exactly one group, and labels it leaves out are kept unchanged by callers.
pub trait LabelMerger: Send + Sync + Debug {
    /// Returns the name of this merger.
    fn name(&self) -> &str;

    /// Groups `labels`; `sample_values` holds one sample row per label.
    ///
    /// # Errors
    /// Returns an error if the grouping service fails.
    fn merge(&self, labels: &[String], sample_values: &[Vec<Option<f64>>])
    -> Result<Vec<LabelGroup>>;
}
