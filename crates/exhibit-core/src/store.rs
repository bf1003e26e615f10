//! Store trait for learned extraction patterns.
//!
//! This module defines the [`PatternStore`] trait, a key-value interface for
//! remembering what previous extractions found for a company (line-item names and
//! period header formats). The store is an optional accelerator: the pipeline
//! produces the same tables and statements with or without one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{error::Result, period::StatementType, statement::FinancialStatement};

/// What previous extractions found for one company and statement type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyPatterns {
    /// Most recently seen line-item labels, oldest first.
    pub common_line_items: Vec<String>,
    /// Most recently seen period labels, oldest first.
    pub period_formats: Vec<String>,
    /// Number of extractions folded into these patterns.
    pub extraction_count: u32,
    /// When the patterns were last updated.
    pub last_updated: Option<DateTime<Utc>>,
}

impl CompanyPatterns {
    /// Number of line-item labels retained.
    pub const MAX_LINE_ITEMS: usize = 10;
    /// Number of period labels retained.
    pub const MAX_PERIOD_FORMATS: usize = 5;

    /// Creates empty patterns.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a successful extraction into the patterns.
    ///
    /// Statements without line items are ignored.
    pub fn learn(&mut self, statement: &FinancialStatement) {
        if statement.is_empty() {
            return;
        }

        for label in statement.labels() {
            if !self.common_line_items.iter().any(|l| l == label) {
                self.common_line_items.push(label.to_string());
            }
        }
        for period in &statement.periods {
            if !self.period_formats.contains(period) {
                self.period_formats.push(period.clone());
            }
        }

        self.extraction_count += 1;
        keep_last(&mut self.common_line_items, Self::MAX_LINE_ITEMS);
        keep_last(&mut self.period_formats, Self::MAX_PERIOD_FORMATS);
        self.last_updated = Some(Utc::now());
    }
}

fn keep_last(items: &mut Vec<String>, max: usize) {
    if items.len() > max {
        items.drain(..items.len() - max);
    }
}

/// Normalizes a company name or ticker into a store key.
#[must_use]
pub fn company_key(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Trait for persisting learned company patterns.
///
/// Implementations can store patterns in various backends (SQLite, in-memory,
/// etc.) or discard them entirely.
#[async_trait]
pub trait PatternStore: Send + Sync {
    /// Retrieves the patterns for a company and statement type.
    ///
    /// Returns `Ok(Some(patterns))` if stored, `Ok(None)` if not.
    async fn get(
        &self,
        company_key: &str,
        statement_type: StatementType,
    ) -> Result<Option<CompanyPatterns>>;

    /// Stores the patterns for a company and statement type, replacing any previous entry.
    async fn put(
        &self,
        company_key: &str,
        statement_type: StatementType,
        patterns: &CompanyPatterns,
    ) -> Result<()>;

    /// Removes entries older than the specified TTL.
    ///
    /// Returns the number of entries invalidated.
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize>;

    /// Clears all stored patterns.
    async fn clear(&self) -> Result<()>;
}
