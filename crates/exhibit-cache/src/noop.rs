//! No-op pattern store.

use async_trait::async_trait;
use exhibit_core::{CompanyPatterns, PatternStore, Result, StatementType};
use std::time::Duration;
use tracing::trace;

/// A pattern store that doesn't store anything.
///
/// `get` always returns `Ok(None)` and `put` always returns `Ok(())`. Use it to
/// run the pipeline without learning.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPatternStore;

impl NoopPatternStore {
    /// Create a new no-op store.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PatternStore for NoopPatternStore {
    async fn get(
        &self,
        _company_key: &str,
        _statement_type: StatementType,
    ) -> Result<Option<CompanyPatterns>> {
        trace!("NoopPatternStore: get called, returning None");
        Ok(None)
    }

    async fn put(
        &self,
        _company_key: &str,
        _statement_type: StatementType,
        _patterns: &CompanyPatterns,
    ) -> Result<()> {
        trace!("NoopPatternStore: put called, doing nothing");
        Ok(())
    }

    async fn invalidate_stale(&self, _ttl: Duration) -> Result<usize> {
        Ok(0)
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }
}
