//! In-memory pattern store.

use async_trait::async_trait;
use chrono::Utc;
use exhibit_core::{CompanyPatterns, PatternStore, Result, StatementType};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Stored patterns with the time they were written, for TTL invalidation.
#[derive(Debug, Clone)]
struct StoreEntry {
    patterns: CompanyPatterns,
    stored_at: chrono::DateTime<Utc>,
}

impl StoreEntry {
    fn new(patterns: CompanyPatterns) -> Self {
        Self {
            patterns,
            stored_at: Utc::now(),
        }
    }

    fn is_stale(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.stored_at);
        age > chrono::TimeDelta::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX)
    }
}

type StoreKey = (String, StatementType);

/// Pattern store held in a `RwLock`-protected `HashMap`.
///
/// Patterns are lost when the store is dropped; useful for tests and single
/// runs.
#[derive(Debug, Default)]
pub struct InMemoryPatternStore {
    entries: RwLock<HashMap<StoreKey, StoreEntry>>,
}

impl InMemoryPatternStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl PatternStore for InMemoryPatternStore {
    #[instrument(skip(self), fields(company = %company_key, statement_type = %statement_type))]
    async fn get(
        &self,
        company_key: &str,
        statement_type: StatementType,
    ) -> Result<Option<CompanyPatterns>> {
        let entries = self.entries.read().await;
        match entries.get(&(company_key.to_string(), statement_type)) {
            Some(entry) => {
                debug!("Pattern store hit");
                Ok(Some(entry.patterns.clone()))
            }
            None => {
                debug!("Pattern store miss");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, patterns), fields(company = %company_key, statement_type = %statement_type))]
    async fn put(
        &self,
        company_key: &str,
        statement_type: StatementType,
        patterns: &CompanyPatterns,
    ) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            (company_key.to_string(), statement_type),
            StoreEntry::new(patterns.clone()),
        );
        debug!(line_items = patterns.common_line_items.len(), "Stored patterns");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_stale(ttl));
        let removed = before - entries.len();

        if removed > 0 {
            debug!("Invalidated {} stale pattern entries", removed);
        }
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        debug!("Cleared all pattern entries");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exhibit_core::FinancialStatement;

    fn learned() -> CompanyPatterns {
        let statement = FinancialStatement::new(vec!["Q1 2024".to_string()])
            .with_line_item("Total revenue", vec![Some(100.0)]);
        let mut patterns = CompanyPatterns::new();
        patterns.learn(&statement);
        patterns
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = InMemoryPatternStore::new();
        assert!(
            store
                .get("CRM", StatementType::IncomeStatement)
                .await
                .unwrap()
                .is_none()
        );

        store
            .put("CRM", StatementType::IncomeStatement, &learned())
            .await
            .unwrap();

        let patterns = store
            .get("CRM", StatementType::IncomeStatement)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(patterns.common_line_items, vec!["Total revenue"]);
        assert_eq!(patterns.extraction_count, 1);

        // Keyed by statement type too
        assert!(
            store
                .get("CRM", StatementType::CashFlow)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_memory_store_invalidate_stale() {
        let store = InMemoryPatternStore::new();
        store
            .put("CRM", StatementType::BalanceSheet, &learned())
            .await
            .unwrap();

        assert_eq!(store.invalidate_stale(Duration::from_secs(3600)).await.unwrap(), 0);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.invalidate_stale(Duration::from_millis(1)).await.unwrap(), 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_store_clear() {
        let store = InMemoryPatternStore::new();
        store
            .put("CRM", StatementType::IncomeStatement, &learned())
            .await
            .unwrap();
        store
            .put("NOW", StatementType::IncomeStatement, &learned())
            .await
            .unwrap();
        assert_eq!(store.len().await, 2);

        store.clear().await.unwrap();
        assert!(store.is_empty().await);
    }
}
