//! SQLite-backed pattern store.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use exhibit_core::{CompanyPatterns, ExtractError, PatternStore, Result, StatementType};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, instrument};

/// Pattern store persisted in a SQLite database.
///
/// Patterns are stored as JSON, one row per company and statement type, so
/// what a run learns is available to the next one.
#[derive(Debug)]
pub struct SqlitePatternStore {
    conn: Mutex<Connection>,
}

impl SqlitePatternStore {
    /// Opens or creates a store at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| ExtractError::Cache(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// Creates a store in an in-memory database.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| ExtractError::Cache(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS company_patterns (
                company_key TEXT NOT NULL,
                statement_type TEXT NOT NULL,
                data_json TEXT NOT NULL,
                stored_at TEXT NOT NULL,
                PRIMARY KEY (company_key, statement_type)
            )",
            [],
        )
        .map_err(|e| ExtractError::Cache(e.to_string()))?;

        debug!("SQLite pattern store schema initialized");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ExtractError::Cache(e.to_string()))
    }
}

/// Fixed-width timestamps so stored values compare correctly as text.
fn timestamp(at: chrono::DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl PatternStore for SqlitePatternStore {
    #[instrument(skip(self), fields(company = %company_key, statement_type = %statement_type))]
    async fn get(
        &self,
        company_key: &str,
        statement_type: StatementType,
    ) -> Result<Option<CompanyPatterns>> {
        let conn = self.lock()?;
        let json = conn
            .query_row(
                "SELECT data_json FROM company_patterns
                 WHERE company_key = ?1 AND statement_type = ?2",
                params![company_key, statement_type.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|e| ExtractError::Cache(e.to_string()))?;

        match json {
            Some(json) => {
                let patterns: CompanyPatterns = serde_json::from_str(&json)
                    .map_err(|e| ExtractError::Serialization(e.to_string()))?;
                debug!("Found stored patterns");
                Ok(Some(patterns))
            }
            None => {
                debug!("No stored patterns found");
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
        let data_json = serde_json::to_string(patterns)
            .map_err(|e| ExtractError::Serialization(e.to_string()))?;
        let stored_at = timestamp(Utc::now());

        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO company_patterns
             (company_key, statement_type, data_json, stored_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![company_key, statement_type.as_str(), data_json, stored_at],
        )
        .map_err(|e| ExtractError::Cache(e.to_string()))?;

        debug!("Stored patterns");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(ttl)
                .map_err(|e| ExtractError::Cache(format!("Invalid TTL duration: {}", e)))?;

        let conn = self.lock()?;
        let deleted = conn
            .execute(
                "DELETE FROM company_patterns WHERE stored_at < ?1",
                params![timestamp(cutoff)],
            )
            .map_err(|e| ExtractError::Cache(e.to_string()))?;

        if deleted > 0 {
            debug!("Invalidated {} stale pattern entries", deleted);
        }
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM company_patterns", [])
            .map_err(|e| ExtractError::Cache(e.to_string()))?;

        debug!("Cleared all pattern entries");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exhibit_core::FinancialStatement;

    fn learned(labels: &[&str]) -> CompanyPatterns {
        let statement = labels.iter().fold(
            FinancialStatement::new(vec!["Three Months Ended March 31, 2024".to_string()]),
            |statement, label| statement.with_line_item(*label, vec![Some(1.0)]),
        );
        let mut patterns = CompanyPatterns::new();
        patterns.learn(&statement);
        patterns
    }

    #[tokio::test]
    async fn test_sqlite_store_initialization() {
        assert!(SqlitePatternStore::in_memory().is_ok());
    }

    #[tokio::test]
    async fn test_sqlite_store_roundtrip_and_replace() {
        let store = SqlitePatternStore::in_memory().unwrap();
        assert!(
            store
                .get("CRM", StatementType::GaapReconciliation)
                .await
                .unwrap()
                .is_none()
        );

        store
            .put("CRM", StatementType::GaapReconciliation, &learned(&["GAAP net income"]))
            .await
            .unwrap();
        store
            .put("CRM", StatementType::GaapReconciliation, &learned(&["Non-GAAP net income"]))
            .await
            .unwrap();

        let patterns = store
            .get("CRM", StatementType::GaapReconciliation)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(patterns.common_line_items, vec!["Non-GAAP net income"]);
        assert_eq!(
            patterns.period_formats,
            vec!["Three Months Ended March 31, 2024"]
        );
        assert!(patterns.last_updated.is_some());
    }

    #[tokio::test]
    async fn test_sqlite_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.db");

        {
            let store = SqlitePatternStore::new(&path).unwrap();
            store
                .put("NOW", StatementType::IncomeStatement, &learned(&["Revenue"]))
                .await
                .unwrap();
        }

        let reopened = SqlitePatternStore::new(&path).unwrap();
        let patterns = reopened
            .get("NOW", StatementType::IncomeStatement)
            .await
            .unwrap();
        assert_eq!(patterns.map(|p| p.common_line_items), Some(vec!["Revenue".to_string()]));
    }

    #[tokio::test]
    async fn test_sqlite_store_invalidate_and_clear() {
        let store = SqlitePatternStore::in_memory().unwrap();
        store
            .put("CRM", StatementType::CashFlow, &learned(&["Net cash"]))
            .await
            .unwrap();
        store
            .put("NOW", StatementType::CashFlow, &learned(&["Net cash"]))
            .await
            .unwrap();

        assert_eq!(store.invalidate_stale(Duration::from_secs(3600)).await.unwrap(), 0);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.invalidate_stale(Duration::from_millis(1)).await.unwrap(), 2);

        store
            .put("CRM", StatementType::CashFlow, &learned(&["Net cash"]))
            .await
            .unwrap();
        store.clear().await.unwrap();
        assert!(store.get("CRM", StatementType::CashFlow).await.unwrap().is_none());
    }
}
