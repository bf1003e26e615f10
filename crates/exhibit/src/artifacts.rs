//! JSON artifacts of an extraction run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Local;
use exhibit_core::{ExtractError, ReconScore, Result, Table};
use serde::Serialize;
use tracing::debug;

/// Key of the normalized tables file in [`ExtractionResult::files`](crate::ExtractionResult::files).
pub const TABLES_ARTIFACT: &str = "tables";
/// Key of the candidates file in [`ExtractionResult::files`](crate::ExtractionResult::files).
pub const RECONCILIATION_ARTIFACT: &str = "reconciliation";

#[derive(Serialize)]
struct TablesFile<'a> {
    filing_id: Option<&'a str>,
    extraction_timestamp: &'a str,
    normalized_tables: &'a [Table],
}

#[derive(Serialize)]
struct CandidatesFile<'a> {
    filing_id: Option<&'a str>,
    extraction_timestamp: &'a str,
    candidate_tables: &'a [Table],
    scores: &'a [ReconScore],
}

/// Writes `tables_<base>.json` and `recon_candidates_<base>.json`.
///
/// `<base>` is the filing id, or `extraction_<timestamp>` without one.
#[derive(Clone, Debug)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    /// Creates a writer for the given directory; it is created on first write.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Directory receiving the artifacts.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes both artifacts and returns their paths by kind.
    ///
    /// # Errors
    /// Returns [`ExtractError::Io`] if the directory or a file cannot be
    /// written, or [`ExtractError::Serialization`] if encoding fails.
    pub async fn write(
        &self,
        filing_id: Option<&str>,
        tables: &[Table],
        scores: &[ReconScore],
        candidate_tables: &[Table],
    ) -> Result<BTreeMap<String, PathBuf>> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| ExtractError::Io(e.to_string()))?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let base = filing_id.map_or_else(|| format!("extraction_{}", timestamp), str::to_string);

        let tables_path = self.output_dir.join(format!("tables_{}.json", base));
        write_json(&tables_path, &TablesFile {
            filing_id,
            extraction_timestamp: &timestamp,
            normalized_tables: tables,
        })
        .await?;

        let candidates_path = self
            .output_dir
            .join(format!("recon_candidates_{}.json", base));
        write_json(&candidates_path, &CandidatesFile {
            filing_id,
            extraction_timestamp: &timestamp,
            candidate_tables,
            scores,
        })
        .await?;

        debug!(base = %base, dir = %self.output_dir.display(), "Wrote extraction artifacts");
        Ok(BTreeMap::from([
            (TABLES_ARTIFACT.to_string(), tables_path),
            (RECONCILIATION_ARTIFACT.to_string(), candidates_path),
        ]))
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json =
        serde_json::to_string_pretty(value).map_err(|e| ExtractError::Serialization(e.to_string()))?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| ExtractError::Io(format!("{}: {}", path.display(), e)))
}
