//! End-to-end extraction pipeline.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use exhibit_classify::{ReconciliationClassifier, attach_scores};
use exhibit_core::{
    ExtractError, Filing, FilingProvider, FilingStatements, FinancialStatement, LabelMerger,
    PatternStore, ReconScore, Result, StatementType, Symbol, Table, company_key,
};
use exhibit_html::TableExtractor;
use exhibit_merge::{apply_label_merger, consolidate, find_best_table, table_to_statement};
use exhibit_normalize::{NumberNormalizer, PeriodNormalizer, VocabularyNormalizer};
use futures::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{artifacts::ArtifactWriter, config::PipelineConfig};

/// Outcome of extracting one exhibit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    /// At least one table was extracted.
    Success,
    /// The document holds no usable table.
    NoTablesFound,
}

/// Tables, scores and artifacts of one exhibit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Outcome.
    pub status: ExtractionStatus,
    /// Every extracted table, fully normalized, with its score attached.
    pub tables: Vec<Table>,
    /// Scores, highest first.
    pub scores: Vec<ReconScore>,
    /// Reconciliation candidates in discovery order.
    pub candidate_tables: Vec<Table>,
    /// Artifact paths by kind (`tables`, `reconciliation`).
    pub files: BTreeMap<String, PathBuf>,
}

impl ExtractionResult {
    fn empty() -> Self {
        Self {
            status: ExtractionStatus::NoTablesFound,
            tables: Vec::new(),
            scores: Vec::new(),
            candidate_tables: Vec::new(),
            files: BTreeMap::new(),
        }
    }

    /// Returns true if tables were found.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ExtractionStatus::Success
    }

    /// Renders a plain-text report of the extraction.
    #[must_use]
    pub fn summary(&self) -> String {
        if !self.is_success() {
            return "Extraction failed: no_tables_found".to_string();
        }

        let total = self.tables.len();
        let candidates = self.candidate_tables.len();
        let rate = if total > 0 {
            candidates as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        let mut summary = String::new();
        let _ = writeln!(summary, "8-K Exhibit 99.1 Extraction Summary");
        let _ = writeln!(summary, "==================================");
        let _ = writeln!(summary);
        let _ = writeln!(summary, "Tables Discovered: {}", total);
        let _ = writeln!(summary, "Reconciliation Candidates: {}", candidates);
        let _ = writeln!(summary, "Success Rate: {:.1}%", rate);
        let _ = writeln!(summary);
        let _ = writeln!(summary, "Generated Files:");
        for (kind, path) in &self.files {
            let _ = writeln!(summary, "- {}: {}", kind, path.display());
        }

        if candidates > 0 {
            let _ = writeln!(summary);
            let _ = writeln!(summary, "Top Reconciliation Candidates:");
            for (rank, score) in self
                .scores
                .iter()
                .filter(|score| score.recon_candidate)
                .take(3)
                .enumerate()
            {
                let _ = writeln!(
                    summary,
                    "{}. {} (Score: {:.1})",
                    rank + 1,
                    score.table_id,
                    score.recon_score
                );
            }
        }
        summary
    }
}

/// Runs exhibits through extraction, normalization, classification and
/// cross-filing consolidation.
///
/// # Example
///
/// ```rust,ignore
/// use exhibit::{Pipeline, PipelineConfig};
///
/// let pipeline = Pipeline::with_config(PipelineConfig::new().with_output_dir("out"))?;
/// let result = pipeline.extract_all_tables(&html, Some("0001-24-000123")).await?;
/// println!("{}", result.summary());
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    extractor: TableExtractor,
    numbers: NumberNormalizer,
    periods: PeriodNormalizer,
    vocabulary: VocabularyNormalizer,
    classifier: ReconciliationClassifier,
    artifacts: Option<ArtifactWriter>,
    label_merger: Option<Arc<dyn LabelMerger>>,
    store: Option<Arc<dyn PatternStore>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field(
                "label_merger",
                &self.label_merger.as_ref().map(|m| m.name().to_string()),
            )
            .field("store", &self.store.as_ref().map(|_| "configured"))
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline with the default configuration.
    ///
    /// # Errors
    /// See [`Pipeline::with_config`].
    pub fn new() -> Result<Self> {
        Self::with_config(PipelineConfig::default())
    }

    /// Creates a pipeline from a configuration.
    ///
    /// # Errors
    /// Returns [`ExtractError::Config`] if the classifier or vocabulary rules
    /// hold invalid patterns or thresholds.
    pub fn with_config(config: PipelineConfig) -> Result<Self> {
        let classifier = ReconciliationClassifier::with_rules(config.classifier.clone())?;
        let vocabulary = VocabularyNormalizer::with_rules(config.vocabulary.clone())?;
        let artifacts = config
            .write_artifacts
            .then(|| ArtifactWriter::new(config.output_dir.clone()));

        Ok(Self {
            config,
            extractor: TableExtractor::new(),
            numbers: NumberNormalizer::new(),
            periods: PeriodNormalizer::new(),
            vocabulary,
            classifier,
            artifacts,
            label_merger: None,
            store: None,
        })
    }

    /// Sets the label merger applied to consolidated statements.
    #[must_use]
    pub fn with_label_merger(mut self, merger: Arc<dyn LabelMerger>) -> Self {
        self.label_merger = Some(merger);
        self
    }

    /// Sets the store that learns company patterns.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn PatternStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the number, period and vocabulary normalizers over every table.
    #[must_use]
    pub fn normalize_tables(&self, tables: Vec<Table>) -> Vec<Table> {
        tables
            .into_iter()
            .map(|table| self.numbers.normalize_table(table))
            .map(|table| self.periods.normalize_table(table))
            .map(|table| self.vocabulary.normalize_table(table))
            .collect()
    }

    /// Extracts, normalizes and scores every table of an exhibit.
    ///
    /// Artifacts are written when enabled; a document without tables writes
    /// nothing and reports [`ExtractionStatus::NoTablesFound`].
    ///
    /// # Errors
    /// Returns an error only if writing the artifacts fails.
    pub async fn extract_all_tables(
        &self,
        html: &str,
        filing_id: Option<&str>,
    ) -> Result<ExtractionResult> {
        let raw = self.extractor.extract_all_tables(html);
        if raw.is_empty() {
            debug!(filing_id, "No tables found");
            return Ok(ExtractionResult::empty());
        }

        let mut tables = self.normalize_tables(raw);
        let classification = self.classifier.classify(&tables);
        attach_scores(&mut tables, &classification.scores);

        let files = match &self.artifacts {
            Some(writer) => {
                writer
                    .write(
                        filing_id,
                        &tables,
                        &classification.scores,
                        &classification.candidate_tables,
                    )
                    .await?
            }
            None => BTreeMap::new(),
        };

        debug!(
            filing_id,
            tables = tables.len(),
            candidates = classification.candidate_tables.len(),
            "Extraction complete"
        );
        Ok(ExtractionResult {
            status: ExtractionStatus::Success,
            tables,
            scores: classification.scores,
            candidate_tables: classification.candidate_tables,
            files,
        })
    }

    /// Extracts an exhibit stored on disk; the filing id defaults to the file stem.
    ///
    /// # Errors
    /// Returns [`ExtractError::Io`] if the file cannot be read, or any error
    /// of [`Pipeline::extract_all_tables`].
    pub async fn extract_from_file(
        &self,
        path: impl AsRef<Path>,
        filing_id: Option<&str>,
    ) -> Result<ExtractionResult> {
        let path = path.as_ref();
        let html = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ExtractError::Io(format!("{}: {}", path.display(), e)))?;
        let stem = path.file_stem().and_then(|s| s.to_str());
        self.extract_all_tables(&html, filing_id.or(stem)).await
    }

    /// Builds one statement per statement type from a filing's exhibit.
    ///
    /// Types without a matching table, or whose table yields no line item, are
    /// left out.
    ///
    /// # Errors
    /// See [`Pipeline::extract_all_tables`].
    pub async fn extract_statements(&self, filing: &Filing) -> Result<FilingStatements> {
        let meta = &filing.meta;
        let result = self
            .extract_all_tables(&filing.content, Some(&meta.accession_number))
            .await?;

        let mut statements = FilingStatements::new(meta.clone());
        for statement_type in StatementType::ALL {
            let Some(table) = find_best_table(&result.tables, statement_type) else {
                continue;
            };
            let statement = table_to_statement(table, Some(&meta.exhibit_url));
            if statement.is_empty() {
                continue;
            }
            debug!(
                accession = %meta.accession_number,
                %statement_type,
                table_id = %table.table_id,
                "Selected table"
            );
            statements.statements.insert(statement_type, statement);
        }
        Ok(statements)
    }

    /// Fetches a company's filings, extracts them and consolidates the result.
    ///
    /// Filings are processed concurrently up to `max_concurrent_filings` and
    /// consumed in input order. A filing that fails contributes nothing. The
    /// label merger and the pattern store are applied when configured; their
    /// failures are logged and ignored.
    ///
    /// # Errors
    /// Returns [`ExtractError::Source`] if the provider fails.
    pub async fn process_filings(
        &self,
        provider: &dyn FilingProvider,
        symbol: &Symbol,
    ) -> Result<BTreeMap<StatementType, FinancialStatement>> {
        let filings = provider
            .fetch_filings(symbol)
            .await
            .map_err(|e| match e {
                source @ ExtractError::Source { .. } => source,
                other => ExtractError::Source {
                    source_name: provider.name().to_string(),
                    message: other.to_string(),
                },
            })?;
        debug!(symbol = %symbol, provider = provider.name(), count = filings.len(), "Fetched filings");

        let outcomes: Vec<(&Filing, Result<FilingStatements>)> = stream::iter(&filings)
            .map(|filing| async move { (filing, self.extract_statements(filing).await) })
            .buffered(self.config.max_concurrent_filings.max(1))
            .collect()
            .await;

        let extracted: Vec<FilingStatements> = outcomes
            .into_iter()
            .filter_map(|(filing, outcome)| match outcome {
                Ok(statements) => Some(statements),
                Err(e) => {
                    warn!(
                        accession = %filing.meta.accession_number,
                        error = %e,
                        "Skipping filing"
                    );
                    None
                }
            })
            .collect();

        let mut consolidated = consolidate(&extracted);
        if let Some(merger) = &self.label_merger {
            for (statement_type, statement) in &mut consolidated {
                match apply_label_merger(statement, merger.as_ref()) {
                    Ok(merged) => *statement = merged,
                    Err(e) => warn!(
                        %statement_type,
                        merger = merger.name(),
                        error = %e,
                        "Label merging failed, keeping original labels"
                    ),
                }
            }
        }

        if let Some(store) = &self.store {
            learn_patterns(store.as_ref(), symbol, &consolidated).await;
        }

        info!(
            symbol = %symbol,
            filings = filings.len(),
            extracted = extracted.len(),
            statements = consolidated.len(),
            "Processed filings"
        );
        Ok(consolidated)
    }
}

async fn learn_patterns(
    store: &dyn PatternStore,
    symbol: &Symbol,
    statements: &BTreeMap<StatementType, FinancialStatement>,
) {
    let key = company_key(symbol.as_str());
    for (statement_type, statement) in statements {
        let mut patterns = match store.get(&key, *statement_type).await {
            Ok(patterns) => patterns.unwrap_or_default(),
            Err(e) => {
                warn!(company = %key, %statement_type, error = %e, "Failed to read patterns");
                continue;
            }
        };
        patterns.learn(statement);
        if let Err(e) = store.put(&key, *statement_type, &patterns).await {
            warn!(company = %key, %statement_type, error = %e, "Failed to store patterns");
        }
    }
}
