//! Reconciliation classifier.

use std::collections::{HashMap, HashSet};

use exhibit_core::{ExtractError, ReconScore, Result, Table};
use regex::Regex;
use tracing::{debug, warn};

use crate::rules::{ClassifierRules, WeightedTerm};

/// Scores of a batch of tables plus the candidate tables themselves.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Classification {
    /// One score per table, highest first; ties keep discovery order.
    pub scores: Vec<ReconScore>,
    /// Tables among the top candidates, in discovery order.
    pub candidate_tables: Vec<Table>,
}

impl Classification {
    /// Returns the id of the best-scoring candidate.
    #[must_use]
    pub fn top_candidate_id(&self) -> Option<&str> {
        self.scores
            .iter()
            .find(|score| score.recon_candidate)
            .map(|score| score.table_id.as_str())
    }
}

#[derive(Clone, Debug)]
struct CompiledTerm {
    pattern: String,
    regex: Regex,
    weight: f64,
}

/// Scores tables for how likely they are GAAP to non-GAAP reconciliations.
///
/// The score is the sum of five components computed over the caption, the
/// headers and the first-column labels: keyword counts, table shape, phrase
/// patterns, GAAP/non-GAAP balance and the density of adjustment lines in the
/// first column. Each component adds lines to the rationale.
#[derive(Clone, Debug)]
pub struct ReconciliationClassifier {
    rules: ClassifierRules,
    recon_phrases: Vec<CompiledTerm>,
    statement_phrases: Vec<CompiledTerm>,
    recon_items: Vec<Regex>,
    statement_items: Vec<Regex>,
}

impl ReconciliationClassifier {
    /// Creates a classifier with the built-in rules.
    ///
    /// # Errors
    /// Never fails for the built-in rules; see [`Self::with_rules`].
    pub fn new() -> Result<Self> {
        Self::with_rules(ClassifierRules::default())
    }

    /// Creates a classifier from custom rules.
    ///
    /// # Errors
    /// Returns [`ExtractError::Config`] if a phrase or item pattern is not a
    /// valid regex.
    pub fn with_rules(rules: ClassifierRules) -> Result<Self> {
        Ok(Self {
            recon_phrases: compile_terms(&rules.recon_phrases)?,
            statement_phrases: compile_terms(&rules.statement_phrases)?,
            recon_items: compile_patterns(&rules.recon_item_patterns)?,
            statement_items: compile_patterns(&rules.statement_item_patterns)?,
            rules,
        })
    }

    /// Returns the active rules.
    #[must_use]
    pub const fn rules(&self) -> &ClassifierRules {
        &self.rules
    }

    /// Scores one table.
    ///
    /// # Errors
    /// Returns [`ExtractError::InvalidTable`] if the rows disagree with the
    /// table's shape.
    pub fn score_table(&self, table: &Table) -> Result<ReconScore> {
        validate_shape(table)?;

        let first_column = table.first_column();
        let all_text = format!(
            "{} {} {}",
            table.caption,
            table.header_texts().join(" "),
            first_column.join(" ")
        )
        .to_lowercase();

        let mut score = 0.0;
        let mut rationale = Vec::new();
        for (points, lines) in [
            self.score_keywords(&all_text),
            self.score_shape(table.shape),
            self.score_phrases(&all_text),
            self.score_gaap_balance(&all_text),
            self.score_density(&first_column),
        ] {
            score += points;
            rationale.extend(lines);
        }

        let recon_score = (score * 100.0).round() / 100.0;
        Ok(ReconScore {
            table_id: table.table_id.clone(),
            recon_score,
            recon_candidate: recon_score >= self.rules.threshold,
            recon_rationale: rationale,
        })
    }

    /// Scores every table, highest score first.
    ///
    /// A table that cannot be scored gets a zero score whose rationale holds
    /// the error, so the output always has one entry per input table.
    #[must_use]
    pub fn score_all_tables(&self, tables: &[Table]) -> Vec<ReconScore> {
        let mut scores: Vec<ReconScore> = tables
            .iter()
            .map(|table| {
                self.score_table(table).unwrap_or_else(|e| {
                    warn!(table_id = %table.table_id, error = %e, "Failed to score table");
                    ReconScore::failed(&table.table_id, e)
                })
            })
            .collect();

        scores.sort_by(|a, b| b.recon_score.total_cmp(&a.recon_score));
        scores
    }

    /// Returns the candidate scores, best first, at most `max_candidates`.
    #[must_use]
    pub fn get_top_candidates(&self, tables: &[Table]) -> Vec<ReconScore> {
        self.top_candidates(&self.score_all_tables(tables))
    }

    fn top_candidates(&self, scores: &[ReconScore]) -> Vec<ReconScore> {
        scores
            .iter()
            .filter(|score| score.recon_candidate)
            .take(self.rules.max_candidates)
            .cloned()
            .collect()
    }

    /// Scores a batch and collects the candidate tables.
    #[must_use]
    pub fn classify(&self, tables: &[Table]) -> Classification {
        let scores = self.score_all_tables(tables);
        let candidate_ids: HashSet<String> = self
            .top_candidates(&scores)
            .into_iter()
            .map(|score| score.table_id)
            .collect();

        let candidate_tables: Vec<Table> = tables
            .iter()
            .filter(|table| candidate_ids.contains(&table.table_id))
            .cloned()
            .collect();

        debug!(
            tables = tables.len(),
            candidates = candidate_tables.len(),
            "Classified tables"
        );
        Classification {
            scores,
            candidate_tables,
        }
    }

    fn score_keywords(&self, text: &str) -> (f64, Vec<String>) {
        let mut score = 0.0;
        let mut rationale = Vec::new();

        for term in &self.rules.keyword_weights {
            let keyword = term.pattern.to_lowercase();
            if keyword.is_empty() {
                continue;
            }
            let count = text.matches(keyword.as_str()).count();
            if count > 0 {
                let points = term.weight * count as f64;
                score += points;
                rationale.push(format!(
                    "Keyword '{}': {}x (score: +{})",
                    term.pattern, count, points
                ));
            }
        }

        (score, rationale)
    }

    fn score_shape(&self, (rows, cols): (usize, usize)) -> (f64, Vec<String>) {
        let shape = &self.rules.shape;
        let mut score = 0.0;
        let mut rationale = Vec::new();

        if (shape.min_cols..=shape.max_cols).contains(&cols) {
            score += self.rules.column_score;
            rationale.push(format!(
                "Good column count: {} (score: +{})",
                cols, self.rules.column_score
            ));
        } else {
            rationale.push(format!("Poor column count: {} (score: 0)", cols));
        }

        if (shape.min_rows..=shape.max_rows).contains(&rows) {
            score += self.rules.row_score;
            rationale.push(format!(
                "Good row count: {} (score: +{})",
                rows, self.rules.row_score
            ));
        } else {
            rationale.push(format!("Poor row count: {} (score: 0)", rows));
        }

        let (min_rows, max_rows) = shape.typical_rows;
        let (min_cols, max_cols) = shape.typical_cols;
        if (min_rows..=max_rows).contains(&rows) && (min_cols..=max_cols).contains(&cols) {
            score += self.rules.typical_size_score;
            rationale.push(format!(
                "Typical reconciliation size: {}x{} (score: +{})",
                rows, cols, self.rules.typical_size_score
            ));
        }

        (score, rationale)
    }

    fn score_phrases(&self, text: &str) -> (f64, Vec<String>) {
        let mut score = 0.0;
        let mut rationale = Vec::new();

        for term in &self.recon_phrases {
            let count = term.regex.find_iter(text).count();
            if count > 0 {
                let points = term.weight * count as f64;
                score += points;
                rationale.push(format!(
                    "Reconciliation phrase '{}': {}x (score: +{})",
                    term.pattern, count, points
                ));
            }
        }

        for term in &self.statement_phrases {
            let count = term.regex.find_iter(text).count();
            if count > 0 {
                let points = term.weight * count as f64;
                score += points;
                rationale.push(format!(
                    "Statement phrase '{}': {}x (score: {})",
                    term.pattern, count, points
                ));
            }
        }

        (score, rationale)
    }

    fn score_gaap_balance(&self, text: &str) -> (f64, Vec<String>) {
        let gaap = text.matches("gaap").count();
        let other = text.matches("non-gaap").count()
            + text.matches("non gaap").count()
            + text.matches("adjusted").count();

        let mut score = 0.0;
        let mut rationale = Vec::new();

        if gaap > 0 && other > 0 {
            let points = self.rules.balance_weight * gaap.min(other) as f64;
            score += points;
            rationale.push(format!(
                "GAAP/Non-GAAP balance: {} GAAP, {} Non-GAAP/Adjusted (score: +{})",
                gaap, other, points
            ));
        }

        if gaap >= self.rules.multiple_gaap_mentions {
            score += self.rules.multiple_gaap_bonus;
            rationale.push(format!(
                "Multiple GAAP mentions: {} (score: +{})",
                gaap, self.rules.multiple_gaap_bonus
            ));
        }

        (score, rationale)
    }

    fn score_density(&self, first_column: &[&str]) -> (f64, Vec<String>) {
        if first_column.is_empty() {
            return (0.0, vec!["No first column data".to_string()]);
        }

        let total = first_column.len();
        let recon_matches = first_column
            .iter()
            .filter(|item| self.recon_items.iter().any(|re| re.is_match(item)))
            .count();
        let statement_matches = first_column
            .iter()
            .filter(|item| self.statement_items.iter().any(|re| re.is_match(item)))
            .count();

        let recon_density = recon_matches as f64 / total as f64;
        let statement_density = statement_matches as f64 / total as f64;
        let recon_points = recon_density * self.rules.recon_density_weight;
        let statement_points = statement_density * self.rules.statement_density_weight;
        let score = recon_points - statement_points;

        let mut rationale = vec![format!(
            "Reconciliation items: {}/{} = {:.2} (+{:.1})",
            recon_matches, total, recon_density, recon_points
        )];
        if statement_matches > 0 {
            rationale.push(format!(
                "Statement items: {}/{} = {:.2} (-{:.1})",
                statement_matches, total, statement_density, statement_points
            ));
        }
        rationale.push(format!("Net density score: {:.1}", score));

        (score, rationale)
    }
}

/// Stores each table's score on the table.
pub fn attach_scores(tables: &mut [Table], scores: &[ReconScore]) {
    let by_id: HashMap<&str, &ReconScore> = scores
        .iter()
        .map(|score| (score.table_id.as_str(), score))
        .collect();
    for table in tables {
        table.recon = by_id.get(table.table_id.as_str()).map(|score| (*score).clone());
    }
}

fn validate_shape(table: &Table) -> Result<()> {
    let (rows, cols) = table.shape;
    if rows != table.rows.len() || cols != table.headers.len() || !table.is_rectangular() {
        return Err(ExtractError::InvalidTable {
            table_id: table.table_id.clone(),
            reason: format!(
                "shape {}x{} does not match {} rows and {} headers",
                rows,
                cols,
                table.rows.len(),
                table.headers.len()
            ),
        });
    }
    Ok(())
}

fn compile_terms(terms: &[WeightedTerm]) -> Result<Vec<CompiledTerm>> {
    terms
        .iter()
        .map(|term| {
            Ok(CompiledTerm {
                pattern: term.pattern.clone(),
                regex: compile(&term.pattern)?,
                weight: term.weight,
            })
        })
        .collect()
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| compile(p)).collect()
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ExtractError::Config(format!("pattern {:?}: {}", pattern, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use exhibit_core::{Cell, HeaderCell};

    fn table(id: &str, caption: &str, headers: &[&str], labels: &[&str]) -> Table {
        let rows: Vec<Vec<Cell>> = labels
            .iter()
            .enumerate()
            .map(|(r, label)| {
                headers
                    .iter()
                    .enumerate()
                    .map(|(c, _)| {
                        let text = if c == 0 { label.to_string() } else { "1".to_string() };
                        Cell::new(id, r, c, text)
                    })
                    .collect()
            })
            .collect();
        Table {
            table_id: id.to_string(),
            caption: caption.to_string(),
            shape: (rows.len(), headers.len()),
            headers: headers.iter().map(|h| HeaderCell::new(*h)).collect(),
            rows,
            ..Default::default()
        }
    }

    const RECON_LABELS: &[&str] = &[
        "GAAP operating income",
        "Stock-based compensation",
        "Amortization of intangible assets",
        "Restructuring",
        "Non-GAAP operating income",
    ];

    fn classifier() -> ReconciliationClassifier {
        ReconciliationClassifier::new().unwrap()
    }

    #[test]
    fn test_reconciliation_scores_high() {
        let t = table(
            "table_003",
            "Reconciliation of GAAP to Non-GAAP Operating Income",
            &["Item", "Q1 2024", "Q1 2023"],
            RECON_LABELS,
        );
        let score = classifier().score_table(&t).unwrap();
        assert!(score.recon_candidate);
        assert!(score.recon_score >= 25.0);
        assert!(
            score
                .recon_rationale
                .contains(&"Keyword 'reconciliation': 1x (score: +10)".to_string())
        );
        assert!(
            score
                .recon_rationale
                .contains(&"Typical reconciliation size: 5x3 (score: +2)".to_string())
        );
        assert!(
            score
                .recon_rationale
                .contains(&"Reconciliation items: 3/5 = 0.60 (+9.0)".to_string())
        );
    }

    #[test]
    fn test_income_statement_scores_low() {
        let t = table(
            "table_001",
            "Condensed Consolidated Statements of Operations",
            &["Item", "Q1 2024", "Q1 2023"],
            &[
                "Subscription",
                "Services",
                "Total revenue",
                "Cost of revenue",
                "Gross profit",
                "Research and development",
            ],
        );
        let score = classifier().score_table(&t).unwrap();
        assert!(!score.recon_candidate);
        assert!(
            score
                .recon_rationale
                .iter()
                .any(|line| line.starts_with("Statement phrase"))
        );
        assert!(
            score
                .recon_rationale
                .iter()
                .any(|line| line.starts_with("Statement items: 6/6"))
        );
    }

    #[test]
    fn test_monotonic_in_keywords() {
        let headers = ["Item", "Q1 2024", "Q1 2023"];
        let base = table("table_000", "Reconciliation", &headers, RECON_LABELS);
        let richer = table(
            "table_001",
            "Reconciliation of GAAP net income to adjusted net income",
            &headers,
            RECON_LABELS,
        );
        let c = classifier();
        assert!(
            c.score_table(&richer).unwrap().recon_score >= c.score_table(&base).unwrap().recon_score
        );
    }

    #[test]
    fn test_invalid_table_gets_zero_score() {
        let mut broken = table("table_007", "Reconciliation", &["Item", "2024"], &["GAAP"]);
        broken.rows[0].pop();
        let good = table("table_008", "", &["Item", "2024"], &["Revenue"]);

        let c = classifier();
        assert!(matches!(
            c.score_table(&broken),
            Err(ExtractError::InvalidTable { .. })
        ));

        let scores = c.score_all_tables(&[broken, good]);
        assert_eq!(scores.len(), 2);
        let failed = scores.iter().find(|s| s.table_id == "table_007").unwrap();
        assert_eq!(failed.recon_score, 0.0);
        assert!(!failed.recon_candidate);
        assert!(failed.recon_rationale[0].starts_with("Scoring failed: Invalid table table_007"));
    }

    #[test]
    fn test_ties_keep_discovery_order() {
        let tables = vec![
            table("table_000", "", &["A", "B"], &["x"]),
            table("table_001", "", &["A", "B"], &["x"]),
            table("table_002", "", &["A", "B"], &["x"]),
        ];
        let ids: Vec<String> = classifier()
            .score_all_tables(&tables)
            .into_iter()
            .map(|s| s.table_id)
            .collect();
        assert_eq!(ids, vec!["table_000", "table_001", "table_002"]);
    }

    #[test]
    fn test_classify_limits_candidates() {
        let headers = ["Item", "Q1 2024", "Q1 2023"];
        let tables: Vec<Table> = (0..10)
            .map(|i| {
                table(
                    &format!("table_{:03}", i),
                    "Reconciliation of GAAP to Non-GAAP Net Income",
                    &headers,
                    RECON_LABELS,
                )
            })
            .collect();
        let c = ReconciliationClassifier::with_rules(
            ClassifierRules::default().with_max_candidates(3),
        )
        .unwrap();

        let classification = c.classify(&tables);
        assert_eq!(classification.scores.len(), 10);
        assert_eq!(classification.candidate_tables.len(), 3);
        assert_eq!(classification.candidate_tables[0].table_id, "table_000");
        assert_eq!(classification.top_candidate_id(), Some("table_000"));
    }

    #[test]
    fn test_threshold_configurable() {
        let t = table("table_000", "", &["A", "B", "C"], &["Revenue"]);
        let strict = classifier().score_table(&t).unwrap();
        assert!(!strict.recon_candidate);

        let lenient = ReconciliationClassifier::with_rules(
            ClassifierRules::default().with_threshold(-100.0),
        )
        .unwrap();
        assert!(lenient.score_table(&t).unwrap().recon_candidate);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let rules = ClassifierRules {
            recon_item_patterns: vec!["(".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            ReconciliationClassifier::with_rules(rules),
            Err(ExtractError::Config(_))
        ));
    }

    #[test]
    fn test_classify_extracted_exhibit() {
        let html = r#"
            <html><body>
            <p>Condensed Consolidated Statements of Operations</p>
            <table>
              <tr><td></td><td>Q1 2024</td><td>Q1 2023</td></tr>
              <tr><td>Total revenue</td><td>100</td><td>90</td></tr>
              <tr><td>Cost of revenue</td><td>40</td><td>35</td></tr>
              <tr><td>Gross profit</td><td>60</td><td>55</td></tr>
              <tr><td>Research and development</td><td>20</td><td>18</td></tr>
              <tr><td>Sales and marketing</td><td>15</td><td>14</td></tr>
            </table>
            <p>Reconciliation of GAAP to Non-GAAP Net Income</p>
            <table>
              <tr><td></td><td>Q1 2024</td><td>Q1 2023</td></tr>
              <tr><td>GAAP net income</td><td>10</td><td>8</td></tr>
              <tr><td>Stock-based compensation</td><td>5</td><td>4</td></tr>
              <tr><td>Amortization of intangible assets</td><td>2</td><td>2</td></tr>
              <tr><td>Restructuring</td><td>1</td><td>-</td></tr>
              <tr><td>Non-GAAP net income</td><td>18</td><td>14</td></tr>
            </table>
            </body></html>
        "#;
        let tables = exhibit_html::TableExtractor::new().extract_all_tables(html);
        assert_eq!(tables.len(), 2);

        let classification = classifier().classify(&tables);
        assert_eq!(classification.scores[0].table_id, "table_001");
        assert_eq!(classification.candidate_tables.len(), 1);
        assert_eq!(classification.candidate_tables[0].table_id, "table_001");
    }

    #[test]
    fn test_attach_scores() {
        let mut tables = vec![table("table_000", "", &["A", "B"], &["x"])];
        let scores = classifier().score_all_tables(&tables);
        attach_scores(&mut tables, &scores);
        assert_eq!(tables[0].recon.as_ref().map(|s| s.table_id.as_str()), Some("table_000"));
    }
}
