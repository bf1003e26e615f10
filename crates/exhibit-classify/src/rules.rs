//! Rule tables for the reconciliation classifier.
//!
//! Every weight, phrase and bound the classifier uses lives in
//! [`ClassifierRules`], so the heuristics can be tuned from a JSON file
//! without touching code.

use std::path::Path;

use exhibit_core::{ExtractError, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_KEYWORDS: &[(&str, f64)] = &[
    ("reconciliation", 10.0),
    ("gaap", 8.0),
    ("non-gaap", 8.0),
    ("non gaap", 8.0),
    ("adjusted", 6.0),
    ("reconciliation of", 15.0),
    ("gaap to non-gaap", 15.0),
    ("non-gaap reconciliation", 12.0),
    ("reconciliation table", 10.0),
    ("stock-based compensation", 5.0),
    ("stock based compensation", 5.0),
    ("share-based compensation", 5.0),
    ("amortization of intangible", 5.0),
    ("amortization of intangibles", 5.0),
    ("acquisition-related", 4.0),
    ("acquisition related", 4.0),
    ("restructuring", 4.0),
    ("impairment", 3.0),
    ("litigation", 3.0),
    ("tax effects", 4.0),
    ("tax effect", 4.0),
    ("one-time", 3.0),
    ("one time", 3.0),
    ("non-recurring", 3.0),
    ("non recurring", 3.0),
    ("operating income", 3.0),
    ("operating loss", 3.0),
    ("net income", 3.0),
    ("net loss", 3.0),
    ("gross profit", 2.0),
    ("earnings per share", 2.0),
    ("loss per share", 2.0),
];

const DEFAULT_RECON_PHRASES: &[(&str, f64)] = &[
    (r"reconciliation\s+of\s+gaap", 25.0),
    (r"gaap\s+to\s+non[- ]?gaap", 22.0),
    (r"non[- ]?gaap\s+reconciliation", 20.0),
    (r"reconciliation\s+of.*(?:net\s+income|operating\s+income)", 18.0),
    (r"adjusted.*reconciliation", 15.0),
    (r"reconciliation\s+table", 12.0),
];

const DEFAULT_STATEMENT_PHRASES: &[(&str, f64)] = &[
    (r"consolidated\s+statements?\s+of\s+operations", -15.0),
    (r"consolidated\s+statements?\s+of\s+income", -15.0),
    (r"consolidated\s+statements?\s+of\s+cash\s+flows?", -15.0),
    (r"statements?\s+of\s+operations", -12.0),
    (r"statements?\s+of\s+income", -12.0),
    (r"income\s+statements?", -10.0),
    (r"cash\s+flow\s+statements?", -10.0),
];

const DEFAULT_RECON_ITEMS: &[&str] = &[
    r"(?i)stock[- ]?based\s+compensation",
    r"(?i)share[- ]?based\s+compensation",
    r"(?i)amortization\s+of\s+intangible",
    r"(?i)acquisition[- ]?related",
    r"(?i)restructuring",
    r"(?i)impairment",
    r"(?i)tax\s+effect",
    r"(?i)adjustment",
    r"(?i)one[- ]?time",
    r"(?i)non[- ]?recurring",
    r"(?i)litigation",
];

const DEFAULT_STATEMENT_ITEMS: &[&str] = &[
    r"(?i)^total\s+revenue$",
    r"(?i)^revenue$",
    r"(?i)^cost\s+of\s+revenue$",
    r"(?i)^gross\s+profit$",
    r"(?i)^operating\s+expenses$",
    r"(?i)^research\s+and\s+development$",
    r"(?i)^sales\s+and\s+marketing$",
    r"(?i)^general\s+and\s+administrative$",
    r"(?i)^subscription$",
    r"(?i)^services$",
];

/// A term or regex with the points it contributes per occurrence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightedTerm {
    /// Lowercase substring (keywords) or regex (phrases).
    pub pattern: String,
    /// Points per occurrence; negative for penalties.
    pub weight: f64,
}

impl WeightedTerm {
    /// Creates a weighted term.
    #[must_use]
    pub fn new(pattern: impl Into<String>, weight: f64) -> Self {
        Self {
            pattern: pattern.into(),
            weight,
        }
    }
}

/// Inclusive bounds on table shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeRules {
    /// Smallest column count that scores.
    pub min_cols: usize,
    /// Largest column count that scores.
    pub max_cols: usize,
    /// Smallest row count that scores.
    pub min_rows: usize,
    /// Largest row count that scores.
    pub max_rows: usize,
    /// Row range of a typical reconciliation.
    pub typical_rows: (usize, usize),
    /// Column range of a typical reconciliation.
    pub typical_cols: (usize, usize),
}

impl Default for ShapeRules {
    fn default() -> Self {
        Self {
            min_cols: 3,
            max_cols: 12,
            min_rows: 5,
            max_rows: 80,
            typical_rows: (5, 25),
            typical_cols: (3, 6),
        }
    }
}

/// Tunable classifier tables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierRules {
    /// Lowercase substrings counted over the table text.
    pub keyword_weights: Vec<WeightedTerm>,
    /// Regexes typical of reconciliation captions.
    pub recon_phrases: Vec<WeightedTerm>,
    /// Regexes typical of full financial statements; weights are negative.
    pub statement_phrases: Vec<WeightedTerm>,
    /// First-column regexes for adjustment lines.
    pub recon_item_patterns: Vec<String>,
    /// First-column regexes for full-statement lines.
    pub statement_item_patterns: Vec<String>,
    /// Shape bounds.
    pub shape: ShapeRules,
    /// Points for a well-sized column count.
    pub column_score: f64,
    /// Points for a well-sized row count.
    pub row_score: f64,
    /// Points for a typical reconciliation size.
    pub typical_size_score: f64,
    /// Points per balanced GAAP / non-GAAP mention pair.
    pub balance_weight: f64,
    /// GAAP mentions needed for the flat bonus.
    pub multiple_gaap_mentions: usize,
    /// Flat bonus for repeated GAAP mentions.
    pub multiple_gaap_bonus: f64,
    /// Points for a first column made entirely of adjustment lines.
    pub recon_density_weight: f64,
    /// Penalty for a first column made entirely of statement lines.
    pub statement_density_weight: f64,
    /// Minimum score of a candidate.
    pub threshold: f64,
    /// Most candidates returned.
    pub max_candidates: usize,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        let terms = |table: &[(&str, f64)]| -> Vec<WeightedTerm> {
            table
                .iter()
                .map(|(pattern, weight)| WeightedTerm::new(*pattern, *weight))
                .collect()
        };
        let patterns = |table: &[&str]| -> Vec<String> { table.iter().map(|p| (*p).to_string()).collect() };

        Self {
            keyword_weights: terms(DEFAULT_KEYWORDS),
            recon_phrases: terms(DEFAULT_RECON_PHRASES),
            statement_phrases: terms(DEFAULT_STATEMENT_PHRASES),
            recon_item_patterns: patterns(DEFAULT_RECON_ITEMS),
            statement_item_patterns: patterns(DEFAULT_STATEMENT_ITEMS),
            shape: ShapeRules::default(),
            column_score: 5.0,
            row_score: 3.0,
            typical_size_score: 2.0,
            balance_weight: 2.0,
            multiple_gaap_mentions: 3,
            multiple_gaap_bonus: 3.0,
            recon_density_weight: 15.0,
            statement_density_weight: 10.0,
            threshold: 25.0,
            max_candidates: 8,
        }
    }
}

impl ClassifierRules {
    /// Parses rules from JSON; missing fields take their defaults.
    ///
    /// # Errors
    /// Returns [`ExtractError::Config`] if the JSON is malformed.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ExtractError::Config(e.to_string()))
    }

    /// Reads rules from a JSON file.
    ///
    /// # Errors
    /// Returns [`ExtractError::Io`] if the file cannot be read, or
    /// [`ExtractError::Config`] if it is malformed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| ExtractError::Io(e.to_string()))?;
        Self::from_json_str(&json)
    }

    /// Sets the candidate threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the maximum number of candidates.
    #[must_use]
    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }
}
