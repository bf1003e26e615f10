//! Controlled vocabulary for reconciliation line items.
//!
//! Labels are matched against synonym groups (GAAP baselines, non-GAAP results
//! and the usual adjustment categories), first exactly after normalization and
//! then by a fuzzy score. Per-share and ratio labels are never matched.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use exhibit_core::{ExtractError, LabelMatch, Result, Table};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Weight of sequence similarity in the fuzzy score; word overlap gets the rest.
const SEQUENCE_WEIGHT: f64 = 0.7;

const DEFAULT_GROUPS: &[(&str, &[&str])] = &[
    ("GAAP_NET_INCOME", &[
        "gaap net income",
        "net income gaap basis",
        "gaap net earnings",
        "net income on a gaap basis",
        "gaap net loss",
        "net loss gaap basis",
        "net loss on a gaap basis",
        "gaap net earnings loss",
    ]),
    ("GAAP_OPERATING_INCOME", &[
        "gaap operating income",
        "operating income gaap basis",
        "gaap operating loss",
        "operating loss gaap basis",
        "gaap loss from operations",
        "loss from operations gaap basis",
        "gaap income from operations",
        "income from operations gaap basis",
    ]),
    ("GAAP_GROSS_PROFIT", &[
        "gaap gross profit",
        "gross profit gaap basis",
        "gaap gross margin",
        "gross margin gaap basis",
    ]),
    ("GAAP_REVENUE", &[
        "gaap revenue",
        "revenue gaap basis",
        "gaap total revenue",
        "total revenue gaap basis",
    ]),
    ("NON_GAAP_NET_INCOME", &[
        "non-gaap net income",
        "adjusted net income",
        "non gaap net income",
        "non-gaap net earnings",
        "adjusted net earnings",
        "non gaap net earnings",
        "non-gaap net loss",
        "adjusted net loss",
        "non gaap net loss",
    ]),
    ("NON_GAAP_OPERATING_INCOME", &[
        "non-gaap operating income",
        "adjusted operating income",
        "non gaap operating income",
        "non-gaap income from operations",
        "adjusted income from operations",
        "non-gaap operating loss",
        "adjusted operating loss",
        "non gaap operating loss",
    ]),
    ("NON_GAAP_GROSS_PROFIT", &[
        "non-gaap gross profit",
        "adjusted gross profit",
        "non gaap gross profit",
        "non-gaap gross margin",
        "adjusted gross margin",
    ]),
    ("NON_GAAP_REVENUE", &[
        "non-gaap revenue",
        "adjusted revenue",
        "non gaap revenue",
        "non-gaap total revenue",
        "adjusted total revenue",
    ]),
    ("SBC", &[
        "stock-based compensation",
        "stock based compensation",
        "share-based compensation",
        "share based compensation",
        "equity compensation",
        "stock compensation expense",
        "share-based payment",
        "stock option expense",
    ]),
    ("AMORTIZATION_INTANGIBLES", &[
        "amortization of intangible assets",
        "amortization of intangibles",
        "intangible asset amortization",
        "intangible amortization",
        "amortization intangible assets",
        "amortization - intangible assets",
    ]),
    ("RESTRUCTURING", &[
        "restructuring charges",
        "restructuring costs",
        "restructuring expenses",
        "restructuring and other charges",
        "restructuring activities",
        "workforce reduction costs",
        "facility consolidation costs",
    ]),
    ("ACQ_RELATED", &[
        "acquisition-related costs",
        "acquisition related costs",
        "acquisition expenses",
        "merger and acquisition costs",
        "transaction costs",
        "deal costs",
        "acquisition integration costs",
    ]),
    ("TAX_EFFECT", &[
        "tax effects",
        "tax effect of adjustments",
        "income tax effects",
        "tax impact",
        "tax benefit",
        "tax provision adjustments",
    ]),
    ("OTHER_ADJUSTMENTS", &[
        "other adjustments",
        "other charges",
        "other expenses",
        "one-time charges",
        "one time charges",
        "non-recurring items",
        "non recurring items",
        "special items",
        "unusual items",
    ]),
    ("IMPAIRMENT", &[
        "impairment charges",
        "impairment losses",
        "asset impairment",
        "goodwill impairment",
        "intangible impairment",
    ]),
    ("LITIGATION", &[
        "litigation costs",
        "litigation expenses",
        "legal settlements",
        "legal costs",
        "settlement costs",
    ]),
];

const DEFAULT_DENY_PATTERNS: &[&str] = &[
    r"(?i)per\s+share",
    r"(?i)\beps\b",
    r"(?i)earnings\s+per\s+share",
    r"(?i)margin",
    r"%",
    r"(?i)percentage",
    r"(?i)ratio",
    r"(?i)shares\s+outstanding",
    r"(?i)weighted\s+average",
    r"(?i)diluted",
    r"(?i)basic",
];

const DEFAULT_FILLER_WORDS: &[&str] = &["the", "of", "and", "or", "in", "on", "at", "to", "for", "with"];

static DEFAULT_DENY: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    DEFAULT_DENY_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("valid deny regex"))
        .collect()
});

static RE_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid punctuation regex"));

/// A canonical label group and its synonym phrases.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VocabularyGroup {
    /// Canonical group name, e.g. `SBC`.
    pub name: String,
    /// Synonym phrases.
    pub synonyms: Vec<String>,
}

/// Tunable vocabulary tables.
///
/// Group order matters: on equal scores the earlier group wins.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyRules {
    /// Label groups in match priority order.
    pub groups: Vec<VocabularyGroup>,
    /// Regexes for labels that must never be matched.
    pub deny_patterns: Vec<String>,
    /// Words dropped before comparing labels.
    pub filler_words: Vec<String>,
    /// Minimum fuzzy score for a match.
    pub similarity_threshold: f64,
}

impl Default for VocabularyRules {
    fn default() -> Self {
        Self {
            groups: DEFAULT_GROUPS
                .iter()
                .map(|(name, synonyms)| VocabularyGroup {
                    name: (*name).to_string(),
                    synonyms: synonyms.iter().map(|s| (*s).to_string()).collect(),
                })
                .collect(),
            deny_patterns: DEFAULT_DENY_PATTERNS
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            filler_words: DEFAULT_FILLER_WORDS
                .iter()
                .map(|w| (*w).to_string())
                .collect(),
            similarity_threshold: 0.75,
        }
    }
}

impl VocabularyRules {
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
}

/// Counts describing the loaded vocabulary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyStats {
    /// Number of label groups.
    pub total_groups: usize,
    /// Number of synonym phrases across all groups.
    pub total_synonyms: usize,
    /// Number of deny patterns.
    pub deny_patterns: usize,
    /// Groups named `GAAP_*`.
    pub gaap_baseline_groups: usize,
    /// Groups named `NON_GAAP_*`.
    pub non_gaap_groups: usize,
    /// All other groups.
    pub adjustment_groups: usize,
    /// Synonym count per group.
    pub synonyms_per_group: BTreeMap<String, usize>,
}

/// Maps line-item labels onto canonical groups.
///
/// # Example
///
/// ```
/// use exhibit_normalize::VocabularyNormalizer;
///
/// let vocab = VocabularyNormalizer::new();
/// let sbc = vocab.normalize_label("Stock-based compensation");
/// assert_eq!(sbc.label_group.as_deref(), Some("SBC"));
/// assert_eq!(sbc.confidence_score, 1.0);
///
/// let eps = vocab.normalize_label("Diluted earnings per share");
/// assert!(eps.label_group.is_none());
/// ```
#[derive(Clone, Debug)]
pub struct VocabularyNormalizer {
    rules: VocabularyRules,
    deny: Vec<Regex>,
    filler: HashSet<String>,
    /// `(group, normalized synonym)` in rule order.
    synonyms: Vec<(String, String)>,
}

impl Default for VocabularyNormalizer {
    fn default() -> Self {
        Self::build(VocabularyRules::default(), DEFAULT_DENY.clone())
    }
}

impl VocabularyNormalizer {
    /// Creates a normalizer with the built-in vocabulary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a normalizer from custom rules.
    ///
    /// # Errors
    /// Returns [`ExtractError::Config`] if a deny pattern is not a valid regex
    /// or the threshold is outside `[0, 1]`.
    pub fn with_rules(rules: VocabularyRules) -> Result<Self> {
        if !(0.0..=1.0).contains(&rules.similarity_threshold) {
            return Err(ExtractError::Config(format!(
                "similarity threshold {} is outside [0, 1]",
                rules.similarity_threshold
            )));
        }
        let deny = rules
            .deny_patterns
            .iter()
            .map(|p| {
                Regex::new(p)
                    .map_err(|e| ExtractError::Config(format!("deny pattern {:?}: {}", p, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::build(rules, deny))
    }

    fn build(rules: VocabularyRules, deny: Vec<Regex>) -> Self {
        let filler: HashSet<String> = rules.filler_words.iter().cloned().collect();
        let synonyms = rules
            .groups
            .iter()
            .flat_map(|group| {
                group
                    .synonyms
                    .iter()
                    .map(|s| (group.name.clone(), normalize_for_matching(s, &filler)))
            })
            .collect();
        Self {
            rules,
            deny,
            filler,
            synonyms,
        }
    }

    /// Returns the active rules.
    #[must_use]
    pub const fn rules(&self) -> &VocabularyRules {
        &self.rules
    }

    /// Matches one label.
    #[must_use]
    pub fn normalize_label(&self, label: &str) -> LabelMatch {
        if label.trim().is_empty() {
            return LabelMatch::unmatched(label, "Empty label");
        }

        let label = label.trim();
        if self.deny.iter().any(|pattern| pattern.is_match(label)) {
            return LabelMatch::unmatched(label, "Excluded by deny-list");
        }

        let normalized = normalize_for_matching(label, &self.filler);
        if let Some((group, _)) = self.synonyms.iter().find(|(_, s)| *s == normalized) {
            return LabelMatch::matched(label, group.as_str(), "Exact match", 1.0);
        }

        match self.best_fuzzy_match(&normalized) {
            Some((group, score)) if score >= self.rules.similarity_threshold => {
                LabelMatch::matched(
                    label,
                    group,
                    format!("Fuzzy match (confidence: {:.2})", score),
                    score,
                )
            }
            _ => LabelMatch::unmatched(label, "No match found"),
        }
    }

    fn best_fuzzy_match(&self, normalized: &str) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (group, synonym) in &self.synonyms {
            let score = similarity(normalized, synonym);
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((group.as_str(), score));
            }
        }
        best.filter(|(_, score)| *score > 0.0)
    }

    /// Labels the first cell of every row.
    #[must_use]
    pub fn normalize_table(&self, mut table: Table) -> Table {
        let mut matched = 0;
        for cell in table.rows.iter_mut().filter_map(|row| row.first_mut()) {
            let label = self.normalize_label(&cell.original_text);
            if label.is_match() {
                matched += 1;
            }
            cell.label = Some(label);
        }
        trace!(table_id = %table.table_id, matched, "Normalized table labels");
        table
    }

    /// Summarizes the loaded vocabulary.
    #[must_use]
    pub fn vocabulary_stats(&self) -> VocabularyStats {
        let groups = &self.rules.groups;
        let gaap = groups.iter().filter(|g| g.name.starts_with("GAAP_")).count();
        let non_gaap = groups
            .iter()
            .filter(|g| g.name.starts_with("NON_GAAP_"))
            .count();

        let stats = VocabularyStats {
            total_groups: groups.len(),
            total_synonyms: groups.iter().map(|g| g.synonyms.len()).sum(),
            deny_patterns: self.deny.len(),
            gaap_baseline_groups: gaap,
            non_gaap_groups: non_gaap,
            adjustment_groups: groups.len() - gaap - non_gaap,
            synonyms_per_group: groups
                .iter()
                .map(|g| (g.name.clone(), g.synonyms.len()))
                .collect(),
        };
        debug!(
            groups = stats.total_groups,
            synonyms = stats.total_synonyms,
            "Vocabulary stats"
        );
        stats
    }
}

/// Lowercases, replaces punctuation with spaces, collapses whitespace and
/// drops filler words.
fn normalize_for_matching(text: &str, filler: &HashSet<String>) -> String {
    let lower = text.to_lowercase();
    let spaced = RE_PUNCTUATION.replace_all(&lower, " ");
    spaced
        .split_whitespace()
        .filter(|word| !filler.contains(*word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Weighted blend of edit-distance similarity and word-set overlap.
fn similarity(a: &str, b: &str) -> f64 {
    let sequence = strsim::normalized_levenshtein(a, b);

    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();
    let overlap = if words_a.is_empty() || words_b.is_empty() {
        0.0
    } else {
        words_a.intersection(&words_b).count() as f64 / words_a.union(&words_b).count() as f64
    };

    SEQUENCE_WEIGHT * sequence + (1.0 - SEQUENCE_WEIGHT) * overlap
}

#[cfg(test)]
mod tests {
    use super::*;
    use exhibit_core::{Cell, HeaderCell};

    #[test]
    fn test_exact_match() {
        let vocab = VocabularyNormalizer::new();
        let label = vocab.normalize_label("Stock-based compensation");
        assert_eq!(label.label_group.as_deref(), Some("SBC"));
        assert_eq!(label.confidence_score, 1.0);
        assert_eq!(label.label_match_reason, "Exact match");

        let label = vocab.normalize_label("Amortization of the intangible assets");
        assert_eq!(label.label_group.as_deref(), Some("AMORTIZATION_INTANGIBLES"));
        assert_eq!(label.confidence_score, 1.0);
    }

    #[test]
    fn test_deny_list() {
        let vocab = VocabularyNormalizer::new();
        for label in [
            "Diluted earnings per share",
            "Non-GAAP gross margin",
            "Weighted average shares",
            "Operating margin %",
        ] {
            let result = vocab.normalize_label(label);
            assert!(result.label_group.is_none(), "{}", label);
            assert_eq!(result.label_match_reason, "Excluded by deny-list");
        }
    }

    #[test]
    fn test_fuzzy_match() {
        let vocab = VocabularyNormalizer::new();
        let label = vocab.normalize_label("Restructuring charge");
        assert_eq!(label.label_group.as_deref(), Some("RESTRUCTURING"));
        assert!(label.confidence_score >= 0.75 && label.confidence_score < 1.0);
        assert!(label.label_match_reason.starts_with("Fuzzy match (confidence: "));
    }

    #[test]
    fn test_no_match_and_empty() {
        let vocab = VocabularyNormalizer::new();
        let label = vocab.normalize_label("Cash and cash equivalents");
        assert!(!label.is_match());
        assert_eq!(label.label_match_reason, "No match found");
        assert_eq!(label.confidence_score, 0.0);

        assert_eq!(vocab.normalize_label(" ").label_match_reason, "Empty label");
    }

    #[test]
    fn test_normalize_for_matching() {
        let filler = DEFAULT_FILLER_WORDS.iter().map(|w| w.to_string()).collect();
        assert_eq!(
            normalize_for_matching("Amortization - Intangible  Assets (a)", &filler),
            "amortization intangible assets a"
        );
        assert_eq!(
            normalize_for_matching("Restructuring and other charges", &filler),
            "restructuring other charges"
        );
    }

    #[test]
    fn test_similarity_bounds() {
        assert!((similarity("tax effects", "tax effects") - 1.0).abs() < 1e-12);
        assert!(similarity("tax effects", "legal costs") < 0.5);
        assert_eq!(similarity("", ""), 0.7);
    }

    #[test]
    fn test_custom_rules_from_json() {
        let rules = VocabularyRules::from_json_str(
            r#"{"groups": [{"name": "FX", "synonyms": ["foreign exchange loss"]}], "deny_patterns": []}"#,
        )
        .unwrap();
        assert_eq!(rules.similarity_threshold, 0.75);

        let vocab = VocabularyNormalizer::with_rules(rules).unwrap();
        assert_eq!(
            vocab.normalize_label("Foreign exchange loss").label_group.as_deref(),
            Some("FX")
        );
        assert_eq!(vocab.vocabulary_stats().total_groups, 1);
    }

    #[test]
    fn test_invalid_rules() {
        let rules = VocabularyRules {
            deny_patterns: vec!["(".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            VocabularyNormalizer::with_rules(rules),
            Err(ExtractError::Config(_))
        ));

        let rules = VocabularyRules {
            similarity_threshold: 1.5,
            ..Default::default()
        };
        assert!(VocabularyNormalizer::with_rules(rules).is_err());
    }

    #[test]
    fn test_vocabulary_stats() {
        let stats = VocabularyNormalizer::new().vocabulary_stats();
        assert_eq!(stats.total_groups, 16);
        assert_eq!(stats.gaap_baseline_groups, 4);
        assert_eq!(stats.non_gaap_groups, 4);
        assert_eq!(stats.adjustment_groups, 8);
        assert_eq!(stats.deny_patterns, 11);
        assert_eq!(stats.synonyms_per_group["SBC"], 8);
    }

    #[test]
    fn test_normalize_table_labels_first_column() {
        let table = Table {
            table_id: "table_002".to_string(),
            headers: vec![HeaderCell::new("Item"), HeaderCell::new("2024")],
            rows: vec![vec![
                Cell::new("table_002", 0, 0, "Share-based compensation"),
                Cell::new("table_002", 0, 1, "12"),
            ]],
            shape: (1, 2),
            ..Default::default()
        };
        let table = VocabularyNormalizer::new().normalize_table(table);
        assert_eq!(
            table.rows[0][0].label.as_ref().and_then(|l| l.label_group.as_deref()),
            Some("SBC")
        );
        assert!(table.rows[0][1].label.is_none());
    }
}
