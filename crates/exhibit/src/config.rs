//! Pipeline configuration.

use std::path::{Path, PathBuf};

use exhibit_classify::ClassifierRules;
use exhibit_core::{ExtractError, Result};
use exhibit_normalize::VocabularyRules;
use serde::{Deserialize, Serialize};

/// Settings for a [`Pipeline`](crate::Pipeline).
///
/// Every field has a default, so a JSON file only needs the settings it
/// changes:
///
/// ```json
/// {
///   "output_dir": "out",
///   "classifier": { "threshold": 30.0 }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Reconciliation classifier rules.
    pub classifier: ClassifierRules,
    /// Line-item vocabulary.
    pub vocabulary: VocabularyRules,
    /// Directory receiving the JSON artifacts.
    pub output_dir: PathBuf,
    /// Whether extraction writes JSON artifacts.
    pub write_artifacts: bool,
    /// Filings processed at the same time.
    pub max_concurrent_filings: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierRules::default(),
            vocabulary: VocabularyRules::default(),
            output_dir: PathBuf::from("outputs"),
            write_artifacts: true,
            max_concurrent_filings: 4,
        }
    }
}

impl PipelineConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON.
    ///
    /// # Errors
    /// Returns [`ExtractError::Config`] if the JSON is malformed.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ExtractError::Config(e.to_string()))
    }

    /// Reads a configuration from a JSON file.
    ///
    /// # Errors
    /// Returns [`ExtractError::Io`] if the file cannot be read, or
    /// [`ExtractError::Config`] if it is malformed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| ExtractError::Io(e.to_string()))?;
        Self::from_json_str(&json)
    }

    /// Set the classifier rules.
    #[must_use]
    pub fn with_classifier(mut self, classifier: ClassifierRules) -> Self {
        self.classifier = classifier;
        self
    }

    /// Set the vocabulary.
    #[must_use]
    pub fn with_vocabulary(mut self, vocabulary: VocabularyRules) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// Set the artifact directory.
    #[must_use]
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Enable or disable JSON artifacts.
    #[must_use]
    pub fn with_write_artifacts(mut self, write_artifacts: bool) -> Self {
        self.write_artifacts = write_artifacts;
        self
    }

    /// Set the filing concurrency; zero is treated as one.
    #[must_use]
    pub fn with_max_concurrent_filings(mut self, max_concurrent_filings: usize) -> Self {
        self.max_concurrent_filings = max_concurrent_filings.max(1);
        self
    }
}
