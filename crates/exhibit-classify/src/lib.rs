#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/exhibit/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Table scoring.
pub mod classifier;
/// Weights, phrases and shape bounds.
pub mod rules;

pub use classifier::{Classification, ReconciliationClassifier, attach_scores};
pub use rules::{ClassifierRules, ShapeRules, WeightedTerm};
