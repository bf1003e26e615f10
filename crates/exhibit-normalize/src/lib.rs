#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/exhibit/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Number, period and vocabulary normalizers.
//!
//! Each normalizer takes a [`Table`](exhibit_core::Table) by value and returns
//! it with one more layer of enrichment:
//!
//! - [`NumberNormalizer`] fills [`Cell::value`](exhibit_core::Cell::value)
//! - [`PeriodNormalizer`] fills the period fields of every header
//! - [`VocabularyNormalizer`] fills [`Cell::label`](exhibit_core::Cell::label)
//!   on the first column

/// Cell value parsing.
pub mod numbers;
/// Header period parsing.
pub mod periods;
/// Line-item vocabulary matching.
pub mod vocab;

pub use numbers::{NumberNormalizer, TableContext};
pub use periods::PeriodNormalizer;
pub use vocab::{VocabularyGroup, VocabularyNormalizer, VocabularyRules, VocabularyStats};
