#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/exhibit/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Financial table extraction for SEC 8-K exhibits.
//!
//! This crate ties the extraction stages together. It re-exports the core
//! types and every stage, and provides a [`Pipeline`] that turns exhibit HTML
//! into scored tables and consolidated statements.
//!
//! # Features
//!
//! - `cache-sqlite` - SQLite-backed [`PatternStore`]
//!
//! # Example
//!
//! ```rust,ignore
//! use exhibit::{Pipeline, PipelineConfig, Symbol};
//!
//! #[tokio::main]
//! async fn main() -> exhibit::Result<()> {
//!     let pipeline = Pipeline::with_config(PipelineConfig::from_path("exhibit.json")?)?;
//!
//!     let result = pipeline.extract_from_file("crm-ex99.htm", None).await?;
//!     println!("{}", result.summary());
//!
//!     let statements = pipeline.process_filings(&provider, &Symbol::new("CRM")).await?;
//!     for (statement_type, statement) in &statements {
//!         println!("{}: {:?}", statement_type, statement.to_frame()?);
//!     }
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use exhibit_core::*;
pub use polars::prelude::DataFrame;

// Stages
pub use exhibit_classify::{
    Classification, ClassifierRules, ReconciliationClassifier, ShapeRules, WeightedTerm,
    attach_scores,
};
pub use exhibit_html::{TableExtractor, preprocess_html};
pub use exhibit_merge::{
    IdentityMerger, VocabularyMerger, apply_label_merger, consolidate, consolidate_ticker,
    find_best_table, table_to_statement,
};
pub use exhibit_normalize::{
    NumberNormalizer, PeriodNormalizer, TableContext, VocabularyNormalizer, VocabularyRules,
};

// Pattern stores
#[cfg(feature = "cache-sqlite")]
pub use exhibit_cache::SqlitePatternStore;
pub use exhibit_cache::{InMemoryPatternStore, NoopPatternStore};

pub mod artifacts;
pub mod config;
mod pipeline;

pub use artifacts::ArtifactWriter;
pub use config::PipelineConfig;
pub use pipeline::{ExtractionResult, ExtractionStatus, Pipeline};
