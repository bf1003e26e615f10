#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/exhibit/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Pattern store implementations.
//!
//! This crate provides implementations of the [`PatternStore`] trait from `exhibit-core`:
//!
//! - [`SqlitePatternStore`] - Persistent SQLite-based store (default, requires `sqlite` feature)
//! - [`InMemoryPatternStore`] - In-memory store for tests and single runs
//! - [`NoopPatternStore`] - Store that remembers nothing

/// In-memory store implementation.
pub mod memory;
/// No-op store implementation.
pub mod noop;

/// SQLite-based store implementation.
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use exhibit_core::PatternStore;

pub use memory::InMemoryPatternStore;
pub use noop::NoopPatternStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqlitePatternStore;
