#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/exhibit/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! HTML table grid builder.
//!
//! [`TableExtractor`] turns exhibit HTML into [`Table`](exhibit_core::Table)s
//! whose rows all have one cell per header. The lower-level steps live in
//! [`grid`] and [`headers`].

mod extractor;
pub mod grid;
pub mod headers;

pub use extractor::{TableExtractor, preprocess_html};
pub use grid::{RawCell, expand_merged_cells, trim_empty};
pub use headers::{HeaderSplit, detect_headers};
