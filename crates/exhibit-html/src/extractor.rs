//! Table extraction from exhibit HTML.

use std::sync::LazyLock;

use exhibit_core::{Cell, HeaderCell, Result, Table};
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::{debug, warn};

use crate::{
    grid::{clean_text, expand_merged_cells, raw_grid, trim_empty},
    headers::detect_headers,
};

/// Longest nearby heading accepted as a caption.
const MAX_CAPTION_LEN: usize = 200;

/// Preceding heading/paragraph siblings inspected for a caption.
const CAPTION_LOOKBACK: usize = 3;

/// Data rows whose first column feeds the fingerprint.
const FINGERPRINT_ROWS: usize = 5;

/// Hex characters kept from the fingerprint digest.
const FINGERPRINT_LEN: usize = 12;

static RE_NON_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:script|style|noscript)\b[^>]*>.*?</(?:script|style|noscript)\s*>")
        .expect("valid non-content regex")
});
static RE_NON_CONTENT_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:script|style|noscript)\b[^>]*/>").expect("valid self-closing regex")
});
static RE_SUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?sup\b[^>]*>").expect("valid sup regex"));
static RE_NBSP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)&nbsp;|&#160;|&#xa0;").expect("valid nbsp regex"));
static RE_DASH_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)&minus;|&ndash;|&mdash;|&#8722;|&#8211;|&#8212;|&#x2212;|&#x2013;|&#x2014;")
        .expect("valid dash entity regex")
});

/// Removes non-content elements, unwraps superscripts and normalizes
/// non-breaking space and dash entities.
///
/// Footnote markers in `<sup>` stay in the text of their cell.
#[must_use]
pub fn preprocess_html(html: &str) -> String {
    let html = RE_NON_CONTENT.replace_all(html, "");
    let html = RE_NON_CONTENT_OPEN.replace_all(&html, "");
    let html = RE_SUP_TAG.replace_all(&html, "");
    let html = RE_NBSP.replace_all(&html, " ");
    RE_DASH_ENTITY.replace_all(&html, "-").into_owned()
}

/// Extracts rectangular tables from exhibit HTML.
///
/// Every `<table>` element in document order gets an id `table_{idx:03}`,
/// including tables that end up discarded, so ids are stable for a given
/// document. Tables that are empty after trimming are dropped silently; tables
/// that fail to expand are logged and skipped.
///
/// # Example
///
/// ```
/// use exhibit_html::TableExtractor;
///
/// let html = "<table><tr><th>Item</th><th>2024</th></tr><tr><td>Revenue</td><td>10</td></tr></table>";
/// let tables = TableExtractor::new().extract_all_tables(html);
/// assert_eq!(tables.len(), 1);
/// assert_eq!(tables[0].shape, (1, 2));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct TableExtractor;

impl TableExtractor {
    /// Creates an extractor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Extracts every non-empty table of the document.
    #[must_use]
    pub fn extract_all_tables(&self, html: &str) -> Vec<Table> {
        let document = Html::parse_document(&preprocess_html(html));

        let tables: Vec<Table> = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "table")
            .enumerate()
            .filter_map(|(idx, element)| {
                let table_id = format!("table_{:03}", idx);
                match self.process_table(element, &table_id) {
                    Ok(table) => table,
                    Err(e) => {
                        warn!(table_id = %table_id, error = %e, "Failed to process table, skipping");
                        None
                    }
                }
            })
            .collect();

        debug!("Extracted {} tables", tables.len());
        tables
    }

    /// Builds one table; `Ok(None)` when nothing is left after trimming.
    fn process_table(&self, element: ElementRef<'_>, table_id: &str) -> Result<Option<Table>> {
        let grid = trim_empty(&expand_merged_cells(&raw_grid(element))?);
        if grid.is_empty() {
            debug!(table_id, "Discarding empty table");
            return Ok(None);
        }

        let split = detect_headers(&grid);
        let rows: Vec<Vec<Cell>> = grid[split.data_start..]
            .iter()
            .enumerate()
            .map(|(row_idx, row)| {
                row.iter()
                    .enumerate()
                    .map(|(col_idx, text)| Cell::new(table_id, row_idx, col_idx, text.trim()))
                    .collect()
            })
            .collect();

        let shape = (rows.len(), split.headers.len());
        let fingerprint = fingerprint(&split.headers, &rows, shape);

        Ok(Some(Table {
            table_id: table_id.to_string(),
            caption: extract_caption(element),
            dom_path: dom_path(element),
            shape,
            fingerprint,
            headers: split.headers.into_iter().map(HeaderCell::new).collect(),
            rows,
            ..Default::default()
        }))
    }
}

/// Returns the `<caption>` text, else the first short preceding heading or paragraph.
fn extract_caption(table: ElementRef<'_>) -> String {
    let caption = table
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "caption")
        .map(|el| clean_text(&el.text().collect::<String>()));
    if let Some(caption) = caption.filter(|c| !c.is_empty()) {
        return caption;
    }

    table
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|el| {
            matches!(
                el.value().name(),
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p"
            )
        })
        .take(CAPTION_LOOKBACK)
        .map(|el| clean_text(&el.text().collect::<String>()))
        .find(|text| !text.is_empty() && text.chars().count() < MAX_CAPTION_LEN)
        .unwrap_or_default()
}

/// Root-first element path, e.g. `html > body > div[1] > table`.
fn dom_path(table: ElementRef<'_>) -> String {
    let mut segments: Vec<String> = std::iter::once(*table)
        .chain(table.ancestors())
        .filter_map(ElementRef::wrap)
        .map(path_segment)
        .collect();
    segments.reverse();
    segments.join(" > ")
}

fn path_segment(element: ElementRef<'_>) -> String {
    let name = element.value().name();
    let Some(parent) = element.parent() else {
        return name.to_string();
    };

    let same_tag: Vec<ElementRef<'_>> = parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|sibling| sibling.value().name() == name)
        .collect();
    if same_tag.len() < 2 {
        return name.to_string();
    }

    let idx = same_tag
        .iter()
        .position(|sibling| sibling.id() == element.id())
        .unwrap_or(0);
    format!("{}[{}]", name, idx)
}

/// Short hash of headers, leading row labels and shape.
fn fingerprint(headers: &[String], rows: &[Vec<Cell>], shape: (usize, usize)) -> String {
    let mut parts: Vec<String> = headers.to_vec();
    parts.extend(
        rows.iter()
            .take(FINGERPRINT_ROWS)
            .filter_map(|row| row.first())
            .map(|cell| cell.original_text.clone()),
    );
    parts.push(format!("shape_{}x{}", shape.0, shape.1));

    let digest = format!("{:x}", md5::compute(parts.join("|")));
    digest[..FINGERPRINT_LEN].to_string()
}
