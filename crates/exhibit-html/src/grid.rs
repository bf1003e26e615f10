//! Raw cell grids and merged-cell expansion.
//!
//! A `<table>` element is first read into rows of [`RawCell`]s that keep their
//! `rowspan`/`colspan`, then expanded into a rectangular grid of strings and
//! trimmed of empty borders.

use exhibit_core::{ExtractError, Result};
use scraper::ElementRef;

/// Largest `colspan` honoured on a single cell.
pub const MAX_COLSPAN: usize = 1000;

/// Largest expanded grid (rows x columns) accepted for one table.
pub const MAX_GRID_CELLS: usize = 250_000;

/// A table cell before span expansion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawCell {
    /// Normalized cell text.
    pub text: String,
    /// Number of rows covered, at least 1.
    pub rowspan: usize,
    /// Number of columns covered, at least 1.
    pub colspan: usize,
}

impl RawCell {
    /// Creates a cell covering a single slot.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rowspan: 1,
            colspan: 1,
        }
    }

    /// Sets the spans, clamping each to at least 1.
    #[must_use]
    pub fn with_span(mut self, rowspan: usize, colspan: usize) -> Self {
        self.rowspan = rowspan.max(1);
        self.colspan = colspan.clamp(1, MAX_COLSPAN);
        self
    }
}

/// Collapses whitespace and maps non-breaking spaces and dash variants to ASCII.
#[must_use]
pub fn clean_text(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|c| match c {
            '\u{00a0}' => ' ',
            '\u{2212}' | '\u{2013}' | '\u{2014}' => '-',
            other => other,
        })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reads the rows of a table into raw cells, skipping rows without cells.
///
/// Only rows belonging to this table are read: direct `<tr>` children and the
/// `<tr>` children of its `<thead>`, `<tbody>` and `<tfoot>`. Cells of nested
/// tables are not included.
#[must_use]
pub fn raw_grid(table: ElementRef<'_>) -> Vec<Vec<RawCell>> {
    direct_rows(table)
        .into_iter()
        .map(|row| {
            direct_cells(row)
                .into_iter()
                .map(|cell| {
                    RawCell::new(clean_text(&cell.text().collect::<String>()))
                        .with_span(span_attr(cell, "rowspan"), span_attr(cell, "colspan"))
                })
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect()
}

fn direct_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();

    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => {
                rows.extend(
                    child
                        .children()
                        .filter_map(ElementRef::wrap)
                        .filter(|inner| inner.value().name() == "tr"),
                );
            }
            _ => {}
        }
    }

    rows
}

fn direct_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .collect()
}

/// Parses the leading digits of a span attribute; missing or zero means 1.
fn span_attr(cell: ElementRef<'_>, name: &str) -> usize {
    cell.value()
        .attr(name)
        .and_then(|value| {
            let digits: String = value
                .trim()
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            digits.parse::<usize>().ok()
        })
        .filter(|&n| n > 0)
        .unwrap_or(1)
}

/// Expands row and column spans into a rectangular grid.
///
/// Each cell is placed at the first unoccupied slot at or after the running
/// column of its row. Its text is written to the top-left slot of the spanned
/// rectangle only; the other slots are occupied but empty. Row spans stop at
/// the last row of the table.
///
/// # Errors
/// Returns [`ExtractError::Html`] if the expanded grid would exceed
/// [`MAX_GRID_CELLS`].
pub fn expand_merged_cells(raw: &[Vec<RawCell>]) -> Result<Vec<Vec<String>>> {
    let row_count = raw.len();
    let width = raw
        .iter()
        .map(|row| row.iter().map(|cell| cell.colspan).sum::<usize>())
        .max()
        .unwrap_or(0);

    if row_count.saturating_mul(width) > MAX_GRID_CELLS {
        return Err(ExtractError::Html(format!(
            "expanded grid {}x{} exceeds {} cells",
            row_count, width, MAX_GRID_CELLS
        )));
    }

    let mut slots: Vec<Vec<Option<String>>> = vec![vec![None; width]; row_count];

    for (row_idx, row) in raw.iter().enumerate() {
        let mut col = 0;
        for cell in row {
            while slots[row_idx].get(col).is_some_and(Option::is_some) {
                col += 1;
            }

            let last_row = (row_idx + cell.rowspan).min(row_count);
            for (offset, target) in slots[row_idx..last_row].iter_mut().enumerate() {
                if target.len() < col + cell.colspan {
                    target.resize(col + cell.colspan, None);
                }
                for (col_offset, slot) in target[col..col + cell.colspan].iter_mut().enumerate() {
                    if slot.is_none() {
                        let text = if offset == 0 && col_offset == 0 {
                            cell.text.clone()
                        } else {
                            String::new()
                        };
                        *slot = Some(text);
                    }
                }
            }

            col += cell.colspan;
        }
    }

    let width = slots.iter().map(Vec::len).max().unwrap_or(0);
    Ok(slots
        .into_iter()
        .map(|row| {
            let mut row: Vec<String> = row.into_iter().map(Option::unwrap_or_default).collect();
            row.resize(width, String::new());
            row
        })
        .collect())
}

/// Drops fully empty leading/trailing rows and columns.
///
/// Returns an empty grid if no cell has text.
#[must_use]
pub fn trim_empty(grid: &[Vec<String>]) -> Vec<Vec<String>> {
    let has_text = |text: &String| !text.trim().is_empty();

    let Some(first_row) = grid.iter().position(|row| row.iter().any(has_text)) else {
        return Vec::new();
    };
    let last_row = grid
        .iter()
        .rposition(|row| row.iter().any(has_text))
        .unwrap_or(first_row);
    let rows = &grid[first_row..=last_row];

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let column_has_text = |col: usize| rows.iter().any(|row| row.get(col).is_some_and(has_text));

    let Some(first_col) = (0..width).find(|&col| column_has_text(col)) else {
        return Vec::new();
    };
    let last_col = (0..width)
        .rev()
        .find(|&col| column_has_text(col))
        .unwrap_or(first_col);

    rows.iter()
        .map(|row| {
            (first_col..=last_col)
                .map(|col| row.get(col).cloned().unwrap_or_default())
                .collect()
        })
        .collect()
}
