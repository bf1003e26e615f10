//! Header row detection.

/// Minimum share of non-empty cells for a row to be taken as the header row.
pub const HEADER_DENSITY: f64 = 0.4;

/// Share of non-empty cells that must be text for a row to continue the header.
pub const CONTINUATION_RATIO: f64 = 0.6;

/// Rows after the header row that may be folded into it.
pub const MAX_EXTRA_HEADER_ROWS: usize = 2;

/// Header texts and the index of the first data row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderSplit {
    /// One header per grid column.
    pub headers: Vec<String>,
    /// Grid index of the first data row.
    pub data_start: usize,
}

/// Finds the header rows of a trimmed grid and joins them per column.
///
/// The header row is the first row with at least [`HEADER_DENSITY`] non-empty
/// cells, or row 0. Up to [`MAX_EXTRA_HEADER_ROWS`] following rows are joined
/// while more than [`CONTINUATION_RATIO`] of their non-empty cells are text
/// rather than numbers. Columns without header text are named `Column_{i}`.
#[must_use]
pub fn detect_headers(grid: &[Vec<String>]) -> HeaderSplit {
    if grid.is_empty() {
        return HeaderSplit::default();
    }

    let header_idx = grid
        .iter()
        .position(|row| density(row) >= HEADER_DENSITY)
        .unwrap_or(0);

    let mut header_rows = vec![&grid[header_idx]];
    for row in grid.iter().skip(header_idx + 1).take(MAX_EXTRA_HEADER_ROWS) {
        if !continues_header(row) {
            break;
        }
        header_rows.push(row);
    }
    let data_start = header_idx + header_rows.len();

    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    let headers = (0..width)
        .map(|col| {
            let parts: Vec<&str> = header_rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(|text| text.trim())
                .filter(|text| !text.is_empty())
                .collect();
            if parts.is_empty() {
                format!("Column_{}", col)
            } else {
                parts.join(" ")
            }
        })
        .collect();

    HeaderSplit {
        headers,
        data_start,
    }
}

fn density(row: &[String]) -> f64 {
    if row.is_empty() {
        return 0.0;
    }
    let filled = row.iter().filter(|text| !text.trim().is_empty()).count();
    filled as f64 / row.len() as f64
}

fn continues_header(row: &[String]) -> bool {
    let filled: Vec<&str> = row
        .iter()
        .map(|text| text.trim())
        .filter(|text| !text.is_empty())
        .collect();
    if filled.is_empty() {
        return false;
    }
    let text_cells = filled.iter().filter(|text| is_header_text(text)).count();
    text_cells as f64 / filled.len() as f64 > CONTINUATION_RATIO
}

/// Returns true for text with letters that does not read as a number.
fn is_header_text(text: &str) -> bool {
    text.chars().any(char::is_alphabetic) && !looks_like_number(text)
}

fn looks_like_number(text: &str) -> bool {
    let stripped: String = text
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '(' | ')' | '%'))
        .collect();
    let stripped = stripped.trim();
    stripped.chars().any(|c| c.is_ascii_digit()) && stripped.parse::<f64>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_single_header_row() {
        let g = grid(&[&["Item", "2024", "2023"], &["Revenue", "10", "9"]]);
        let split = detect_headers(&g);
        assert_eq!(split.headers, vec!["Item", "2024", "2023"]);
        assert_eq!(split.data_start, 1);
    }

    #[test]
    fn test_multi_row_header_joined() {
        let g = grid(&[
            &["", "Three Months Ended", "Six Months Ended"],
            &["", "March 31, 2024", "June 30, 2024"],
            &["Revenue", "1", "2"],
        ]);
        let split = detect_headers(&g);
        assert_eq!(split.headers, vec![
            "Column_0",
            "Three Months Ended March 31, 2024",
            "Six Months Ended June 30, 2024"
        ]);
        assert_eq!(split.data_start, 2);
    }

    #[test]
    fn test_sparse_leading_row_skipped() {
        let g = grid(&[
            &["", "", "", "", "(in millions)"],
            &["Item", "Q1", "Q2", "Q3", "Q4"],
            &["Revenue", "1", "2", "3", "4"],
        ]);
        let split = detect_headers(&g);
        assert_eq!(split.headers[0], "Item");
        assert_eq!(split.data_start, 2);
    }

    #[test]
    fn test_numeric_row_not_header() {
        assert!(!continues_header(&["Revenue".to_string(), "$1,200".to_string(), "(3)".to_string()]));
        assert!(continues_header(&["".to_string(), "Unaudited".to_string()]));
        assert!(!continues_header(&[String::new(), String::new()]));
    }

    #[test]
    fn test_looks_like_number() {
        assert!(looks_like_number("$ (1,234.5)"));
        assert!(looks_like_number("12%"));
        assert!(!looks_like_number("inf"));
        assert!(!looks_like_number("Revenue"));
    }
}
