//! Picking the table behind each statement type and turning it into a
//! [`FinancialStatement`].

use exhibit_core::{FinancialStatement, StatementType, Table};
use exhibit_normalize::{NumberNormalizer, TableContext};
use tracing::{debug, trace};

const MIN_ROWS: usize = 5;
const INDICATOR_WEIGHT: usize = 10;

const RECON_EXCLUDES: &[&str] = &["reconciliation", "gaap to non-gaap", "adjusted", "non-gaap"];

const INCOME_TARGETS: &[&str] = &[
    "revenue",
    "subscription",
    "services",
    "total revenue",
    "cost of revenue",
    "gross profit",
    "operating expenses",
    "sales and marketing",
    "research and development",
    "net income",
];

const BALANCE_TARGETS: &[&str] = &[
    "assets",
    "liabilities",
    "stockholders equity",
    "cash and equivalents",
    "accounts receivable",
    "property and equipment",
];

const CASH_FLOW_TARGETS: &[&str] = &[
    "cash flows",
    "operating activities",
    "investing activities",
    "financing activities",
    "net cash",
];

const SBC_TARGETS: &[&str] = &[
    "stock-based compensation",
    "share-based compensation",
    "stock based compensation",
    "expenses associated with stock-based compensation",
    "share-based payment",
    "compensation expense",
    "equity compensation",
    "stock-based compensation expense",
    "includes stock-based compensation expense as follows",
    "includes stock-based compensation",
    "cost of revenue-subscription",
    "cost of revenue-services",
    "cost of revenue subscription",
    "cost of revenue services",
    "total stock-based compensation expense",
];

const SBC_EXCLUDES: &[&str] = &[
    "reconciliation",
    "gaap to non-gaap",
    "adjusted",
    "non-gaap",
    "gross profit on a gaap basis",
    "gross margin",
    "reconciliation of gaap",
    "total revenue",
    "cash flows from operating activities",
    "net loss",
    "depreciation and amortization",
    "cash flows",
    "operating activities",
    "investing activities",
    "financing activities",
];

const SYMBOLS: &[&str] = &["$", "%", "(", ")"];

/// Indicator lists for a statement type.
struct Indicators {
    targets: &'static [&'static str],
    excludes: &'static [&'static str],
    /// A single exclude hit disqualifies the table.
    strict: bool,
    /// Without a target hit, fall back to the largest table.
    fallback: bool,
}

const fn indicators(statement_type: StatementType) -> Indicators {
    match statement_type {
        StatementType::IncomeStatement => Indicators {
            targets: INCOME_TARGETS,
            excludes: RECON_EXCLUDES,
            strict: true,
            fallback: true,
        },
        StatementType::BalanceSheet => Indicators {
            targets: BALANCE_TARGETS,
            excludes: RECON_EXCLUDES,
            strict: false,
            fallback: true,
        },
        StatementType::CashFlow => Indicators {
            targets: CASH_FLOW_TARGETS,
            excludes: RECON_EXCLUDES,
            strict: false,
            fallback: true,
        },
        StatementType::SbcBreakdown => Indicators {
            targets: SBC_TARGETS,
            excludes: SBC_EXCLUDES,
            strict: true,
            fallback: false,
        },
        StatementType::GaapReconciliation => Indicators {
            targets: &[],
            excludes: &[],
            strict: false,
            fallback: false,
        },
    }
}

/// Counts `(cell, indicator)` pairs where the lowercased cell contains the indicator.
fn count_hits(table: &Table, indicators: &[&str]) -> usize {
    table
        .cell_texts()
        .map(str::to_lowercase)
        .map(|text| indicators.iter().filter(|i| text.contains(*i)).count())
        .sum()
}

/// Finds the table that best represents a statement type.
///
/// Tables need at least one target indicator and more than five rows to
/// compete; the score is ten points per indicator hit plus the row count.
/// Income statement and SBC breakdown candidates with any reconciliation
/// marker are rejected. Without a competitor the largest table is returned,
/// except for SBC breakdowns, which need explicit indicators.
///
/// The GAAP reconciliation uses the best candidate score attached by the
/// classifier instead.
#[must_use]
pub fn find_best_table(tables: &[Table], statement_type: StatementType) -> Option<&Table> {
    if statement_type == StatementType::GaapReconciliation {
        return best_reconciliation(tables);
    }

    let indicators = indicators(statement_type);
    let mut best: Option<(&Table, usize)> = None;

    for table in tables {
        let hits = count_hits(table, indicators.targets);
        let rows = table.rows.len();
        if hits == 0 || rows <= MIN_ROWS {
            continue;
        }

        let excluded = count_hits(table, indicators.excludes);
        if indicators.strict && excluded > 0 {
            trace!(table_id = %table.table_id, excluded, "Table excluded");
            continue;
        }

        let score = hits * INDICATOR_WEIGHT + rows;
        if best.is_none_or(|(_, best_score)| score > best_score) {
            debug!(
                table_id = %table.table_id,
                %statement_type,
                hits,
                excluded,
                rows,
                score,
                "Table candidate"
            );
            best = Some((table, score));
        }
    }

    if let Some((table, _)) = best {
        return Some(table);
    }
    if !indicators.fallback {
        return None;
    }

    let largest = tables
        .iter()
        .filter(|table| !table.rows.is_empty())
        .fold(None::<&Table>, |largest, table| match largest {
            Some(l) if l.rows.len() >= table.rows.len() => Some(l),
            _ => Some(table),
        });
    if let Some(table) = largest {
        debug!(table_id = %table.table_id, %statement_type, "No indicators found, using largest table");
    }
    largest
}

fn best_reconciliation(tables: &[Table]) -> Option<&Table> {
    tables
        .iter()
        .filter_map(|table| {
            table
                .recon
                .as_ref()
                .filter(|score| score.recon_candidate)
                .map(|score| (table, score.recon_score))
        })
        .fold(None::<(&Table, f64)>, |best, (table, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((table, score)),
        })
        .map(|(table, _)| table)
}

/// Column range owned by each period of a table.
fn period_columns(table: &Table) -> Vec<(String, std::ops::Range<usize>)> {
    let width = table.headers.len();
    let starts: Vec<(usize, &str)> = table
        .headers
        .iter()
        .enumerate()
        .skip(1)
        .map(|(idx, header)| (idx, header.original_header.trim()))
        .filter(|(_, header)| !header.is_empty() && !is_placeholder(header))
        .collect();

    if starts.is_empty() {
        return (1..width)
            .enumerate()
            .map(|(n, col)| (format!("Period_{}", n + 1), col..col + 1))
            .collect();
    }

    let mut labels: Vec<String> = Vec::with_capacity(starts.len());
    starts
        .iter()
        .enumerate()
        .map(|(n, (start, header))| {
            let begin = if n == 0 { 1 } else { *start };
            let end = starts.get(n + 1).map_or(width, |(next, _)| *next);
            let label = unique_label(&labels, header);
            labels.push(label.clone());
            (label, begin..end)
        })
        .collect()
}

/// Returns true for the `Column_{i}` names given to columns without header text.
fn is_placeholder(header: &str) -> bool {
    header
        .strip_prefix("Column_")
        .is_some_and(|idx| !idx.is_empty() && idx.bytes().all(|b| b.is_ascii_digit()))
}

fn unique_label(existing: &[String], header: &str) -> String {
    if !existing.iter().any(|l| l == header) {
        return header.to_string();
    }
    (2..)
        .map(|n| format!("{} ({})", header, n))
        .find(|candidate| !existing.contains(candidate))
        .unwrap_or_else(|| header.to_string())
}

/// Rebuilds one value from cells split across a period's columns.
///
/// Issuers often place `$`, `(`, `)` or `%` in their own cells; they are put
/// back around the first value cell.
fn merge_value_cells<'a>(texts: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut symbols: Vec<&str> = Vec::new();
    let mut value: Option<&str> = None;
    for text in texts.map(str::trim).filter(|t| !t.is_empty()) {
        if SYMBOLS.contains(&text) {
            symbols.push(text);
        } else if value.is_none() {
            value = Some(text);
        }
    }

    let mut merged = value?.to_string();
    if symbols.contains(&"$") && !merged.starts_with('$') {
        merged.insert(0, '$');
    }
    if symbols.contains(&")") && !merged.ends_with(')') {
        if merged.contains('(') {
            merged.push(')');
        } else if symbols.contains(&"(") {
            merged = format!("({})", merged);
        }
    }
    if symbols.contains(&"%") && !merged.ends_with('%') {
        merged.push('%');
    }
    Some(merged)
}

/// Converts a table into a statement with one period per period header.
///
/// Period headers are the non-empty headers after the label column, except
/// the `Column_{i}` placeholders of the grid builder. Each period owns the
/// columns from its header up to the next period header;
/// columns before the first period header belong to the first period. The
/// cells of a period are merged into one value and parsed as a number, so
/// values keep their sign but not the table's scale. Rows without a label or
/// without any numeric value are dropped; a repeated label keeps its first
/// row. Without period headers, every data column becomes `Period_{n}`.
#[must_use]
pub fn table_to_statement(table: &Table, filing_link: Option<&str>) -> FinancialStatement {
    let normalizer = NumberNormalizer::new();
    let context = TableContext::from_table(table);
    let columns = period_columns(table);

    let mut statement =
        FinancialStatement::new(columns.iter().map(|(label, _)| label.clone()).collect());

    for row in &table.rows {
        let Some(label) = row.first().map(|cell| cell.text().trim()).filter(|l| !l.is_empty())
        else {
            continue;
        };
        if statement.get(label).is_some() {
            continue;
        }

        let values: Vec<Option<f64>> = columns
            .iter()
            .map(|(_, range)| {
                let texts = row
                    .get(range.clone())
                    .into_iter()
                    .flatten()
                    .map(|cell| cell.text());
                merge_value_cells(texts).and_then(|text| {
                    normalizer
                        .normalize_cell_value(&text, Some(&context))
                        .number_value
                })
            })
            .collect();

        if values.iter().any(Option::is_some) {
            statement.insert(label, values);
        }
    }

    if let Some(url) = filing_link.filter(|url| !url.is_empty()) {
        statement = statement.with_filing_link(url);
    }
    debug!(
        table_id = %table.table_id,
        periods = statement.periods.len(),
        line_items = statement.data.len(),
        "Converted table to statement"
    );
    statement
}

#[cfg(test)]
mod tests {
    use super::*;
    use exhibit_core::{Cell, HeaderCell, ReconScore};

    fn table(id: &str, headers: &[&str], rows: &[&[&str]]) -> Table {
        Table {
            table_id: id.to_string(),
            shape: (rows.len(), headers.len()),
            headers: headers.iter().map(|h| HeaderCell::new(*h)).collect(),
            rows: rows
                .iter()
                .enumerate()
                .map(|(r, row)| {
                    row.iter()
                        .enumerate()
                        .map(|(c, text)| Cell::new(id, r, c, *text))
                        .collect()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn income_table(id: &str) -> Table {
        table(id, &["", "Q1 2024", "Q1 2023"], &[
            &["Subscription", "80", "70"],
            &["Services", "20", "20"],
            &["Total revenue", "100", "90"],
            &["Cost of revenue", "30", "28"],
            &["Gross profit", "70", "62"],
            &["Net income", "10", "8"],
        ])
    }

    fn recon_table(id: &str) -> Table {
        table(id, &["", "Q1 2024", "Q1 2023"], &[
            &["GAAP net income", "10", "8"],
            &["Stock-based compensation", "5", "4"],
            &["Amortization", "2", "2"],
            &["Restructuring", "1", "-"],
            &["Total revenue", "100", "90"],
            &["Non-GAAP net income", "18", "14"],
        ])
    }

    #[test]
    fn test_income_statement_skips_reconciliation() {
        let tables = vec![recon_table("table_000"), income_table("table_001")];
        let best = find_best_table(&tables, StatementType::IncomeStatement).unwrap();
        assert_eq!(best.table_id, "table_001");
    }

    #[test]
    fn test_small_tables_fall_back_to_largest() {
        let small = table("table_000", &["", "2024"], &[&["Revenue", "1"]]);
        let smaller = table("table_001", &["", "2024"], &[]);
        let tables = vec![small, smaller];
        let best = find_best_table(&tables, StatementType::BalanceSheet).unwrap();
        assert_eq!(best.table_id, "table_000");
    }

    #[test]
    fn test_sbc_requires_indicators() {
        let tables = vec![income_table("table_000")];
        assert!(find_best_table(&tables, StatementType::SbcBreakdown).is_none());
        assert!(find_best_table(&[], StatementType::IncomeStatement).is_none());
    }

    #[test]
    fn test_reconciliation_uses_attached_scores() {
        let mut low = recon_table("table_000");
        low.recon = Some(ReconScore {
            table_id: low.table_id.clone(),
            recon_score: 30.0,
            recon_candidate: true,
            recon_rationale: Vec::new(),
        });
        let mut high = recon_table("table_001");
        high.recon = Some(ReconScore {
            table_id: high.table_id.clone(),
            recon_score: 55.5,
            recon_candidate: true,
            recon_rationale: Vec::new(),
        });
        let tables = vec![low, high, income_table("table_002")];
        let best = find_best_table(&tables, StatementType::GaapReconciliation).unwrap();
        assert_eq!(best.table_id, "table_001");
        assert!(find_best_table(&tables[2..], StatementType::GaapReconciliation).is_none());
    }

    #[test]
    fn test_table_to_statement() {
        let t = table(
            "table_000",
            &[
                "Line Item",
                "Three Months Ended March 31, 2024",
                "Three Months Ended March 31, 2023",
            ],
            &[
                &["Total Revenue", "$100", "$90"],
                &["Net loss", "(5)", "-"],
                &["", "1", "2"],
                &["Customers", "n/a", "n/a"],
            ],
        );
        let statement = table_to_statement(&t, Some("https://sec.example/ex99"));
        assert_eq!(
            statement.periods,
            vec![
                "Three Months Ended March 31, 2024",
                "Three Months Ended March 31, 2023"
            ]
        );
        assert_eq!(statement.get("Total Revenue"), Some(&[Some(100.0), Some(90.0)][..]));
        assert_eq!(statement.get("Net loss"), Some(&[Some(-5.0), Some(0.0)][..]));
        assert_eq!(statement.labels(), vec!["Total Revenue", "Net loss"]);
        assert_eq!(
            statement.filing_links["Three Months Ended March 31, 2023"],
            "https://sec.example/ex99"
        );
    }

    #[test]
    fn test_symbol_columns_merge_into_period() {
        let t = table(
            "table_000",
            &["", "", "Q1 2024", "", "", "Q1 2023", ""],
            &[
                &["Net income", "$", "1,200", "", "$", "(300", ")"],
                &["Margin", "", "12.5", "%", "", "10", "%"],
            ],
        );
        let statement = table_to_statement(&t, None);
        assert_eq!(statement.periods, vec!["Q1 2024", "Q1 2023"]);
        assert_eq!(statement.get("Net income"), Some(&[Some(1200.0), Some(-300.0)][..]));
        assert_eq!(statement.get("Margin"), Some(&[Some(12.5), Some(10.0)][..]));
        assert!(statement.filing_links.is_empty());
    }

    #[test]
    fn test_missing_period_headers() {
        let t = table("table_000", &["", "", ""], &[&["Revenue", "5", "6"]]);
        let statement = table_to_statement(&t, None);
        assert_eq!(statement.periods, vec!["Period_1", "Period_2"]);
        assert_eq!(statement.get("Revenue"), Some(&[Some(5.0), Some(6.0)][..]));
    }

    #[test]
    fn test_placeholder_headers_are_not_periods() {
        let t = table(
            "table_000",
            &["Column_0", "Column_1", "2024", "Column_3", "2023"],
            &[&["Revenue", "$", "5", "$", "6"]],
        );
        let statement = table_to_statement(&t, None);
        assert_eq!(statement.periods, vec!["2024", "2023"]);
        assert_eq!(statement.get("Revenue"), Some(&[Some(5.0), Some(6.0)][..]));
    }

    #[test]
    fn test_duplicate_period_headers_made_unique() {
        let t = table("table_000", &["", "2024", "2024"], &[&["Revenue", "5", "6"]]);
        let statement = table_to_statement(&t, None);
        assert_eq!(statement.periods, vec!["2024", "2024 (2)"]);
    }
}
