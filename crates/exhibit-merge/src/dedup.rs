//! Cross-filing period consolidation.
//!
//! Statements of the same type from several filings are folded into one
//! statement whose period list holds each reporting window once. When the same
//! period appears in several filings the most recent filing wins, and shorter
//! periods win over cumulative ones that cover the same fiscal year.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use exhibit_core::{FilingStatements, FinancialStatement, StatementType};
use regex::Regex;
use tracing::{debug, trace};

static RE_ENDED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ended\s+([A-Za-z]+\s+\d{1,2},\s+\d{4})").expect("valid ended date regex")
});

static RE_TRAILING_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+\s+\d{1,2},\s+\d{4})$").expect("valid trailing date regex")
});

static RE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}").expect("valid year regex"));

const CUMULATIVE_MARKERS: &[&str] = &["six months", "nine months", "twelve months"];

/// Rank of a period label; lower ranks are inserted first.
///
/// | label contains            | rank |
/// |---------------------------|------|
/// | `three months`            | 1    |
/// | `six months`              | 2    |
/// | `nine months`             | 3    |
/// | `twelve months` or `year` | 4    |
/// | anything else             | 5    |
#[must_use]
pub fn period_priority(period: &str) -> u8 {
    let lower = period.to_lowercase();
    if lower.contains("three months") {
        1
    } else if lower.contains("six months") {
        2
    } else if lower.contains("nine months") {
        3
    } else if lower.contains("twelve months") || lower.contains("year") {
        4
    } else {
        5
    }
}

/// Extracts the `Month Day, Year` end date of a period label.
///
/// The date following `ended` is preferred; otherwise a date ending the label
/// is used.
///
/// ```
/// use exhibit_merge::dedup::extract_period_end_date;
///
/// assert_eq!(
///     extract_period_end_date("Six Months Ended June 30, 2024").as_deref(),
///     Some("June 30, 2024")
/// );
/// assert_eq!(extract_period_end_date("Q2 2024"), None);
/// ```
#[must_use]
pub fn extract_period_end_date(period: &str) -> Option<String> {
    let period = period.trim();
    if period.is_empty() {
        return None;
    }

    RE_ENDED_DATE
        .captures(period)
        .or_else(|| RE_TRAILING_DATE.captures(period))
        .map(|caps| caps[1].to_string())
}

/// Returns true if a period overlaps data already accepted.
///
/// A period overlaps when its end date was already accepted, or when it is a
/// cumulative period (six, nine or twelve months) and any accepted end date
/// falls in the same year. The year rule is deliberately coarse: it can reject
/// a nine-month period that does not strictly overlap an accepted quarter.
#[must_use]
pub fn is_cumulative_overlap(period: &str, seen_end_dates: &HashSet<String>) -> bool {
    if seen_end_dates.is_empty() {
        return false;
    }
    let Some(end_date) = extract_period_end_date(period) else {
        return false;
    };
    if seen_end_dates.contains(&end_date) {
        return true;
    }

    let lower = period.to_lowercase();
    if !CUMULATIVE_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return false;
    }

    RE_YEAR.find(period).is_some_and(|year| {
        seen_end_dates
            .iter()
            .any(|seen| seen.contains(year.as_str()))
    })
}

struct Candidate<'a> {
    priority: u8,
    period: &'a str,
    source_index: usize,
    statement: &'a FinancialStatement,
    fallback_link: &'a str,
}

/// Consolidates the statements of one company's filings.
///
/// Filings are ordered by filing date, most recent first (stable for equal
/// dates). For each statement type, every period of every filing is ranked by
/// [`period_priority`] with a stable sort, so recency still decides within a
/// rank. Periods are then accepted in that order unless the exact label, the
/// end date or a cumulative overlap was seen before. Statement types that end
/// up with no periods are omitted.
#[must_use]
pub fn consolidate(filings: &[FilingStatements]) -> BTreeMap<StatementType, FinancialStatement> {
    let mut ordered: Vec<&FilingStatements> = filings.iter().collect();
    ordered.sort_by(|a, b| b.meta.filing_date.cmp(&a.meta.filing_date));

    let mut consolidated = BTreeMap::new();
    for statement_type in StatementType::ALL {
        let combined = consolidate_type(&ordered, statement_type);
        if combined.periods.is_empty() {
            continue;
        }
        debug!(
            statement_type = %statement_type,
            periods = combined.periods.len(),
            line_items = combined.data.len(),
            "Consolidated statement"
        );
        consolidated.insert(statement_type, combined);
    }
    consolidated
}

fn consolidate_type(
    filings: &[&FilingStatements],
    statement_type: StatementType,
) -> FinancialStatement {
    let mut candidates: Vec<Candidate<'_>> = filings
        .iter()
        .filter_map(|filing| {
            filing
                .statements
                .get(&statement_type)
                .map(|statement| (statement, filing.meta.exhibit_url.as_str()))
        })
        .flat_map(|(statement, fallback_link)| {
            statement
                .periods
                .iter()
                .enumerate()
                .map(move |(source_index, period)| Candidate {
                    priority: period_priority(period),
                    period,
                    source_index,
                    statement,
                    fallback_link,
                })
        })
        .collect();
    candidates.sort_by_key(|candidate| candidate.priority);

    let mut combined = FinancialStatement::default();
    let mut seen_periods: HashSet<&str> = HashSet::new();
    let mut seen_end_dates: HashSet<String> = HashSet::new();

    for candidate in candidates {
        let end_date = extract_period_end_date(candidate.period);
        if seen_periods.contains(candidate.period)
            || end_date.as_ref().is_some_and(|d| seen_end_dates.contains(d))
            || is_cumulative_overlap(candidate.period, &seen_end_dates)
        {
            trace!(period = candidate.period, "Skipping overlapping period");
            continue;
        }

        seen_periods.insert(candidate.period);
        if let Some(end_date) = end_date {
            seen_end_dates.insert(end_date);
        }
        combined.periods.push(candidate.period.to_string());

        let link = candidate
            .statement
            .filing_links
            .get(candidate.period)
            .map(String::as_str)
            .unwrap_or(candidate.fallback_link);
        if !link.is_empty() {
            combined
                .filing_links
                .insert(candidate.period.to_string(), link.to_string());
        }

        let len = combined.periods.len();
        for item in &candidate.statement.data {
            let values = combined.values_mut(&item.label, len);
            values.resize(len, None);
            values[len - 1] = item.values.get(candidate.source_index).copied().flatten();
        }
    }

    combined.pad_to_periods();
    combined
}

/// Consolidates the filings of several companies, keyed by ticker.
///
/// Tickers whose filings yield no periods at all are left out.
#[must_use]
pub fn consolidate_ticker(
    filings_by_ticker: &BTreeMap<String, Vec<FilingStatements>>,
) -> BTreeMap<String, BTreeMap<StatementType, FinancialStatement>> {
    filings_by_ticker
        .iter()
        .map(|(ticker, filings)| (ticker.clone(), consolidate(filings)))
        .filter(|(_, statements)| !statements.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use exhibit_core::FilingMeta;

    const Q1_24: &str = "Three Months Ended March 31, 2024";
    const Q1_23: &str = "Three Months Ended March 31, 2023";

    fn filing(date: (i32, u32, u32), url: &str) -> FilingStatements {
        let filing_date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        FilingStatements::new(FilingMeta::new(filing_date, "0000000000-24-000001", url))
    }

    fn statement(periods: &[&str], rows: &[(&str, &[f64])]) -> FinancialStatement {
        rows.iter().fold(
            FinancialStatement::new(periods.iter().map(|p| p.to_string()).collect()),
            |statement, (label, values)| {
                statement.with_line_item(*label, values.iter().copied().map(Some).collect())
            },
        )
    }

    #[test]
    fn test_period_priority() {
        assert_eq!(period_priority(Q1_24), 1);
        assert_eq!(period_priority("Six Months Ended June 30, 2024"), 2);
        assert_eq!(period_priority("nine months ended September 30, 2024"), 3);
        assert_eq!(period_priority("Twelve Months Ended December 31, 2024"), 4);
        assert_eq!(period_priority("Year Ended December 31, 2024"), 4);
        assert_eq!(period_priority("Q1 2024"), 5);
    }

    #[test]
    fn test_extract_period_end_date() {
        assert_eq!(extract_period_end_date(Q1_24).as_deref(), Some("March 31, 2024"));
        assert_eq!(
            extract_period_end_date("Quarter ended Sept 30, 2024").as_deref(),
            Some("Sept 30, 2024")
        );
        assert_eq!(
            extract_period_end_date("December 31, 2023").as_deref(),
            Some("December 31, 2023")
        );
        assert_eq!(extract_period_end_date("FY 2024"), None);
        assert_eq!(extract_period_end_date("   "), None);
    }

    #[test]
    fn test_is_cumulative_overlap() {
        let seen: HashSet<String> = ["March 31, 2024".to_string()].into();
        assert!(is_cumulative_overlap("Nine Months Ended September 30, 2024", &seen));
        assert!(is_cumulative_overlap("Six Months Ended March 31, 2024", &seen));
        assert!(!is_cumulative_overlap("Nine Months Ended September 30, 2023", &seen));
        assert!(!is_cumulative_overlap("Three Months Ended June 30, 2024", &seen));
        assert!(!is_cumulative_overlap("Nine Months 2024", &seen));
        assert!(!is_cumulative_overlap(Q1_24, &HashSet::new()));
    }

    #[test]
    fn test_most_recent_filing_wins() {
        let older = filing((2024, 5, 1), "https://sec.example/older").with_statement(
            StatementType::IncomeStatement,
            statement(&[Q1_24, Q1_23], &[("Total Revenue", &[99.0, 90.0])]),
        );
        let newer = filing((2024, 8, 1), "https://sec.example/newer").with_statement(
            StatementType::IncomeStatement,
            statement(
                &["Three Months Ended June 30, 2024", Q1_24],
                &[("Total Revenue", &[110.0, 100.0])],
            ),
        );

        let combined = consolidate(&[older, newer]);
        let income = &combined[&StatementType::IncomeStatement];
        assert_eq!(
            income.periods,
            vec!["Three Months Ended June 30, 2024", Q1_24, Q1_23]
        );
        assert_eq!(
            income.get("Total Revenue"),
            Some(&[Some(110.0), Some(100.0), Some(90.0)][..])
        );
        assert_eq!(income.filing_links[Q1_24], "https://sec.example/newer");
        assert_eq!(income.filing_links[Q1_23], "https://sec.example/older");
    }

    #[test]
    fn test_cross_filing_overlap_prefers_quarter() {
        let q1 = filing((2024, 5, 1), "https://sec.example/q1").with_statement(
            StatementType::IncomeStatement,
            statement(&[Q1_24], &[("Revenue", &[100.0])]),
        );
        let q3 = filing((2024, 11, 1), "https://sec.example/q3").with_statement(
            StatementType::IncomeStatement,
            statement(
                &["Nine Months Ended September 30, 2024"],
                &[("Revenue", &[330.0])],
            ),
        );

        let combined = consolidate(&[q1, q3]);
        let income = &combined[&StatementType::IncomeStatement];
        assert_eq!(income.periods, vec![Q1_24]);
        assert_eq!(income.get("Revenue"), Some(&[Some(100.0)][..]));
    }

    #[test]
    fn test_same_end_date_keeps_shorter_period() {
        let f = filing((2024, 11, 1), "").with_statement(
            StatementType::CashFlow,
            statement(
                &[
                    "Nine Months Ended September 30, 2024",
                    "Three Months Ended September 30, 2024",
                ],
                &[("Net cash", &[30.0, 10.0])],
            ),
        );

        let combined = consolidate(&[f]);
        let cash = &combined[&StatementType::CashFlow];
        assert_eq!(cash.periods, vec!["Three Months Ended September 30, 2024"]);
        assert_eq!(cash.get("Net cash"), Some(&[Some(10.0)][..]));
        assert!(cash.filing_links.is_empty());
    }

    #[test]
    fn test_arrays_padded_and_empty_types_omitted() {
        let newer = filing((2024, 8, 1), "a").with_statement(
            StatementType::BalanceSheet,
            statement(&["June 30, 2024"], &[("Total assets", &[500.0])]),
        );
        let older = filing((2024, 5, 1), "b")
            .with_statement(
                StatementType::BalanceSheet,
                statement(&["March 31, 2024"], &[("Goodwill", &[50.0])]),
            )
            .with_statement(StatementType::SbcBreakdown, FinancialStatement::default());

        let combined = consolidate(&[newer, older]);
        assert_eq!(combined.len(), 1);
        let balance = &combined[&StatementType::BalanceSheet];
        assert_eq!(balance.periods, vec!["June 30, 2024", "March 31, 2024"]);
        assert_eq!(balance.get("Total assets"), Some(&[Some(500.0), None][..]));
        assert_eq!(balance.get("Goodwill"), Some(&[None, Some(50.0)][..]));
    }

    #[test]
    fn test_consolidation_is_idempotent() {
        let a = filing((2024, 11, 1), "a").with_statement(
            StatementType::IncomeStatement,
            statement(
                &[
                    "Three Months Ended September 30, 2024",
                    "Nine Months Ended September 30, 2024",
                    "Three Months Ended September 30, 2023",
                ],
                &[("Revenue", &[110.0, 330.0, 95.0]), ("Net income", &[11.0, 30.0, 9.0])],
            ),
        );
        let b = filing((2024, 5, 1), "b").with_statement(
            StatementType::IncomeStatement,
            statement(
                &[Q1_24, "Year Ended December 31, 2023"],
                &[("Revenue", &[100.0, 400.0])],
            ),
        );

        let once = consolidate(&[a, b]);
        let mut again_input = filing((2024, 11, 1), "");
        again_input.statements = once.clone();
        let twice = consolidate(&[again_input]);

        for (statement_type, statement) in &once {
            assert_eq!(twice[statement_type].periods, statement.periods);
            assert_eq!(twice[statement_type].data, statement.data);
        }
    }

    #[test]
    fn test_consolidate_ticker() {
        let mut by_ticker = BTreeMap::new();
        by_ticker.insert(
            "CRM".to_string(),
            vec![filing((2024, 5, 1), "a").with_statement(
                StatementType::IncomeStatement,
                statement(&[Q1_24], &[("Revenue", &[1.0])]),
            )],
        );
        by_ticker.insert("EMPTY".to_string(), vec![filing((2024, 5, 1), "b")]);

        let consolidated = consolidate_ticker(&by_ticker);
        assert_eq!(consolidated.len(), 1);
        assert!(consolidated["CRM"].contains_key(&StatementType::IncomeStatement));
    }
}
