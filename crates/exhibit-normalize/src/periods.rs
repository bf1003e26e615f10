//! Period header normalization.
//!
//! Column headers like `Three Months Ended March 31, 2024`, `Q2 FY25` or
//! `FY 2023` are parsed into a [`PeriodInfo`] with end date, period type,
//! fiscal year, quarter and year-to-date flag. Patterns are tried in order
//! and the first one that yields a valid date wins.

use std::sync::LazyLock;

use chrono::NaiveDate;
use exhibit_core::{PeriodInfo, PeriodType, Table};
use regex::{Captures, Regex};
use tracing::trace;

#[derive(Clone, Copy, Debug)]
enum PeriodRule {
    /// `<length> ended <month> <day>, <year>`.
    Ended {
        period_type: PeriodType,
        always_ytd: bool,
    },
    /// `Q<n> [FY]<year>`.
    QuarterYear,
    /// `FY <year>`, `fiscal <year>` or a bare year.
    Year,
    /// A period kind without an end date.
    Undated(PeriodType),
}

const ENDED_SUFFIX: &str = r"\s+ended?\s+([a-z]+)\.?\s+(\d{1,2}),?\s*(\d{4})";

static PERIOD_RULES: LazyLock<Vec<(Regex, PeriodRule)>> = LazyLock::new(|| {
    let ended = |prefix: &str, period_type, always_ytd| {
        (
            format!("(?i){}{}", prefix, ENDED_SUFFIX),
            PeriodRule::Ended {
                period_type,
                always_ytd,
            },
        )
    };

    [
        ended(r"three\s+months?", PeriodType::Quarter, false),
        ended(r"six\s+months?", PeriodType::Half, true),
        ended(r"nine\s+months?", PeriodType::Quarter, true),
        ended(r"year", PeriodType::Year, false),
        ended(r"twelve\s+months?", PeriodType::TrailingTwelveMonths, false),
        (
            r"(?i)q([1-4])\s+(?:fy\s*)?(\d{2,4})".to_string(),
            PeriodRule::QuarterYear,
        ),
        (
            r"(?i)\b(?:fy|fiscal(?:\s+year)?)\s*'?(\d{2,4})\b".to_string(),
            PeriodRule::Year,
        ),
        (r"^(\d{4})$".to_string(), PeriodRule::Year),
        (
            r"(?i)\bttm\b|trailing\s+twelve\s+months?".to_string(),
            PeriodRule::Undated(PeriodType::TrailingTwelveMonths),
        ),
        (
            r"(?i)\bytd\b|year\s+to\s+date".to_string(),
            PeriodRule::Undated(PeriodType::YearToDate),
        ),
    ]
    .into_iter()
    .map(|(pattern, rule)| (Regex::new(&pattern).expect("valid period regex"), rule))
    .collect()
});

/// Parses period information out of column headers.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use exhibit_core::PeriodType;
/// use exhibit_normalize::PeriodNormalizer;
///
/// let info = PeriodNormalizer::new().normalize_period_header("Three Months Ended March 31, 2024");
/// assert_eq!(info.period_end_date, NaiveDate::from_ymd_opt(2024, 3, 31));
/// assert_eq!(info.period_type, Some(PeriodType::Quarter));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct PeriodNormalizer;

impl PeriodNormalizer {
    /// Creates a period normalizer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Parses one header.
    ///
    /// Unrecognised headers are returned without period fields and with the
    /// note `No matching pattern found`.
    #[must_use]
    pub fn normalize_period_header(&self, header: &str) -> PeriodInfo {
        if header.trim().is_empty() {
            return PeriodInfo::new(header).with_notes("Empty header");
        }

        let header = header.trim();
        PERIOD_RULES
            .iter()
            .filter_map(|(pattern, rule)| pattern.captures(header).map(|c| (c, *rule)))
            .find_map(|(captures, rule)| apply_rule(header, &captures, rule))
            .unwrap_or_else(|| PeriodInfo::new(header).with_notes("No matching pattern found"))
    }

    /// Parses every header of a table, in column order.
    #[must_use]
    pub fn normalize_table_periods(&self, headers: &[&str]) -> Vec<PeriodInfo> {
        headers
            .iter()
            .map(|header| self.normalize_period_header(header))
            .collect()
    }

    /// Replaces the table's headers with their parsed period information.
    #[must_use]
    pub fn normalize_table(&self, mut table: Table) -> Table {
        let headers = self.normalize_table_periods(&table.header_texts());
        trace!(
            table_id = %table.table_id,
            periods = headers.iter().filter(|h| h.has_period()).count(),
            "Normalized table periods"
        );
        table.headers = headers;
        table
    }
}

fn apply_rule(header: &str, captures: &Captures<'_>, rule: PeriodRule) -> Option<PeriodInfo> {
    match rule {
        PeriodRule::Ended {
            period_type,
            always_ytd,
        } => parse_ended(header, captures, period_type, always_ytd),
        PeriodRule::QuarterYear => parse_quarter_year(header, captures),
        PeriodRule::Year => parse_year_only(header, captures),
        PeriodRule::Undated(period_type) => Some(PeriodInfo {
            period_type: Some(period_type),
            ..PeriodInfo::new(header).with_notes(format!(
                "Parsed as {} without specific end date",
                period_type
            ))
        }),
    }
}

fn parse_ended(
    header: &str,
    captures: &Captures<'_>,
    period_type: PeriodType,
    always_ytd: bool,
) -> Option<PeriodInfo> {
    let (month_name, day, year) = (&captures[1], &captures[2], &captures[3]);
    let month = month_number(month_name)?;
    let year_num = expand_year(year.parse().ok()?);
    let end_date = NaiveDate::from_ymd_opt(year_num, month, day.parse().ok()?)?;

    let quarter = (period_type == PeriodType::Quarter).then(|| quarter_of_month(month));
    let is_ytd = always_ytd
        || period_type == PeriodType::Half
        || (period_type == PeriodType::Quarter && matches!(month, 3 | 6 | 9));

    Some(PeriodInfo {
        period_end_date: Some(end_date),
        period_type: Some(period_type),
        is_ytd,
        fiscal_year: Some(year_num),
        quarter,
        ..PeriodInfo::new(header).with_notes(format!(
            "Parsed ended format: {} {}, {}",
            month_name, day, year
        ))
    })
}

fn parse_quarter_year(header: &str, captures: &Captures<'_>) -> Option<PeriodInfo> {
    let quarter: u8 = captures[1].parse().ok()?;
    let year = expand_year(captures[2].parse().ok()?);
    let end_date = last_day_of_month(year, u32::from(quarter) * 3)?;

    Some(PeriodInfo {
        period_end_date: Some(end_date),
        period_type: Some(PeriodType::Quarter),
        is_ytd: quarter < 4,
        fiscal_year: Some(year),
        quarter: Some(quarter),
        ..PeriodInfo::new(header).with_notes(format!("Parsed Q{} {} format", quarter, year))
    })
}

fn parse_year_only(header: &str, captures: &Captures<'_>) -> Option<PeriodInfo> {
    let year = expand_year(captures[1].parse().ok()?);
    let end_date = NaiveDate::from_ymd_opt(year, 12, 31)?;

    Some(PeriodInfo {
        period_end_date: Some(end_date),
        period_type: Some(PeriodType::Year),
        is_ytd: false,
        fiscal_year: Some(year),
        ..PeriodInfo::new(header).with_notes(format!("Parsed year format: {}", year))
    })
}

/// Expands two-digit years: 00-49 to the 2000s, 50-99 to the 1900s.
fn expand_year(year: i32) -> i32 {
    match year {
        0..=49 => year + 2000,
        50..=99 => year + 1900,
        _ => year,
    }
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sep" | "sept" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

const fn quarter_of_month(month: u32) -> u8 {
    match month {
        1..=3 => 1,
        4..=6 => 2,
        7..=9 => 3,
        _ => 4,
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(header: &str) -> PeriodInfo {
        PeriodNormalizer::new().normalize_period_header(header)
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_three_months_ended() {
        let info = parse("Three Months Ended March 31, 2024");
        assert_eq!(info.period_end_date, date(2024, 3, 31));
        assert_eq!(info.period_type, Some(PeriodType::Quarter));
        assert_eq!(info.quarter, Some(1));
        assert_eq!(info.fiscal_year, Some(2024));
        assert!(info.is_ytd);
        assert_eq!(info.parsing_notes, "Parsed ended format: March 31, 2024");

        let q4 = parse("Three months ended December 31, 2023");
        assert_eq!(q4.quarter, Some(4));
        assert!(!q4.is_ytd);
    }

    #[test]
    fn test_cumulative_ended() {
        let six = parse("Six Months Ended June 30, 2024");
        assert_eq!(six.period_type, Some(PeriodType::Half));
        assert!(six.is_ytd);
        assert_eq!(six.quarter, None);

        let nine = parse("Nine Months Ended Sept. 30, 2024");
        assert_eq!(nine.period_type, Some(PeriodType::Quarter));
        assert_eq!(nine.quarter, Some(3));
        assert!(nine.is_ytd);

        let year = parse("Year Ended January 31, 2025");
        assert_eq!(year.period_type, Some(PeriodType::Year));
        assert_eq!(year.period_end_date, date(2025, 1, 31));

        let ttm = parse("Twelve Months Ended June 30, 2024");
        assert_eq!(ttm.period_type, Some(PeriodType::TrailingTwelveMonths));
    }

    #[test]
    fn test_quarter_year() {
        let info = parse("Q1 2024");
        assert_eq!(info.period_end_date, date(2024, 3, 31));
        assert_eq!(info.quarter, Some(1));
        assert!(info.is_ytd);

        let info = parse("Q2 FY25");
        assert_eq!(info.period_end_date, date(2025, 6, 30));
        assert_eq!(info.fiscal_year, Some(2025));

        let info = parse("Q4 2023");
        assert_eq!(info.period_end_date, date(2023, 12, 31));
        assert!(!info.is_ytd);
        assert_eq!(info.parsing_notes, "Parsed Q4 2023 format");
    }

    #[test]
    fn test_fiscal_and_bare_year() {
        let info = parse("FY 2023");
        assert_eq!(info.period_end_date, date(2023, 12, 31));
        assert_eq!(info.period_type, Some(PeriodType::Year));

        assert_eq!(parse("Fiscal 2022").fiscal_year, Some(2022));
        assert_eq!(parse("Fiscal Year 2021").fiscal_year, Some(2021));
        assert_eq!(parse("FY99").fiscal_year, Some(1999));
        assert_eq!(parse("2020").period_end_date, date(2020, 12, 31));
    }

    #[test]
    fn test_invalid_date_falls_through() {
        let info = parse("Three Months Ended February 30, 2024");
        assert_eq!(info.period_end_date, None);
        assert_eq!(info.parsing_notes, "No matching pattern found");
    }

    #[test]
    fn test_undated_periods() {
        let ttm = parse("TTM");
        assert_eq!(ttm.period_type, Some(PeriodType::TrailingTwelveMonths));
        assert_eq!(ttm.period_end_date, None);
        assert_eq!(ttm.parsing_notes, "Parsed as TTM without specific end date");

        let ytd = parse("Year to date");
        assert_eq!(ytd.period_type, Some(PeriodType::YearToDate));
    }

    #[test]
    fn test_unmatched_and_empty() {
        let info = parse("Line Item");
        assert!(!info.has_period());
        assert_eq!(info.parsing_notes, "No matching pattern found");
        assert_eq!(parse("  ").parsing_notes, "Empty header");
    }

    #[test]
    fn test_leap_year_quarter_end() {
        assert_eq!(last_day_of_month(2024, 2), date(2024, 2, 29));
        assert_eq!(last_day_of_month(2023, 2), date(2023, 2, 28));
        assert_eq!(last_day_of_month(2024, 9), date(2024, 9, 30));
    }
}
