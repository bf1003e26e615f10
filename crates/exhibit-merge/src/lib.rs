#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/exhibit/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Cross-filing period consolidation.
pub mod dedup;
/// Line-item label merging.
pub mod labels;
/// Statement table selection and conversion.
pub mod select;

pub use dedup::{
    consolidate, consolidate_ticker, extract_period_end_date, is_cumulative_overlap,
    period_priority,
};
pub use labels::{IdentityMerger, VocabularyMerger, apply_label_merger};
pub use select::{find_best_table, table_to_statement};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use exhibit_core::{FilingMeta, FilingStatements, StatementType};
    use exhibit_html::TableExtractor;

    const EXHIBIT: &str = r#"
        <html><body>
        <p>Condensed Consolidated Statements of Operations</p>
        <table>
          <tr><th>Line Item</th><th>Three Months Ended March 31, 2024</th><th>Three Months Ended March 31, 2023</th></tr>
          <tr><td>Total Revenue</td><td>$100</td><td>$90</td></tr>
        </table>
        </body></html>
    "#;

    fn extract(filing_date: NaiveDate, url: &str) -> FilingStatements {
        let tables = TableExtractor::new().extract_all_tables(EXHIBIT);
        let table = find_best_table(&tables, StatementType::IncomeStatement).unwrap();
        FilingStatements::new(FilingMeta::new(filing_date, "0001", url)).with_statement(
            StatementType::IncomeStatement,
            table_to_statement(table, Some(url)),
        )
    }

    #[test]
    fn test_two_filings_end_to_end() {
        let filings = vec![
            extract(NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(), "https://sec.example/a"),
            extract(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(), "https://sec.example/b"),
        ];

        let combined = consolidate(&filings);
        assert_eq!(combined.len(), 1);
        let income = &combined[&StatementType::IncomeStatement];
        assert_eq!(
            income.periods,
            vec![
                "Three Months Ended March 31, 2024",
                "Three Months Ended March 31, 2023"
            ]
        );
        assert_eq!(income.labels(), vec!["Total Revenue"]);
        assert_eq!(income.get("Total Revenue"), Some(&[Some(100.0), Some(90.0)][..]));
        assert_eq!(
            income.filing_links["Three Months Ended March 31, 2024"],
            "https://sec.example/b"
        );
    }
}
