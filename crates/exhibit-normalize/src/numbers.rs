//! Number normalization for table cells.
//!
//! Cell text such as `$1,234.56`, `(300)`, `—` or `12.5%` is turned into a
//! [`NumericValue`] carrying the signed value plus scale and currency hints
//! from the cell itself or, failing that, from the table headers and caption.

use std::sync::LazyLock;

use exhibit_core::{CurrencyHint, NumericValue, ScaleHint, Table};
use regex::Regex;
use tracing::trace;

/// Lowercased cell texts that never carry a number.
const NON_NUMERIC_TOKENS: &[&str] = &[
    "n/a",
    "na",
    "not applicable",
    "none",
    "nil",
    "zero",
    "tbd",
    "tba",
    "pending",
    "see note",
    "note",
    "footnote",
    "total",
    "subtotal",
    "sum",
    "average",
    "mean",
];

/// Share of letters above which a cell is treated as text.
const MAX_LETTER_RATIO: f64 = 0.5;

const CURRENCY_SYMBOLS: [char; 4] = ['$', '€', '£', '¥'];

static NUMBER_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        (
            "comma-grouped number",
            r"^[$€£¥]?\s*([0-9]{1,3}(?:,?[0-9]{3})*(?:\.[0-9]+)?)$",
        ),
        ("decimal", r"^[$€£¥]?\s*(\.[0-9]+)$"),
        ("integer", r"^[$€£¥]?\s*([0-9]+)$"),
        (
            "scientific notation",
            r"^[$€£¥]?\s*([0-9]+\.?[0-9]*[eE][+-]?[0-9]+)$",
        ),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("valid number regex")))
    .collect()
});

static PERCENT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+\.?[0-9]*)").expect("valid percent regex"));

static SCALE_PATTERNS: LazyLock<Vec<(ScaleHint, Regex)>> = LazyLock::new(|| {
    [
        (ScaleHint::Millions, "millions?"),
        (ScaleHint::Thousands, "thousands?"),
        (ScaleHint::Billions, "billions?"),
    ]
    .into_iter()
    .map(|(scale, word)| {
        let pattern = format!(
            r"(?i)\(in\s+{word}\)|\$\s*{word}|{word}\s+of\s+dollars?|in\s+{word}",
            word = word
        );
        (scale, Regex::new(&pattern).expect("valid scale regex"))
    })
    .collect()
});

// CAD precedes USD so that `C$` is not read as US dollars.
static CURRENCY_PATTERNS: LazyLock<Vec<(CurrencyHint, Regex)>> = LazyLock::new(|| {
    [
        (CurrencyHint::Cad, r"(?i)C\$|\bCAD\b"),
        (CurrencyHint::Usd, r"(?i)\$|\bUSD\b|\bUS\s+dollars?\b|\bdollars?\b"),
        (CurrencyHint::Eur, r"(?i)€|\bEUR\b|\beuros?\b"),
        (CurrencyHint::Gbp, r"(?i)£|\bGBP\b|\bpounds?\b"),
        (CurrencyHint::Jpy, r"(?i)¥|\bJPY\b|\byen\b"),
    ]
    .into_iter()
    .map(|(currency, pattern)| (currency, Regex::new(pattern).expect("valid currency regex")))
    .collect()
});

/// Header and caption text used as a fallback for scale and currency hints.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableContext {
    /// Header texts.
    pub headers: Vec<String>,
    /// Table caption.
    pub caption: String,
}

impl TableContext {
    /// Creates a context from headers and a caption.
    #[must_use]
    pub fn new(headers: Vec<String>, caption: impl Into<String>) -> Self {
        Self {
            headers,
            caption: caption.into(),
        }
    }

    /// Builds the context of an extracted table.
    #[must_use]
    pub fn from_table(table: &Table) -> Self {
        Self {
            headers: table
                .headers
                .iter()
                .map(|h| h.original_header.clone())
                .collect(),
            caption: table.caption.clone(),
        }
    }

    fn search_text(&self) -> String {
        format!("{} {}", self.headers.join(" "), self.caption)
    }
}

/// Parses numeric cell text.
///
/// # Example
///
/// ```
/// use exhibit_core::CurrencyHint;
/// use exhibit_normalize::NumberNormalizer;
///
/// let value = NumberNormalizer::new().normalize_cell_value("$1,234.56", None);
/// assert_eq!(value.number_value, Some(1234.56));
/// assert_eq!(value.currency_hint, Some(CurrencyHint::Usd));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct NumberNormalizer;

impl NumberNormalizer {
    /// Creates a number normalizer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Normalizes the text of one cell.
    ///
    /// Empty text yields no value and no notes. Recognised markers and mostly
    /// alphabetic text yield no value with the note `Non-numeric content`.
    #[must_use]
    pub fn normalize_cell_value(&self, text: &str, context: Option<&TableContext>) -> NumericValue {
        let text = text.trim();
        if text.is_empty() {
            return NumericValue::new(text);
        }

        if is_non_numeric(text) {
            return NumericValue::new(text).with_notes("Non-numeric content");
        }

        let (number_value, is_negative, notes) = parse_number(text);
        let context_text = context.map(TableContext::search_text);

        NumericValue {
            original_text: text.to_string(),
            number_value,
            scale_hint: detect_scale(text)
                .or_else(|| context_text.as_deref().and_then(detect_scale)),
            currency_hint: detect_currency(text)
                .or_else(|| context_text.as_deref().and_then(detect_currency)),
            is_negative,
            is_percentage: text.contains('%'),
            parsing_notes: notes,
        }
    }

    /// Detects the scale stated in table headers or caption.
    #[must_use]
    pub fn detect_table_scale_hints(&self, headers: &[&str], caption: &str) -> Option<ScaleHint> {
        detect_scale(&format!("{} {}", headers.join(" "), caption))
    }

    /// Detects the currency stated in table headers or caption.
    #[must_use]
    pub fn detect_table_currency_hints(
        &self,
        headers: &[&str],
        caption: &str,
    ) -> Option<CurrencyHint> {
        detect_currency(&format!("{} {}", headers.join(" "), caption))
    }

    /// Fills the value of every cell and the table-level hints.
    ///
    /// Cells without their own hint inherit the table's.
    #[must_use]
    pub fn normalize_table(&self, mut table: Table) -> Table {
        let context = TableContext::from_table(&table);
        let header_texts = table.header_texts();
        let scale = self.detect_table_scale_hints(&header_texts, &table.caption);
        let currency = self.detect_table_currency_hints(&header_texts, &table.caption);

        for cell in table.rows.iter_mut().flatten() {
            let mut value = self.normalize_cell_value(&cell.original_text, Some(&context));
            value.scale_hint = value.scale_hint.or(scale);
            value.currency_hint = value.currency_hint.or(currency);
            cell.value = Some(value);
        }

        trace!(table_id = %table.table_id, ?scale, ?currency, "Normalized table numbers");
        table.scale_hint = scale;
        table.currency_hint = currency;
        table
    }
}

fn is_non_numeric(text: &str) -> bool {
    let lower = text.to_lowercase();
    if NON_NUMERIC_TOKENS.contains(&lower.as_str()) {
        return true;
    }

    let letters = text.chars().filter(|c| c.is_alphabetic()).count();
    let total = text.chars().filter(|c| *c != ' ').count();
    total > 0 && letters as f64 / total as f64 > MAX_LETTER_RATIO
}

/// Returns the signed value, the negative flag and parsing notes.
fn parse_number(text: &str) -> (Option<f64>, bool, String) {
    let mut rest = text.trim();
    if let Some(stripped) = rest.strip_prefix(CURRENCY_SYMBOLS) {
        rest = stripped.trim_start();
    }

    let mut is_negative = false;
    if rest.len() >= 2 && rest.starts_with('(') && rest.ends_with(')') {
        is_negative = true;
        rest = rest[1..rest.len() - 1].trim();
    } else if let Some(stripped) = rest.strip_prefix(['-', '\u{2212}']) {
        is_negative = true;
        rest = stripped.trim_start();
    }
    if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped.trim_start();
    }

    if matches!(rest, "" | "-" | "\u{2013}" | "\u{2014}") {
        return (Some(0.0), false, "Dash interpreted as zero".to_string());
    }

    let sign = if is_negative { -1.0 } else { 1.0 };

    for (kind, pattern) in NUMBER_PATTERNS.iter() {
        let Some(captures) = pattern.captures(rest) else {
            continue;
        };
        if let Ok(value) = captures[1].replace(',', "").parse::<f64>() {
            return (Some(sign * value), is_negative, format!("Parsed as {}", kind));
        }
    }

    if rest.contains('%') {
        if let Some(value) = PERCENT_NUMBER
            .captures(rest)
            .and_then(|c| c[1].parse::<f64>().ok())
        {
            return (
                Some(sign * value),
                is_negative,
                "Parsed as percentage".to_string(),
            );
        }
    }

    (None, is_negative, format!("Could not parse: {}", text))
}

fn detect_scale(text: &str) -> Option<ScaleHint> {
    SCALE_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(text))
        .map(|(scale, _)| *scale)
}

fn detect_currency(text: &str) -> Option<CurrencyHint> {
    CURRENCY_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(text))
        .map(|(currency, _)| *currency)
}
