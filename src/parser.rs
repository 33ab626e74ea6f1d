// 🏗️ Note Parser
// Turns pasted multi-line notes into expense rows grouped under date headings

use chrono::{Local, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::dates::{DateInference, DateOrder};
use crate::error::ParseError;
use crate::table::{DateValue, ExpenseRecord, ParsedTable};

/// Currency glyphs tolerated directly before an amount
pub const CURRENCY_GLYPHS: &[char] = &['₹', '$', '€', '£', '¥'];

const MONTH: &str = r"(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?";

// ============================================================================
// CORE TYPES
// ============================================================================

/// LineKind - what a non-blank note line is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineKind {
    /// Date marker; updates the running date, produces no row
    Heading,
    /// One expense row
    Entry,
}

// ============================================================================
// COMPOSABLE TRAITS
// ============================================================================

/// LineClassifier - decide Heading vs Entry for one trimmed line
///
/// Never fails: anything unrecognized is an Entry.
pub trait LineClassifier {
    fn classify_line(&self, line: &str) -> LineKind;
}

/// DateNormalizer - heading text to a date value
///
/// Returns the heading verbatim (`DateValue::Raw`) when it cannot be read as a date.
pub trait DateNormalizer {
    fn normalize_date(&self, heading: &str) -> DateValue;
}

/// AmountExtractor - split an entry line into item and trailing amount
pub trait AmountExtractor {
    fn extract_item_amount(&self, line: &str) -> (String, Option<f64>);
}

// ============================================================================
// PATTERNS
// ============================================================================

/// Heading patterns, tried in order. A match anywhere in the line counts,
/// so an item such as "2 Apples 50" also reads as a heading.
fn heading_patterns() -> &'static [Regex; 3] {
    static RE: OnceLock<[Regex; 3]> = OnceLock::new();
    RE.get_or_init(|| {
        let build = |pattern: String| Regex::new(&pattern).expect("invalid heading regex");
        [
            // (a) "3rd Sept", "3 September 2024"
            build(r"(?i)\b\d{1,2}(?:st|nd|rd|th)?\s+\w+\b".to_string()),
            // (b) "12/5/2024", "3/9/24"
            build(r"(?i)\b\d{1,2}/\d{1,2}/\d{2,4}\b".to_string()),
            // (c) "Sept 3", "Sep 3rd, 2024"; the word must be a month so "Milk 25" stays an entry
            build(format!(r"(?i)^{MONTH}\s+\d{{1,2}}(?:st|nd|rd|th)?,?(?:\s+\d{{2,4}})?:?$")),
        ]
    })
}

/// Item, then whitespace and/or a currency glyph, then a non-negative
/// number with optional grouping commas, then end of line.
fn amount_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<item>.+?)(?:\s+[₹$€£¥]?|[₹$€£¥])\s*(?P<amount>\d+(?:,\d+)*(?:\.\d+)?)$")
            .expect("invalid amount regex")
    })
}

// ============================================================================
// NOTE PARSER
// ============================================================================

/// NoteParser - pure text → table conversion
///
/// Settings only affect date inference: the reference date supplies the
/// year for headings like "3rd Sept", the order resolves "4/5/2024".
#[derive(Debug, Clone, Copy)]
pub struct NoteParser {
    dates: DateInference,
}

impl Default for NoteParser {
    fn default() -> Self {
        NoteParser::new(Local::now().date_naive(), DateOrder::default())
    }
}

impl NoteParser {
    pub fn new(reference: NaiveDate, order: DateOrder) -> Self {
        NoteParser {
            dates: DateInference::new(reference, order),
        }
    }

    /// Builder pattern: replace the reference date
    pub fn with_reference_date(mut self, reference: NaiveDate) -> Self {
        self.dates = DateInference::new(reference, self.dates.order());
        self
    }

    /// Builder pattern: replace the numeric date order
    pub fn with_date_order(mut self, order: DateOrder) -> Self {
        self.dates = DateInference::new(self.dates.reference(), order);
        self
    }

    pub fn date_inference(&self) -> DateInference {
        self.dates
    }

    /// Parse a block of notes. Never fails; blank input gives an empty table.
    ///
    /// One record per non-blank, non-heading line, in input order. Each record
    /// carries the most recent heading above it (or no date before the first).
    pub fn parse(&self, text: &str) -> ParsedTable {
        let mut current_date: Option<DateValue> = None;
        let mut table = ParsedTable::default();
        let mut headings = 0usize;

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match self.classify_line(line) {
                LineKind::Heading => {
                    let date = self.normalize_date(line);
                    debug!(heading = line, date = %date, "date heading");
                    current_date = Some(date);
                    headings += 1;
                }
                LineKind::Entry => {
                    let (item, amount) = self.extract_item_amount(line);
                    table.push(ExpenseRecord::new(current_date.clone(), item, amount, line.to_string()));
                }
            }
        }

        info!(records = table.len(), headings, "parsed notes");
        table
    }

    /// Like [`NoteParser::parse`], but refuses blank input.
    pub fn parse_checked(&self, text: &str) -> Result<ParsedTable, ParseError> {
        if text.trim().is_empty() {
            return Err(ParseError::EmptyInput);
        }
        Ok(self.parse(text))
    }
}

impl LineClassifier for NoteParser {
    fn classify_line(&self, line: &str) -> LineKind {
        let line = line.trim();
        if heading_patterns().iter().any(|re| re.is_match(line)) {
            LineKind::Heading
        } else {
            LineKind::Entry
        }
    }
}

impl DateNormalizer for NoteParser {
    fn normalize_date(&self, heading: &str) -> DateValue {
        match self.dates.infer(heading) {
            Some(date) => DateValue::Calendar(date),
            None => DateValue::Raw(heading.to_string()),
        }
    }
}

impl AmountExtractor for NoteParser {
    fn extract_item_amount(&self, line: &str) -> (String, Option<f64>) {
        let line = line.trim();

        if let Some(caps) = amount_pattern().captures(line) {
            let item = caps["item"].trim();
            if let Ok(amount) = caps["amount"].replace(',', "").parse::<f64>() {
                if amount.is_finite() {
                    return (item.to_string(), Some(amount));
                }
            }
        }

        (line.to_string(), None)
    }
}

// ============================================================================
// CONVENIENCE FUNCTIONS
// ============================================================================

/// Parse with today's date as reference and month-first numeric dates.
pub fn parse(text: &str) -> ParsedTable {
    NoteParser::default().parse(text)
}

/// Parse, refusing blank input.
pub fn parse_notes(text: &str) -> Result<ParsedTable, ParseError> {
    NoteParser::default().parse_checked(text)
}

pub fn classify_line(line: &str) -> LineKind {
    NoteParser::default().classify_line(line)
}

pub fn normalize_date(heading: &str) -> DateValue {
    NoteParser::default().normalize_date(heading)
}

pub fn extract_item_amount(line: &str) -> (String, Option<f64>) {
    NoteParser::default().extract_item_amount(line)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> NoteParser {
        NoteParser::new(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(), DateOrder::MonthFirst)
    }

    fn sept_3() -> Option<DateValue> {
        Some(DateValue::Calendar(NaiveDate::from_ymd_opt(2026, 9, 3).unwrap()))
    }

    // ========================================================================
    // classify_line
    // ========================================================================

    #[test]
    fn test_classify_recognized_headings() {
        let p = parser();
        for line in ["3rd Sept", "3 september 2024", "12/5/2024", "1/2/24", "Sept 3", "SEP 3rd, 2024", "Dec 25:"] {
            assert_eq!(p.classify_line(line), LineKind::Heading, "{line}");
        }
    }

    #[test]
    fn test_classify_entries() {
        let p = parser();
        for line in ["Vegetables 40", "Milk 25", "Transport 1,200", "Snacks ₹120.50", "Misc notes only", "Coffee $ 3.75"] {
            assert_eq!(p.classify_line(line), LineKind::Entry, "{line}");
        }
    }

    #[test]
    fn test_digit_then_word_lines_read_as_headings() {
        // Known ambiguity: a leading count followed by a word looks like "3 Sept"
        let p = parser();
        assert_eq!(p.classify_line("2 Apples"), LineKind::Heading);
        assert_eq!(p.classify_line("2 Apples 50"), LineKind::Heading);
        assert_eq!(p.classify_line("Paid on 12/5/2024"), LineKind::Heading);

        let table = p.parse("3rd Sept\n2 Apples 50\nTea 10");
        assert_eq!(table.len(), 1);
        assert_eq!(table.records()[0].date, Some(DateValue::Raw("2 Apples 50".to_string())));
    }

    #[test]
    fn test_month_named_items_read_as_headings() {
        // Known ambiguity: an item line that looks exactly like "<month> <day>" is a heading
        assert_eq!(parser().classify_line("May 20"), LineKind::Heading);
    }

    // ========================================================================
    // normalize_date
    // ========================================================================

    #[test]
    fn test_normalize_date_calendar() {
        assert_eq!(Some(parser().normalize_date("3rd Sept")), sept_3());
        assert_eq!(
            parser().normalize_date("12/5/2024"),
            DateValue::Calendar(NaiveDate::from_ymd_opt(2024, 12, 5).unwrap())
        );
    }

    #[test]
    fn test_normalize_date_falls_back_to_raw() {
        assert_eq!(parser().normalize_date("31st Feb"), DateValue::Raw("31st Feb".to_string()));
    }

    // ========================================================================
    // extract_item_amount
    // ========================================================================

    #[test]
    fn test_extract_plain_amount() {
        assert_eq!(parser().extract_item_amount("Vegetables 40"), ("Vegetables".to_string(), Some(40.0)));
    }

    #[test]
    fn test_extract_currency_and_decimals() {
        assert_eq!(parser().extract_item_amount("Snacks ₹120.50"), ("Snacks".to_string(), Some(120.5)));
        assert_eq!(parser().extract_item_amount("Coffee $ 3.75"), ("Coffee".to_string(), Some(3.75)));
        assert_eq!(parser().extract_item_amount("Tea₹15"), ("Tea".to_string(), Some(15.0)));
    }

    #[test]
    fn test_extract_strips_grouping_commas() {
        assert_eq!(parser().extract_item_amount("Transport 1,200"), ("Transport".to_string(), Some(1200.0)));
        assert_eq!(parser().extract_item_amount("Rent 1,20,000"), ("Rent".to_string(), Some(120000.0)));
    }

    #[test]
    fn test_extract_takes_trailing_number_only() {
        assert_eq!(parser().extract_item_amount("2 Apples 50"), ("2 Apples".to_string(), Some(50.0)));
        assert_eq!(parser().extract_item_amount("Bus 12 34"), ("Bus 12".to_string(), Some(34.0)));
    }

    #[test]
    fn test_extract_without_amount() {
        assert_eq!(parser().extract_item_amount("Misc notes only"), ("Misc notes only".to_string(), None));
        assert_eq!(parser().extract_item_amount("Bus 20 to town"), ("Bus 20 to town".to_string(), None));
        assert_eq!(parser().extract_item_amount("Refund -20"), ("Refund -20".to_string(), None));
        assert_eq!(parser().extract_item_amount("40"), ("40".to_string(), None));
    }

    #[test]
    fn test_extract_rejects_overflowing_amount() {
        let line = format!("Rent {}", "9".repeat(400));
        assert_eq!(parser().extract_item_amount(&line), (line.clone(), None));

        let table = parser().parse(&line);
        assert_eq!(table.records()[0].amount, None);
        assert_eq!(table.records()[0].item, line);
    }

    // ========================================================================
    // parse
    // ========================================================================

    #[test]
    fn test_parse_grouped_notes() {
        let table = parser().parse("3rd Sept\nVegetables 40\nMilk 25");
        assert_eq!(table.len(), 2);

        let veg = &table.records()[0];
        assert_eq!(veg.date, sept_3());
        assert_eq!(veg.item, "Vegetables");
        assert_eq!(veg.amount, Some(40.0));
        assert_eq!(veg.description, "Vegetables 40");

        let milk = &table.records()[1];
        assert_eq!(milk.date, sept_3());
        assert_eq!(milk.item, "Milk");
        assert_eq!(milk.amount, Some(25.0));
        assert_eq!(milk.description, "Milk 25");
    }

    #[test]
    fn test_parse_without_heading_has_no_date() {
        let table = parser().parse("Snacks ₹120.50");
        assert_eq!(table.len(), 1);
        assert_eq!(table.records()[0].date, None);
        assert_eq!(table.records()[0].item, "Snacks");
        assert_eq!(table.records()[0].amount, Some(120.5));
    }

    #[test]
    fn test_parse_switches_date_context() {
        let text = "  \n3rd Sept\n  Vegetables 40  \n\n12/5/2024\nTransport 1,200\n31st Feb\nMisc notes only\n";
        let table = parser().parse(text);

        assert_eq!(table.len(), 3);
        assert_eq!(table.records()[0].date, sept_3());
        assert_eq!(table.records()[0].description, "Vegetables 40");
        assert_eq!(
            table.records()[1].date,
            Some(DateValue::Calendar(NaiveDate::from_ymd_opt(2024, 12, 5).unwrap()))
        );
        assert_eq!(table.records()[1].amount, Some(1200.0));
        assert_eq!(table.records()[2].date, Some(DateValue::Raw("31st Feb".to_string())));
        assert_eq!(table.records()[2].amount, None);
    }

    #[test]
    fn test_record_count_matches_entry_lines() {
        let p = parser();
        let text = "Sept 3\nTea 10\n\nCoffee\n3/9/2024\nLunch 120\nDinner 300\nSept 4";
        let entries = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .filter(|l| p.classify_line(l) == LineKind::Entry)
            .count();
        assert_eq!(p.parse(text).len(), entries);
        assert_eq!(entries, 4);
    }

    #[test]
    fn test_reparse_description_is_stable() {
        let p = parser();
        let table = p.parse("3rd Sept\nVegetables 40\nTransport 1,200\nSnacks ₹120.50\nMisc notes only");
        for record in &table {
            let again = p.parse(&record.description);
            assert_eq!(again.len(), 1);
            assert_eq!(again.records()[0].item, record.item);
            assert_eq!(again.records()[0].amount, record.amount);
        }
    }

    #[test]
    fn test_zero_and_duplicate_rows_are_kept() {
        let table = parser().parse("Milk 0\nMilk 0");
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].amount, Some(0.0));
    }

    #[test]
    fn test_parse_checked_rejects_blank_input() {
        assert_eq!(parser().parse_checked("  \n\t\n"), Err(ParseError::EmptyInput));
        assert!(parser().parse_checked("Milk 25").is_ok());
        assert!(parser().parse("").is_empty());
    }

    #[test]
    fn test_day_first_order_setting() {
        let table = parser().with_date_order(DateOrder::DayFirst).parse("12/5/2024\nTea 10");
        assert_eq!(
            table.records()[0].date,
            Some(DateValue::Calendar(NaiveDate::from_ymd_opt(2024, 5, 12).unwrap()))
        );
    }
}
