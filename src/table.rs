// 📋 Parsed table - the unit exchanged with every host
// Records come out of the parser typed; edits come back from a grid as text
// and are coerced here, in one place.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::debug;

use crate::dates::{DateInference, DateOrder};
use crate::error::TableError;
use crate::parser::CURRENCY_GLYPHS;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Date column value: a calendar date, or the heading text verbatim when it
/// could not be read as one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateValue {
    Calendar(NaiveDate),
    Raw(String),
}

impl DateValue {
    pub fn as_calendar(&self) -> Option<NaiveDate> {
        match self {
            DateValue::Calendar(date) => Some(*date),
            DateValue::Raw(_) => None,
        }
    }

    /// `Calendar` for ISO text, `Raw` for anything else.
    pub fn from_text(text: &str) -> Self {
        match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            Ok(date) => DateValue::Calendar(date),
            Err(_) => DateValue::Raw(text.to_string()),
        }
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateValue::Calendar(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            DateValue::Raw(text) => f.write_str(text),
        }
    }
}

impl Serialize for DateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(DateValue::from_text(&text))
    }
}

/// ExpenseRecord - one row per entry line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    #[serde(rename = "Date")]
    pub date: Option<DateValue>,

    #[serde(rename = "Item")]
    pub item: String,

    #[serde(rename = "Amount")]
    pub amount: Option<f64>,

    /// The trimmed source line, kept verbatim
    #[serde(rename = "Description")]
    pub description: String,
}

impl ExpenseRecord {
    pub fn new(date: Option<DateValue>, item: String, amount: Option<f64>, description: String) -> Self {
        ExpenseRecord {
            date,
            item,
            amount,
            description,
        }
    }

    /// Empty row, as inserted by a grid
    pub fn blank() -> Self {
        ExpenseRecord::new(None, String::new(), None, String::new())
    }
}

/// Fixed column order of every table view and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Column {
    Date,
    Item,
    Amount,
    Description,
}

impl Column {
    pub const ALL: [Column; 4] = [Column::Date, Column::Item, Column::Amount, Column::Description];

    pub fn name(&self) -> &'static str {
        match self {
            Column::Date => "Date",
            Column::Item => "Item",
            Column::Amount => "Amount",
            Column::Description => "Description",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Column::Date => 0,
            Column::Item => 1,
            Column::Amount => 2,
            Column::Description => 3,
        }
    }

    pub fn next(&self) -> Self {
        Column::ALL[(self.index() + 1) % Column::ALL.len()]
    }

    pub fn previous(&self) -> Self {
        Column::ALL[(self.index() + Column::ALL.len() - 1) % Column::ALL.len()]
    }
}

/// An edit coming back from an editable grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TableEdit {
    SetCell { row: usize, column: Column, value: String },
    InsertRow { at: usize },
    RemoveRow { row: usize },
}

/// Amount cell as a grid hands it back: a JSON number or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GridAmount {
    Number(f64),
    Text(String),
}

/// A row as returned by a grid widget. Every cell may have been overwritten
/// with arbitrary text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridRow {
    #[serde(rename = "Date", default)]
    pub date: Option<String>,

    #[serde(rename = "Item", default)]
    pub item: Option<String>,

    #[serde(rename = "Amount", default)]
    pub amount: Option<GridAmount>,

    #[serde(rename = "Description", default)]
    pub description: Option<String>,
}

// ============================================================================
// CELL COERCION
// ============================================================================

/// Turns edited cell text back into typed values.
#[derive(Debug, Clone, Copy)]
pub struct CellCoercion {
    dates: DateInference,
}

impl Default for CellCoercion {
    fn default() -> Self {
        CellCoercion::new(DateInference::new(Local::now().date_naive(), DateOrder::default()))
    }
}

impl CellCoercion {
    pub fn new(dates: DateInference) -> Self {
        CellCoercion { dates }
    }

    /// Empty → None; ISO or recognizable date → Calendar; else Raw text.
    pub fn date(&self, text: &str) -> Option<DateValue> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        match self.dates.infer(text) {
            Some(date) => Some(DateValue::Calendar(date)),
            None => {
                debug!(cell = text, "date cell kept as raw text");
                Some(DateValue::Raw(text.to_string()))
            }
        }
    }

    /// Empty or non-numeric → None. Grouping commas and a leading currency glyph are ignored.
    pub fn amount(&self, text: &str) -> Option<f64> {
        let cleaned: String = text
            .trim()
            .trim_start_matches(CURRENCY_GLYPHS)
            .chars()
            .filter(|c| *c != ',' && !c.is_whitespace())
            .collect();
        if cleaned.is_empty() {
            return None;
        }
        match cleaned.parse::<f64>() {
            Ok(value) if value.is_finite() => Some(value),
            _ => {
                debug!(cell = text, "amount cell is not numeric");
                None
            }
        }
    }

    pub fn grid_amount(&self, amount: &GridAmount) -> Option<f64> {
        match amount {
            GridAmount::Number(value) if value.is_finite() => Some(*value),
            GridAmount::Number(_) => None,
            GridAmount::Text(text) => self.amount(text),
        }
    }

    pub fn row(&self, row: &GridRow) -> ExpenseRecord {
        ExpenseRecord {
            date: row.date.as_deref().and_then(|d| self.date(d)),
            item: row.item.clone().unwrap_or_default(),
            amount: row.amount.as_ref().and_then(|a| self.grid_amount(a)),
            description: row.description.clone().unwrap_or_default(),
        }
    }
}

// ============================================================================
// PARSED TABLE
// ============================================================================

/// ParsedTable - ordered records, input line order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParsedTable {
    records: Vec<ExpenseRecord>,
}

impl ParsedTable {
    pub fn new(records: Vec<ExpenseRecord>) -> Self {
        ParsedTable { records }
    }

    /// Rebuild a table from what a grid returned; that table becomes authoritative.
    pub fn from_grid_rows(rows: &[GridRow], coercion: &CellCoercion) -> Self {
        ParsedTable::new(rows.iter().map(|row| coercion.row(row)).collect())
    }

    pub fn records(&self) -> &[ExpenseRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ExpenseRecord> {
        self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExpenseRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&ExpenseRecord> {
        self.records.get(row)
    }

    pub fn push(&mut self, record: ExpenseRecord) {
        self.records.push(record);
    }

    /// Apply one grid edit. Insert accepts `at == len` (append).
    pub fn apply(&mut self, edit: TableEdit, coercion: &CellCoercion) -> Result<(), TableError> {
        let len = self.records.len();
        match edit {
            TableEdit::SetCell { row, column, value } => {
                let record = self
                    .records
                    .get_mut(row)
                    .ok_or(TableError::RowOutOfRange { row, len })?;
                match column {
                    Column::Date => record.date = coercion.date(&value),
                    Column::Item => record.item = value,
                    Column::Amount => record.amount = coercion.amount(&value),
                    Column::Description => record.description = value,
                }
            }
            TableEdit::InsertRow { at } => {
                if at > len {
                    return Err(TableError::RowOutOfRange { row: at, len });
                }
                self.records.insert(at, ExpenseRecord::blank());
            }
            TableEdit::RemoveRow { row } => {
                if row >= len {
                    return Err(TableError::RowOutOfRange { row, len });
                }
                self.records.remove(row);
            }
        }
        Ok(())
    }

    /// Cell rendered as text, the way it is shown and exported.
    pub fn cell_text(&self, row: usize, column: Column) -> Option<String> {
        self.records.get(row).map(|record| cell_text(record, column))
    }
}

impl<'a> IntoIterator for &'a ParsedTable {
    type Item = &'a ExpenseRecord;
    type IntoIter = std::slice::Iter<'a, ExpenseRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Text form of one cell. Absent values render empty; amounts drop a zero fraction.
pub fn cell_text(record: &ExpenseRecord, column: Column) -> String {
    match column {
        Column::Date => record.date.as_ref().map(ToString::to_string).unwrap_or_default(),
        Column::Item => record.item.clone(),
        Column::Amount => record.amount.map(format_amount).unwrap_or_default(),
        Column::Description => record.description.clone(),
    }
}

pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{}", amount as i64)
    } else {
        format!("{}", amount)
    }
}
