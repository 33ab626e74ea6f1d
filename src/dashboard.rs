// 📊 Expense Dashboard
// Bar series: amount summed per day. Pie series: each item's share of the total.
// Values that cannot be coerced (raw dates, absent amounts) drop out silently.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::dates::DateInference;
use crate::table::{DateValue, ExpenseRecord, ParsedTable};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemShare {
    pub item: String,
    pub total: f64,
    /// Fraction of the sum of all positive item totals (0.0 - 1.0)
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub daily_totals: Vec<DailyTotal>,
    pub item_shares: Vec<ItemShare>,
    pub grand_total: f64,
    pub rows_without_date: usize,
    pub rows_without_amount: usize,
}

impl Dashboard {
    pub fn from_table(table: &ParsedTable, dates: &DateInference) -> Self {
        let rows_without_date = table
            .iter()
            .filter(|r| coerce_date(r, dates).is_none())
            .count();
        let rows_without_amount = table.iter().filter(|r| r.amount.is_none()).count();

        Dashboard {
            daily_totals: daily_totals(table, dates),
            item_shares: item_shares(table),
            grand_total: table.iter().filter_map(|r| r.amount).sum(),
            rows_without_date,
            rows_without_amount,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.daily_totals.is_empty() && self.item_shares.is_empty()
    }
}

/// Calendar dates pass through; raw text gets one more lenient read.
fn coerce_date(record: &ExpenseRecord, dates: &DateInference) -> Option<NaiveDate> {
    match record.date.as_ref()? {
        DateValue::Calendar(date) => Some(*date),
        DateValue::Raw(text) => dates.infer(text),
    }
}

/// Amount per calendar date, ascending. Undated rows are excluded; absent amounts add nothing.
pub fn daily_totals(table: &ParsedTable, dates: &DateInference) -> Vec<DailyTotal> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();

    for record in table {
        if let Some(date) = coerce_date(record, dates) {
            *by_date.entry(date).or_insert(0.0) += record.amount.unwrap_or(0.0);
        }
    }

    by_date
        .into_iter()
        .map(|(date, total)| DailyTotal { date, total })
        .collect()
}

/// Amount per item in first-seen order, with share of the grand total.
/// Items whose total is zero or negative have no slice.
pub fn item_shares(table: &ParsedTable) -> Vec<ItemShare> {
    let mut order: Vec<&str> = Vec::new();
    let mut totals: HashMap<&str, f64> = HashMap::new();

    for record in table {
        let Some(amount) = record.amount else {
            continue;
        };
        let item = record.item.as_str();
        if !totals.contains_key(item) {
            order.push(item);
        }
        *totals.entry(item).or_insert(0.0) += amount;
    }

    let positive: Vec<(&str, f64)> = order
        .into_iter()
        .map(|item| (item, totals[item]))
        .filter(|(_, total)| *total > 0.0)
        .collect();
    let sum: f64 = positive.iter().map(|(_, total)| total).sum();

    positive
        .into_iter()
        .map(|(item, total)| ItemShare {
            item: item.to_string(),
            total,
            share: total / sum,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::DateOrder;
    use crate::table::{CellCoercion, Column, TableEdit};

    fn dates() -> DateInference {
        DateInference::new(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(), DateOrder::MonthFirst)
    }

    fn ymd(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn record(date: Option<DateValue>, item: &str, amount: Option<f64>) -> ExpenseRecord {
        ExpenseRecord::new(date, item.to_string(), amount, item.to_string())
    }

    fn sample() -> ParsedTable {
        ParsedTable::new(vec![
            record(Some(DateValue::Calendar(ymd(9, 4))), "Milk", Some(25.0)),
            record(Some(DateValue::Calendar(ymd(9, 3))), "Vegetables", Some(40.0)),
            record(Some(DateValue::Calendar(ymd(9, 3))), "Milk", Some(25.0)),
            record(Some(DateValue::Raw("someday".to_string())), "Snacks", Some(10.0)),
            record(None, "Misc", None),
        ])
    }

    #[test]
    fn test_daily_totals_sorted_and_summed() {
        let totals = daily_totals(&sample(), &dates());
        assert_eq!(
            totals,
            vec![
                DailyTotal { date: ymd(9, 3), total: 65.0 },
                DailyTotal { date: ymd(9, 4), total: 25.0 },
            ]
        );
    }

    #[test]
    fn test_raw_dates_readable_after_edit_are_counted() {
        let mut table = sample();
        table.push(record(Some(DateValue::Raw("Sept 4".to_string())), "Tea", Some(5.0)));
        let totals = daily_totals(&table, &dates());
        assert_eq!(totals[1].total, 30.0);
    }

    #[test]
    fn test_item_shares() {
        let shares = item_shares(&sample());
        let names: Vec<&str> = shares.iter().map(|s| s.item.as_str()).collect();
        assert_eq!(names, vec!["Milk", "Vegetables", "Snacks"]);
        assert_eq!(shares[0].total, 50.0);
        assert!((shares[0].share - 0.5).abs() < 1e-9);
        assert!((shares.iter().map(|s| s.share).sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_items_have_no_slice() {
        let table = ParsedTable::new(vec![
            record(None, "Refund", Some(-20.0)),
            record(None, "Free sample", Some(0.0)),
            record(None, "Tea", Some(10.0)),
        ]);
        let shares = item_shares(&table);
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].share, 1.0);
    }

    #[test]
    fn test_edited_garbage_amount_is_skipped() {
        let mut table = sample();
        let coercion = CellCoercion::new(dates());
        table
            .apply(TableEdit::SetCell { row: 1, column: Column::Amount, value: "forty".to_string() }, &coercion)
            .unwrap();

        let dashboard = Dashboard::from_table(&table, &dates());
        assert_eq!(dashboard.daily_totals[0].total, 25.0);
        assert_eq!(dashboard.rows_without_amount, 2);
        assert!(dashboard.item_shares.iter().all(|s| s.item != "Vegetables"));
    }

    #[test]
    fn test_dashboard_summary_counts() {
        let dashboard = Dashboard::from_table(&sample(), &dates());
        assert_eq!(dashboard.grand_total, 100.0);
        assert_eq!(dashboard.rows_without_date, 2);
        assert_eq!(dashboard.rows_without_amount, 1);
        assert!(!dashboard.is_empty());
        assert!(Dashboard::from_table(&ParsedTable::default(), &dates()).is_empty());
    }
}
