// Lenient date inference for heading lines and edited Date cells.
// Accepts the shapes people actually type: "3rd Sept", "Sept 3, 2024",
// "12/5/2024", "2024-09-03", "Mon 3 Sept". Relative phrases such as
// "yesterday" go to fuzzydate. Anything else is not a date.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

use crate::error::ConfigError;

/// How to read ambiguous numeric dates such as `4/5/2024`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    /// `4/5/2024` is April 5th. Falls back to day-first when the first number exceeds 12.
    #[default]
    MonthFirst,
    /// `4/5/2024` is May 4th. Falls back to month-first when the second number exceeds 12.
    DayFirst,
}

impl FromStr for DateOrder {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "month_first" | "mdy" => Ok(DateOrder::MonthFirst),
            "day_first" | "dmy" => Ok(DateOrder::DayFirst),
            other => Err(ConfigError::InvalidValue {
                key: "date_order".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Month number (1-12) for an English month name or abbreviation.
///
/// A single trailing dot is tolerated ("Sept.").
pub fn month_from_name(token: &str) -> Option<u32> {
    let name = token.trim_end_matches('.').to_lowercase();
    let month = match name.as_str() {
        "jan" | "january" => 1,
        "feb" | "february" => 2,
        "mar" | "march" => 3,
        "apr" | "april" => 4,
        "may" => 5,
        "jun" | "june" => 6,
        "jul" | "july" => 7,
        "aug" | "august" => 8,
        "sep" | "sept" | "september" => 9,
        "oct" | "october" => 10,
        "nov" | "november" => 11,
        "dec" | "december" => 12,
        _ => return None,
    };
    Some(month)
}

fn is_weekday(token: &str) -> bool {
    matches!(
        token.trim_end_matches('.').to_lowercase().as_str(),
        "mon" | "monday"
            | "tue" | "tues" | "tuesday"
            | "wed" | "wednesday"
            | "thu" | "thur" | "thurs" | "thursday"
            | "fri" | "friday"
            | "sat" | "saturday"
            | "sun" | "sunday"
    )
}

/// "3", "03", "3rd", "21st" → 3 / 21. Rejects "3xy" and anything over two digits.
fn day_number(token: &str) -> Option<u32> {
    let split = token
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(token.len());
    let (digits, suffix) = token.split_at(split);
    if digits.is_empty() || digits.len() > 2 {
        return None;
    }
    if !suffix.is_empty() && !matches!(suffix.to_lowercase().as_str(), "st" | "nd" | "rd" | "th") {
        return None;
    }
    let day: u32 = digits.parse().ok()?;
    (1..=31).contains(&day).then_some(day)
}

/// Date inference anchored on a reference date (supplies the missing year
/// and the century of two-digit years).
#[derive(Debug, Clone, Copy)]
pub struct DateInference {
    reference: NaiveDate,
    order: DateOrder,
}

impl DateInference {
    pub fn new(reference: NaiveDate, order: DateOrder) -> Self {
        Self { reference, order }
    }

    pub fn reference(&self) -> NaiveDate {
        self.reference
    }

    pub fn order(&self) -> DateOrder {
        self.order
    }

    /// Best-effort calendar date for `text`, or `None` when it is not recognizably a date.
    pub fn infer(&self, text: &str) -> Option<NaiveDate> {
        let text = text.trim().trim_end_matches(':').trim();
        if text.is_empty() {
            return None;
        }

        if let Some(date) = self.infer_numeric(text) {
            return Some(date);
        }

        if let Some(date) = self.infer_words(text) {
            return Some(date);
        }

        infer_relative(text)
    }

    /// "2024-09-03", "2024/9/3", "12/5/2024", "5-12-24"
    fn infer_numeric(&self, text: &str) -> Option<NaiveDate> {
        let parts: Vec<&str> = text.split(['/', '-', '.']).collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
            return None;
        }

        // Year-first form is unambiguous
        if parts[0].len() == 4 {
            let year: i32 = parts[0].parse().ok()?;
            let month: u32 = parts[1].parse().ok()?;
            let day: u32 = parts[2].parse().ok()?;
            return NaiveDate::from_ymd_opt(year, month, day);
        }

        if parts[0].len() > 2 || parts[1].len() > 2 || !(2..=4).contains(&parts[2].len()) {
            return None;
        }

        let a: u32 = parts[0].parse().ok()?;
        let b: u32 = parts[1].parse().ok()?;
        let year = self.expand_year(parts[2])?;

        let (month, day) = match self.order {
            DateOrder::MonthFirst if a <= 12 => (a, b),
            DateOrder::MonthFirst => (b, a),
            DateOrder::DayFirst if b <= 12 => (b, a),
            DateOrder::DayFirst => (a, b),
        };

        NaiveDate::from_ymd_opt(year, month, day)
    }

    /// "3rd Sept", "Sept 3", "Sep 3rd, 2024", "Monday 3 of September 24"
    fn infer_words(&self, text: &str) -> Option<NaiveDate> {
        let cleaned = text.replace(',', " ");
        let mut tokens = cleaned.split_whitespace().peekable();

        if tokens.peek().is_some_and(|t| is_weekday(t)) {
            tokens.next();
        }

        let mut month = None;
        let mut day = None;
        let mut year = None;

        for token in tokens {
            if token.eq_ignore_ascii_case("of") {
                continue;
            }
            if let Some(m) = month_from_name(token) {
                if month.replace(m).is_some() {
                    return None;
                }
                continue;
            }
            if day.is_none() {
                if let Some(d) = day_number(token) {
                    day = Some(d);
                    continue;
                }
            }
            if year.is_none() && day.is_some() && token.bytes().all(|b| b.is_ascii_digit()) {
                year = Some(self.expand_year(token)?);
                continue;
            }
            return None;
        }

        let year = year.unwrap_or_else(|| self.reference.year());
        NaiveDate::from_ymd_opt(year, month?, day?)
    }

    /// Two-digit years land within 50 years of the reference year.
    fn expand_year(&self, digits: &str) -> Option<i32> {
        let value: i32 = digits.parse().ok()?;
        match digits.len() {
            4 => Some(value),
            2 => {
                let this_year = self.reference.year();
                let mut year = value + this_year / 100 * 100;
                if year >= this_year + 50 {
                    year -= 100;
                } else if year < this_year - 50 {
                    year += 100;
                }
                Some(year)
            }
            _ => None,
        }
    }
}

/// Last resort for "today", "yesterday", "last friday".
///
/// Only digit-free text without a month name gets here, so numeric and
/// month-based forms keep the reference year and date order.
fn infer_relative(text: &str) -> Option<NaiveDate> {
    let has_digit = text.bytes().any(|b| b.is_ascii_digit());
    let has_month = text.split_whitespace().any(|t| month_from_name(t).is_some());
    if has_digit || has_month {
        return None;
    }

    let input = text.to_lowercase();
    match fuzzydate::parse(&input) {
        Ok(datetime) => {
            let date = datetime.date();
            debug!(input = %text, date = %date, "parsed relative date");
            Some(date)
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inference() -> DateInference {
        DateInference::new(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(), DateOrder::MonthFirst)
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_names_and_abbreviations() {
        assert_eq!(month_from_name("Sept"), Some(9));
        assert_eq!(month_from_name("sep."), Some(9));
        assert_eq!(month_from_name("DECEMBER"), Some(12));
        assert_eq!(month_from_name("Milk"), None);
    }

    #[test]
    fn test_ordinal_day_month_uses_reference_year() {
        assert_eq!(inference().infer("3rd Sept"), Some(ymd(2026, 9, 3)));
        assert_eq!(inference().infer("21st March 2024"), Some(ymd(2024, 3, 21)));
    }

    #[test]
    fn test_month_day_forms() {
        assert_eq!(inference().infer("Sept 3"), Some(ymd(2026, 9, 3)));
        assert_eq!(inference().infer("Sep 3rd, 2024"), Some(ymd(2024, 9, 3)));
        assert_eq!(inference().infer("Monday 3 of September"), Some(ymd(2026, 9, 3)));
    }

    #[test]
    fn test_numeric_month_first_with_day_first_fallback() {
        assert_eq!(inference().infer("12/5/2024"), Some(ymd(2024, 12, 5)));
        assert_eq!(inference().infer("25/12/2024"), Some(ymd(2024, 12, 25)));
    }

    #[test]
    fn test_numeric_day_first_order() {
        let inf = DateInference::new(ymd(2026, 1, 1), DateOrder::DayFirst);
        assert_eq!(inf.infer("12/5/2024"), Some(ymd(2024, 5, 12)));
        assert_eq!(inf.infer("5/25/2024"), Some(ymd(2024, 5, 25)));
    }

    #[test]
    fn test_two_digit_year_window() {
        assert_eq!(inference().infer("1/2/24"), Some(ymd(2024, 1, 2)));
        assert_eq!(inference().infer("1/2/99"), Some(ymd(1999, 1, 2)));
    }

    #[test]
    fn test_iso_dates() {
        assert_eq!(inference().infer("2024-09-03"), Some(ymd(2024, 9, 3)));
        assert_eq!(inference().infer("2024/9/3"), Some(ymd(2024, 9, 3)));
    }

    #[test]
    fn test_rejects_non_dates() {
        assert_eq!(inference().infer("Vegetables 40"), None);
        assert_eq!(inference().infer("31st Feb"), None);
        assert_eq!(inference().infer("13/13/2024"), None);
        assert_eq!(inference().infer("Sept"), None);
        assert_eq!(inference().infer(""), None);
    }

    #[test]
    fn test_relative_phrases() {
        let today = chrono::Local::now().date_naive();
        assert_eq!(inference().infer("Today"), Some(today));
        assert_eq!(inference().infer("yesterday:"), today.pred_opt());
        assert_eq!(inference().infer("someday"), None);
    }

    #[test]
    fn test_date_order_from_str() {
        assert_eq!("day-first".parse::<DateOrder>().unwrap(), DateOrder::DayFirst);
        assert_eq!("MDY".parse::<DateOrder>().unwrap(), DateOrder::MonthFirst);
        assert!("sideways".parse::<DateOrder>().is_err());
    }
}
