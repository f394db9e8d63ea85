//! Heuristic multi-format date parsing.
//!
//! Extracts arrive from several systems and rarely agree on a date shape, so a
//! value is matched against a fixed set of shapes instead of one format string.
//! Ambiguous numeric values (`03/04/2025`) are resolved per column: any value
//! whose first field exceeds 12 proves the column is day-first, any value whose
//! second field exceeds 12 proves it is month-first.

use crate::utils::error::{KitError, Result};
use chrono::{Days, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

const DEFAULT_NA_VALUES: &[&str] = &["", "na", "n/a", "null", "nan", "none", "-", "."];

// Excel's day zero; serial 60 is the phantom 1900-02-29, which this epoch absorbs.
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

// Two-digit years below this land in the 2000s.
const TWO_DIGIT_YEAR_PIVOT: u32 = 69;

static TIME_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?P<date>.*?\d)(?:[ T]+|,\s*)(?:\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?\s*(?:[ap]\.?m\.?)?\s*(?:z|utc|[+-]\d{2}:?\d{2})?)$",
    )
    .expect("time suffix pattern is valid")
});

static NUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,4})[/\-.](\d{1,2})[/\-.](\d{1,4})$").expect("numeric date pattern is valid")
});

static DAY_MONTH_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})(?:st|nd|rd|th)?[\s\-/.]*([A-Za-z]{3,})\.?,?[\s\-/.,]+(\d{4}|\d{2})$")
        .expect("day-month-name pattern is valid")
});

static MONTH_NAME_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z]{3,})\.?[\s\-/]+(\d{1,2})(?:st|nd|rd|th)?,?[\s\-/,]+(\d{4}|\d{2})$")
        .expect("month-name-day pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DayOrder {
    #[default]
    MonthFirst,
    DayFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DateFormat {
    Iso,
    NumericMdy,
    NumericDmy,
    Compact,
    DayMonthName,
    MonthNameDay,
    ExcelSerial,
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DateFormat::Iso => "YYYY-MM-DD",
            DateFormat::NumericMdy => "MM/DD/YYYY",
            DateFormat::NumericDmy => "DD/MM/YYYY",
            DateFormat::Compact => "YYYYMMDD",
            DateFormat::DayMonthName => "DD-Mon-YYYY",
            DateFormat::MonthNameDay => "Month DD, YYYY",
            DateFormat::ExcelSerial => "Excel serial",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseFailure {
    /// 1-based data row.
    pub row: usize,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ParsedColumn {
    pub dates: Vec<Option<NaiveDate>>,
    pub day_order: DayOrder,
    pub formats: BTreeMap<DateFormat, usize>,
    pub failures: Vec<ParseFailure>,
}

impl ParsedColumn {
    pub fn dominant_format(&self) -> Option<DateFormat> {
        self.formats
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(format, _)| *format)
    }

    pub fn parsed_count(&self) -> usize {
        self.dates.iter().filter(|d| d.is_some()).count()
    }

    pub fn iso_strings(&self) -> Vec<String> {
        self.dates
            .iter()
            .map(|d| d.map(format_iso).unwrap_or_default())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct DateParser {
    day_order: DayOrder,
    na_values: Vec<String>,
}

impl Default for DateParser {
    fn default() -> Self {
        Self::new(DayOrder::default())
    }
}

impl DateParser {
    pub fn new(day_order: DayOrder) -> Self {
        Self {
            day_order,
            na_values: DEFAULT_NA_VALUES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_na_values<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for value in extra {
            let value = value.as_ref().trim().to_lowercase();
            if !self.na_values.contains(&value) {
                self.na_values.push(value);
            }
        }
        self
    }

    pub fn day_order(&self) -> DayOrder {
        self.day_order
    }

    pub fn is_na(&self, value: &str) -> bool {
        let value = value.trim().to_lowercase();
        self.na_values.iter().any(|na| *na == value)
    }

    pub fn parse(&self, value: &str) -> Result<Option<NaiveDate>> {
        Ok(self
            .parse_detailed(value, self.day_order)?
            .map(|(date, _)| date))
    }

    /// Parses one value with an explicit day order for ambiguous numerics.
    pub fn parse_detailed(
        &self,
        value: &str,
        order: DayOrder,
    ) -> Result<Option<(NaiveDate, DateFormat)>> {
        if self.is_na(value) {
            return Ok(None);
        }
        let body = strip_time(value.trim());

        parse_numeric(body, order)
            .or_else(|| parse_compact(body))
            .or_else(|| parse_excel_serial(body))
            .or_else(|| parse_day_month_name(body))
            .or_else(|| parse_month_name_day(body))
            .map(Some)
            .ok_or_else(|| KitError::DateParseError {
                value: value.to_string(),
            })
    }

    /// Parses a whole column, settling day/month order from the column's own
    /// evidence before parsing any value.
    pub fn parse_column<S: AsRef<str>>(&self, values: &[S]) -> ParsedColumn {
        let day_order = self.infer_day_order(values);
        let mut dates = Vec::with_capacity(values.len());
        let mut formats = BTreeMap::new();
        let mut failures = Vec::new();

        for (i, value) in values.iter().enumerate() {
            match self.parse_detailed(value.as_ref(), day_order) {
                Ok(Some((date, format))) => {
                    *formats.entry(format).or_insert(0) += 1;
                    dates.push(Some(date));
                }
                Ok(None) => dates.push(None),
                Err(_) => {
                    failures.push(ParseFailure {
                        row: i + 1,
                        value: value.as_ref().to_string(),
                    });
                    dates.push(None);
                }
            }
        }

        ParsedColumn {
            dates,
            day_order,
            formats,
            failures,
        }
    }

    pub fn infer_day_order<S: AsRef<str>>(&self, values: &[S]) -> DayOrder {
        let mut day_first = 0usize;
        let mut month_first = 0usize;

        for value in values {
            let body = strip_time(value.as_ref().trim());
            if let Some((a, b, _)) = numeric_fields(body) {
                match order_evidence(a, b) {
                    Some(DayOrder::DayFirst) => day_first += 1,
                    Some(DayOrder::MonthFirst) => month_first += 1,
                    None => {}
                }
            }
        }

        match (day_first, month_first) {
            (0, 0) => self.day_order,
            (_, 0) => DayOrder::DayFirst,
            (0, _) => DayOrder::MonthFirst,
            (d, m) => {
                tracing::warn!(
                    "Column mixes day-first ({}) and month-first ({}) values; using {:?}",
                    d,
                    m,
                    self.day_order
                );
                self.day_order
            }
        }
    }
}

pub fn format_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn strip_time(value: &str) -> &str {
    TIME_SUFFIX
        .captures(value)
        .and_then(|caps| caps.name("date"))
        .map(|m| m.as_str().trim())
        .unwrap_or(value)
}

/// Fields of an `a/b/c` value whose first field is not a 4-digit year.
fn numeric_fields(body: &str) -> Option<(u32, u32, &str)> {
    let caps = NUMERIC.captures(body)?;
    let first = caps.get(1)?.as_str();
    if first.len() > 2 {
        return None;
    }
    let a = first.parse().ok()?;
    let b = caps.get(2)?.as_str().parse().ok()?;
    Some((a, b, caps.get(3)?.as_str()))
}

fn order_evidence(a: u32, b: u32) -> Option<DayOrder> {
    match (a > 12, b > 12) {
        (true, false) => Some(DayOrder::DayFirst),
        (false, true) => Some(DayOrder::MonthFirst),
        _ => None,
    }
}

fn expand_year(digits: &str) -> Option<i32> {
    let year: u32 = digits.parse().ok()?;
    match digits.len() {
        4 => Some(year as i32),
        2 if year < TWO_DIGIT_YEAR_PIVOT => Some(2000 + year as i32),
        2 => Some(1900 + year as i32),
        _ => None,
    }
}

fn parse_numeric(body: &str, order: DayOrder) -> Option<(NaiveDate, DateFormat)> {
    let caps = NUMERIC.captures(body)?;
    let first = caps.get(1)?.as_str();

    if first.len() == 4 {
        let year = first.parse().ok()?;
        let month = caps.get(2)?.as_str().parse().ok()?;
        let day_field = caps.get(3)?.as_str();
        if day_field.len() > 2 {
            return None;
        }
        let day = day_field.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day).map(|d| (d, DateFormat::Iso));
    }

    let (a, b, year_field) = numeric_fields(body)?;
    let year = expand_year(year_field)?;
    let order = order_evidence(a, b).unwrap_or(order);
    let (month, day, format) = match order {
        DayOrder::MonthFirst => (a, b, DateFormat::NumericMdy),
        DayOrder::DayFirst => (b, a, DateFormat::NumericDmy),
    };
    NaiveDate::from_ymd_opt(year, month, day).map(|d| (d, format))
}

fn parse_compact(body: &str) -> Option<(NaiveDate, DateFormat)> {
    if body.len() != 8 || !body.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = body[0..4].parse().ok()?;
    if year < 1900 {
        return None;
    }
    let month = body[4..6].parse().ok()?;
    let day = body[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| (d, DateFormat::Compact))
}

/// Five-digit serials only (1927-05-18 through 2173-10-14); shorter numbers
/// are far likelier to be counts or ids than dates.
fn parse_excel_serial(body: &str) -> Option<(NaiveDate, DateFormat)> {
    let integer_part = body.split('.').next()?;
    if integer_part.len() != 5 || !integer_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let serial: f64 = body.parse().ok()?;
    if !serial.is_finite() {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?
        .checked_add_days(Days::new(serial.floor() as u64))
        .map(|d| (d, DateFormat::ExcelSerial))
}

fn parse_day_month_name(body: &str) -> Option<(NaiveDate, DateFormat)> {
    let caps = DAY_MONTH_NAME.captures(body)?;
    let day = caps.get(1)?.as_str().parse().ok()?;
    let month = month_from_name(caps.get(2)?.as_str())?;
    let year = expand_year(caps.get(3)?.as_str())?;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| (d, DateFormat::DayMonthName))
}

fn parse_month_name_day(body: &str) -> Option<(NaiveDate, DateFormat)> {
    let caps = MONTH_NAME_DAY.captures(body)?;
    let month = month_from_name(caps.get(1)?.as_str())?;
    let day = caps.get(2)?.as_str().parse().ok()?;
    let year = expand_year(caps.get(3)?.as_str())?;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| (d, DateFormat::MonthNameDay))
}

fn month_from_name(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];
    let name = name.to_lowercase();
    if name.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| m.starts_with(&name))
        .map(|i| i as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn us() -> DateParser {
        DateParser::new(DayOrder::MonthFirst)
    }

    #[test]
    fn test_iso_variants() {
        let p = us();
        assert_eq!(p.parse("2025-01-15").unwrap(), Some(d(2025, 1, 15)));
        assert_eq!(p.parse("2025/1/5").unwrap(), Some(d(2025, 1, 5)));
        assert_eq!(p.parse("2025.12.31").unwrap(), Some(d(2025, 12, 31)));
    }

    #[test]
    fn test_time_suffixes_are_ignored() {
        let p = us();
        for value in [
            "2025-01-15 13:45",
            "2025-01-15 13:45:00",
            "2025-01-15T13:45:00Z",
            "2025-01-15T13:45:00.123+05:00",
            "1/15/2025 1:05 PM",
            "01/15/2025 01:05:09 a.m.",
            "Jan 15, 2025, 1:05 PM",
            "January 15 2025, 13:05",
            "15 Jan 2025 1:05pm",
        ] {
            assert_eq!(p.parse(value).unwrap(), Some(d(2025, 1, 15)), "{}", value);
        }
    }

    #[test]
    fn test_numeric_orders() {
        let us = us();
        let eu = DateParser::new(DayOrder::DayFirst);
        assert_eq!(us.parse("03/04/2025").unwrap(), Some(d(2025, 3, 4)));
        assert_eq!(eu.parse("03/04/2025").unwrap(), Some(d(2025, 4, 3)));
        // A field over 12 settles the order regardless of preference.
        assert_eq!(us.parse("25/12/2024").unwrap(), Some(d(2024, 12, 25)));
        assert_eq!(eu.parse("12/25/2024").unwrap(), Some(d(2024, 12, 25)));
    }

    #[test]
    fn test_two_digit_year_pivot() {
        let p = us();
        assert_eq!(p.parse("1/2/25").unwrap(), Some(d(2025, 1, 2)));
        assert_eq!(p.parse("1/2/68").unwrap(), Some(d(2068, 1, 2)));
        assert_eq!(p.parse("1/2/69").unwrap(), Some(d(1969, 1, 2)));
        assert_eq!(p.parse("15-Mar-99").unwrap(), Some(d(1999, 3, 15)));
    }

    #[test]
    fn test_month_names() {
        let p = us();
        assert_eq!(p.parse("15-Jan-2025").unwrap(), Some(d(2025, 1, 15)));
        assert_eq!(p.parse("15 January 2025").unwrap(), Some(d(2025, 1, 15)));
        assert_eq!(p.parse("5th Sept 2025").unwrap(), Some(d(2025, 9, 5)));
        assert_eq!(p.parse("January 15, 2025").unwrap(), Some(d(2025, 1, 15)));
        assert_eq!(p.parse("Jan. 5th, 2025").unwrap(), Some(d(2025, 1, 5)));
        assert_eq!(p.parse("DEC 31 2024").unwrap(), Some(d(2024, 12, 31)));
        assert!(p.parse("Ja 5, 2025").is_err());
        assert!(p.parse("Smarch 5, 2025").is_err());
    }

    #[test]
    fn test_compact_and_excel_serial() {
        let p = us();
        assert_eq!(p.parse("20250115").unwrap(), Some(d(2025, 1, 15)));
        assert_eq!(p.parse("45672").unwrap(), Some(d(2025, 1, 15)));
        assert_eq!(p.parse("45672.75").unwrap(), Some(d(2025, 1, 15)));
        assert!(p.parse("2025").is_err());
        assert!(p.parse("12").is_err());
    }

    #[test]
    fn test_na_values() {
        let p = us().with_na_values(["UNKNOWN"]);
        for value in ["", "  ", "NA", "n/a", "NULL", "-", "unknown"] {
            assert_eq!(p.parse(value).unwrap(), None, "{:?}", value);
        }
    }

    #[test]
    fn test_impossible_dates_fail() {
        let p = us();
        for value in ["02/30/2025", "2025-13-01", "13/13/2025", "31-Feb-2025", "not a date"] {
            assert!(
                matches!(p.parse(value), Err(KitError::DateParseError { .. })),
                "{} should fail",
                value
            );
        }
    }

    #[test]
    fn test_column_infers_day_first() {
        let values = ["03/04/2025", "25/04/2025", "NA", "garbage", "2025-04-30"];
        let parsed = us().parse_column(&values);

        assert_eq!(parsed.day_order, DayOrder::DayFirst);
        assert_eq!(parsed.dates[0], Some(d(2025, 4, 3)));
        assert_eq!(parsed.dates[1], Some(d(2025, 4, 25)));
        assert_eq!(parsed.dates[2], None);
        assert_eq!(parsed.dates[4], Some(d(2025, 4, 30)));
        assert_eq!(
            parsed.failures,
            vec![ParseFailure {
                row: 4,
                value: "garbage".to_string()
            }]
        );
        assert_eq!(parsed.parsed_count(), 3);
        assert_eq!(parsed.dominant_format(), Some(DateFormat::NumericDmy));
    }

    #[test]
    fn test_column_with_conflicting_evidence_uses_default() {
        let values = ["25/04/2025", "04/25/2025", "03/04/2025"];
        let parsed = DateParser::new(DayOrder::MonthFirst).parse_column(&values);
        assert_eq!(parsed.day_order, DayOrder::MonthFirst);
        // Each unambiguous value still parses by its own evidence.
        assert_eq!(parsed.dates[0], Some(d(2025, 4, 25)));
        assert_eq!(parsed.dates[1], Some(d(2025, 4, 25)));
        assert_eq!(parsed.dates[2], Some(d(2025, 3, 4)));
        assert!(parsed.failures.is_empty());
    }

    #[test]
    fn test_iso_strings_leave_missing_blank() {
        let parsed = us().parse_column(&["1/2/2025", ""]);
        assert_eq!(parsed.iso_strings(), vec!["2025-01-02".to_string(), String::new()]);
    }
}
