//! Reporting periods and the folder-date tokens derived from them.
//!
//! A folder date names the subfolder a period's extracts and outputs live in:
//! `2025_01` (monthly), `2025_Q1` (quarterly) or `2025` (annual).

use crate::utils::error::{KitError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2199;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Monthly,
    #[default]
    Quarterly,
    Annual,
}

impl Cadence {
    fn periods_per_year(self) -> u32 {
        match self {
            Cadence::Monthly => 12,
            Cadence::Quarterly => 4,
            Cadence::Annual => 1,
        }
    }

    fn months_per_period(self) -> u32 {
        12 / self.periods_per_year()
    }
}

impl FromStr for Cadence {
    type Err = KitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" | "month" | "m" => Ok(Cadence::Monthly),
            "quarterly" | "quarter" | "q" => Ok(Cadence::Quarterly),
            "annual" | "yearly" | "year" | "y" => Ok(Cadence::Annual),
            other => Err(KitError::InvalidConfigValueError {
                field: "cadence".to_string(),
                value: other.to_string(),
                reason: "Expected monthly, quarterly or annual".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    year: i32,
    // Declared after `year` so derived ordering is chronological within a cadence.
    index: u32,
    cadence: Cadence,
}

impl Period {
    pub fn new(year: i32, cadence: Cadence, index: u32) -> Result<Self> {
        let token = format!("{}/{:?}/{}", year, cadence, index);
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(KitError::InvalidPeriod {
                value: token,
                reason: format!("year must be between {} and {}", MIN_YEAR, MAX_YEAR),
            });
        }
        if index == 0 || index > cadence.periods_per_year() {
            return Err(KitError::InvalidPeriod {
                value: token,
                reason: format!(
                    "index must be between 1 and {} for {:?}",
                    cadence.periods_per_year(),
                    cadence
                ),
            });
        }
        Ok(Self {
            year,
            index,
            cadence,
        })
    }

    /// The period a date falls in. Dates outside 1900..=2199 have no folder date.
    pub fn containing(date: NaiveDate, cadence: Cadence) -> Result<Self> {
        let index = (date.month() - 1) / cadence.months_per_period() + 1;
        Self::new(date.year(), cadence, index)
    }

    /// The folder date for a report run on `today`: the period containing it,
    /// moved back `lag` periods.
    pub fn reporting(today: NaiveDate, cadence: Cadence, lag: u32) -> Result<Self> {
        Self::containing(today, cadence)?.shift(-(lag as i64))
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn shift(&self, n: i64) -> Result<Self> {
        let (year, index) = self.shifted(n);
        Self::new(year, self.cadence, index)
    }

    pub fn previous(&self) -> Result<Self> {
        self.shift(-1)
    }

    pub fn next(&self) -> Result<Self> {
        self.shift(1)
    }

    fn shifted(&self, n: i64) -> (i32, u32) {
        let per_year = self.cadence.periods_per_year() as i64;
        let ordinal = self.year as i64 * per_year + (self.index as i64 - 1) + n;
        (
            ordinal.div_euclid(per_year) as i32,
            ordinal.rem_euclid(per_year) as u32 + 1,
        )
    }

    fn first_day(year: i32, index: u32, cadence: Cadence) -> NaiveDate {
        let month = (index - 1) * cadence.months_per_period() + 1;
        NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn start_date(&self) -> NaiveDate {
        Self::first_day(self.year, self.index, self.cadence)
    }

    pub fn end_date(&self) -> NaiveDate {
        // The following period may lie past 2199, so only its first day is built.
        let (year, index) = self.shifted(1);
        Self::first_day(year, index, self.cadence)
            .pred_opt()
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date() <= date && date <= self.end_date()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cadence {
            Cadence::Monthly => write!(f, "{}_{:02}", self.year, self.index),
            Cadence::Quarterly => write!(f, "{}_Q{}", self.year, self.index),
            Cadence::Annual => write!(f, "{}", self.year),
        }
    }
}

impl FromStr for Period {
    type Err = KitError;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim();
        let invalid = |reason: &str| KitError::InvalidPeriod {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        if raw.len() < 4 || !raw.is_char_boundary(4) {
            return Err(invalid("expected a 4-digit year first"));
        }
        let (year_part, rest) = raw.split_at(4);
        let year: i32 = year_part
            .parse()
            .map_err(|_| invalid("expected a 4-digit year first"))?;
        let rest = rest.strip_prefix(&['_', '-', ' '][..]).unwrap_or(rest);
        let build = |cadence: Cadence, index: u32| {
            Period::new(year, cadence, index).map_err(|e| match e {
                KitError::InvalidPeriod { reason, .. } => KitError::InvalidPeriod {
                    value: s.to_string(),
                    reason,
                },
                other => other,
            })
        };

        if rest.is_empty() {
            return build(Cadence::Annual, 1);
        }

        if let Some(q) = rest.strip_prefix(&['Q', 'q'][..]) {
            if q.len() != 1 {
                return Err(invalid("quarter must be 1-4"));
            }
            let index: u32 = q.parse().map_err(|_| invalid("quarter must be 1-4"))?;
            return build(Cadence::Quarterly, index);
        }

        if !rest.is_empty() && rest.len() <= 2 && rest.chars().all(|c| c.is_ascii_digit()) {
            let index: u32 = rest.parse().map_err(|_| invalid("month must be 01-12"))?;
            return build(Cadence::Monthly, index);
        }

        Err(invalid("expected YYYY, YYYY_Qn or YYYY_MM"))
    }
}

impl Serialize for Period {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_tokens() {
        let token = |date, cadence| Period::containing(date, cadence).unwrap().to_string();
        assert_eq!(token(d(2025, 2, 14), Cadence::Quarterly), "2025_Q1");
        assert_eq!(token(d(2025, 2, 14), Cadence::Monthly), "2025_02");
        assert_eq!(token(d(2025, 2, 14), Cadence::Annual), "2025");
        assert_eq!(token(d(2025, 12, 31), Cadence::Quarterly), "2025_Q4");
    }

    #[test]
    fn test_reporting_lag_crosses_year_boundary() {
        let today = d(2025, 1, 10);
        let token = |cadence, lag| Period::reporting(today, cadence, lag).unwrap().to_string();
        assert_eq!(token(Cadence::Quarterly, 1), "2024_Q4");
        assert_eq!(token(Cadence::Monthly, 1), "2024_12");
        assert_eq!(token(Cadence::Monthly, 0), "2025_01");
        assert_eq!(token(Cadence::Annual, 1), "2024");
        assert_eq!(token(Cadence::Monthly, 13), "2023_12");
    }

    #[test]
    fn test_shift_composes() {
        let p: Period = "2025_Q2".parse().unwrap();
        assert_eq!(p.shift(3).unwrap().shift(-5).unwrap(), p.shift(-2).unwrap());
        assert_eq!(p.shift(-2).unwrap().to_string(), "2024_Q4");
        assert_eq!(p.shift(7).unwrap().to_string(), "2027_Q1");
    }

    #[test]
    fn test_bounds() {
        let q: Period = "2024_Q1".parse().unwrap();
        assert_eq!(q.start_date(), d(2024, 1, 1));
        assert_eq!(q.end_date(), d(2024, 3, 31));

        let feb: Period = "2024_02".parse().unwrap();
        assert_eq!(feb.end_date(), d(2024, 2, 29));
        assert!(feb.contains(d(2024, 2, 29)));
        assert!(!feb.contains(d(2024, 3, 1)));

        let dec: Period = "2024_12".parse().unwrap();
        assert_eq!(dec.end_date(), d(2024, 12, 31));
    }

    #[test]
    fn test_parse_accepts_separator_variants() {
        for token in ["2025_Q1", "2025-Q1", "2025Q1", "2025q1", " 2025_Q1 "] {
            assert_eq!(token.parse::<Period>().unwrap().to_string(), "2025_Q1", "{}", token);
        }
        for token in ["2025_01", "2025-01", "202501", "2025_1"] {
            assert_eq!(token.parse::<Period>().unwrap().to_string(), "2025_01", "{}", token);
        }
        assert_eq!("2025".parse::<Period>().unwrap().cadence(), Cadence::Annual);
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        let tokens = [
            "2025_13", "2025_00", "2025_Q5", "2025_Q0", "1850_Q1", "25_Q1", "2025_Q12", "abcd",
            "2025_XY",
        ];
        for token in tokens {
            assert!(
                matches!(token.parse::<Period>(), Err(KitError::InvalidPeriod { .. })),
                "{} should be rejected",
                token
            );
        }
    }

    #[test]
    fn test_display_parse_round_trip() {
        let mut p = Period::containing(d(2023, 11, 5), Cadence::Monthly).unwrap();
        for _ in 0..30 {
            assert_eq!(p.to_string().parse::<Period>().unwrap(), p);
            assert_eq!(Period::containing(p.start_date(), Cadence::Monthly).unwrap(), p);
            assert_eq!(Period::containing(p.end_date(), Cadence::Monthly).unwrap(), p);
            p = p.next().unwrap();
        }
    }

    #[test]
    fn test_periods_outside_supported_years_are_rejected() {
        assert!(matches!(
            Period::containing(d(2300, 1, 1), Cadence::Quarterly),
            Err(KitError::InvalidPeriod { .. })
        ));
        assert!(Period::containing(d(1899, 12, 31), Cadence::Monthly).is_err());

        let last: Period = "2199_Q4".parse().unwrap();
        assert!(last.next().is_err());
        assert_eq!(last.end_date(), d(2199, 12, 31));
        assert!(last.contains(d(2199, 12, 31)));

        let first: Period = "1900_01".parse().unwrap();
        assert!(first.previous().is_err());
        assert!(Period::reporting(d(1900, 1, 15), Cadence::Monthly, 1).is_err());
    }
}
