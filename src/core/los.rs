//! Length-of-stay computation between admission and discharge dates.

use crate::core::dates::DateParser;
use crate::core::period::Period;
use crate::utils::error::{KitError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LosCounting {
    /// Discharge minus admission; a same-day stay is 0.
    #[default]
    Nights,
    /// Both endpoints count; a same-day stay is 1.
    Inclusive,
}

#[derive(Debug, Clone, Default)]
pub struct LosOptions {
    pub counting: LosCounting,
    /// Open stays (no discharge) are measured to this date when set.
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StayIssue {
    MissingAdmission,
    DischargeBeforeAdmission,
    Open,
}

impl fmt::Display for StayIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StayIssue::MissingAdmission => f.write_str("missing admission date"),
            StayIssue::DischargeBeforeAdmission => f.write_str("discharge precedes admission"),
            StayIssue::Open => f.write_str("stay is still open"),
        }
    }
}

pub fn length_of_stay(
    admit: Option<NaiveDate>,
    discharge: Option<NaiveDate>,
    opts: &LosOptions,
) -> std::result::Result<i64, StayIssue> {
    let admit = admit.ok_or(StayIssue::MissingAdmission)?;
    let end = discharge.or(opts.as_of).ok_or(StayIssue::Open)?;

    let nights = (end - admit).num_days();
    if nights < 0 {
        return Err(StayIssue::DischargeBeforeAdmission);
    }

    Ok(match opts.counting {
        LosCounting::Nights => nights,
        LosCounting::Inclusive => nights + 1,
    })
}

/// Resolves an as-of setting: `period_end`, `today`, or any date the parser
/// understands.
pub fn resolve_as_of(
    raw: &str,
    period: &Period,
    today: NaiveDate,
    parser: &DateParser,
) -> Result<NaiveDate> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "period_end" => Ok(period.end_date()),
        "today" => Ok(today),
        _ => parser.parse(raw)?.ok_or_else(|| KitError::DateParseError {
            value: raw.to_string(),
        }),
    }
}

/// Ascending inclusive upper bounds; the last band is open-ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LosBands {
    bounds: Vec<i64>,
}

impl Default for LosBands {
    fn default() -> Self {
        Self {
            bounds: vec![7, 30, 90, 180, 365],
        }
    }
}

impl LosBands {
    /// Bounds are sorted and de-duplicated; negative bounds are dropped.
    pub fn new(mut bounds: Vec<i64>) -> Self {
        bounds.retain(|b| *b >= 0);
        bounds.sort_unstable();
        bounds.dedup();
        Self { bounds }
    }

    pub fn bounds(&self) -> &[i64] {
        &self.bounds
    }

    pub fn label(&self, days: i64) -> String {
        let mut lower = 0;
        for &upper in &self.bounds {
            if days <= upper {
                return format!("{}-{}", lower, upper);
            }
            lower = upper + 1;
        }
        format!("{}+", lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, day)
    }

    #[test]
    fn test_nights_and_inclusive() {
        let nights = LosOptions::default();
        let inclusive = LosOptions {
            counting: LosCounting::Inclusive,
            as_of: None,
        };

        assert_eq!(length_of_stay(d(2025, 1, 1), d(2025, 1, 1), &nights), Ok(0));
        assert_eq!(length_of_stay(d(2025, 1, 1), d(2025, 1, 1), &inclusive), Ok(1));
        assert_eq!(length_of_stay(d(2024, 12, 30), d(2025, 1, 2), &nights), Ok(3));
        assert_eq!(length_of_stay(d(2024, 2, 28), d(2024, 3, 1), &nights), Ok(2));
    }

    #[test]
    fn test_open_stays() {
        let without = LosOptions::default();
        assert_eq!(length_of_stay(d(2025, 1, 1), None, &without), Err(StayIssue::Open));

        let with = LosOptions {
            counting: LosCounting::Nights,
            as_of: d(2025, 3, 31),
        };
        assert_eq!(length_of_stay(d(2025, 3, 1), None, &with), Ok(30));
        // A recorded discharge always wins over as_of.
        assert_eq!(length_of_stay(d(2025, 3, 1), d(2025, 3, 5), &with), Ok(4));
    }

    #[test]
    fn test_invalid_stays() {
        let opts = LosOptions::default();
        assert_eq!(
            length_of_stay(None, d(2025, 1, 1), &opts),
            Err(StayIssue::MissingAdmission)
        );
        assert_eq!(
            length_of_stay(d(2025, 1, 2), d(2025, 1, 1), &opts),
            Err(StayIssue::DischargeBeforeAdmission)
        );
    }

    #[test]
    fn test_band_labels() {
        let bands = LosBands::default();
        assert_eq!(bands.label(0), "0-7");
        assert_eq!(bands.label(7), "0-7");
        assert_eq!(bands.label(8), "8-30");
        assert_eq!(bands.label(365), "181-365");
        assert_eq!(bands.label(366), "366+");

        let custom = LosBands::new(vec![30, -1, 10, 10]);
        assert_eq!(custom.bounds(), &[10, 30]);
        assert_eq!(custom.label(11), "11-30");
    }

    #[test]
    fn test_resolve_as_of() {
        let period: Period = "2025_Q1".parse().unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap();
        let parser = DateParser::default();
        let resolve = |raw: &str| resolve_as_of(raw, &period, today, &parser);

        assert_eq!(resolve("period_end").unwrap(), NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());
        assert_eq!(resolve(" Today ").unwrap(), today);
        assert_eq!(resolve("2025-02-28").ok(), d(2025, 2, 28));
        assert_eq!(resolve("03/15/2025").ok(), d(2025, 3, 15));
        assert_eq!(resolve("15 Mar 2025").ok(), d(2025, 3, 15));
        assert!(matches!(resolve("March 3rd"), Err(KitError::DateParseError { .. })));
        assert!(matches!(resolve(""), Err(KitError::DateParseError { .. })));
    }
}
