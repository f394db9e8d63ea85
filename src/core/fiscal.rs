//! Fiscal-year tagging.
//!
//! Fiscal years are named by the calendar year they end in: with a July start,
//! 2024-07-01 through 2025-06-30 is FY2025.

use crate::utils::error::{KitError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FyLabel {
    /// `FY2025`
    #[default]
    EndYear,
    /// `FY2024-25`
    Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiscalCalendar {
    start_month: u32,
    label: FyLabel,
}

impl Default for FiscalCalendar {
    fn default() -> Self {
        Self {
            start_month: 7,
            label: FyLabel::EndYear,
        }
    }
}

impl FiscalCalendar {
    pub fn new(start_month: u32, label: FyLabel) -> Result<Self> {
        if !(1..=12).contains(&start_month) {
            return Err(KitError::InvalidConfigValueError {
                field: "fiscal.start_month".to_string(),
                value: start_month.to_string(),
                reason: "Value must be between 1 and 12".to_string(),
            });
        }
        Ok(Self { start_month, label })
    }

    pub fn start_month(&self) -> u32 {
        self.start_month
    }

    pub fn fiscal_year(&self, date: NaiveDate) -> i32 {
        if self.start_month > 1 && date.month() >= self.start_month {
            date.year() + 1
        } else {
            date.year()
        }
    }

    pub fn fiscal_quarter(&self, date: NaiveDate) -> u32 {
        let offset = (date.month() + 12 - self.start_month) % 12;
        offset / 3 + 1
    }

    pub fn fiscal_year_label(&self, fy: i32) -> String {
        match self.label {
            FyLabel::EndYear => format!("FY{}", fy),
            FyLabel::Span if self.start_month == 1 => format!("FY{}", fy),
            FyLabel::Span => format!("FY{}-{:02}", fy - 1, fy.rem_euclid(100)),
        }
    }

    pub fn label_for(&self, date: NaiveDate) -> String {
        self.fiscal_year_label(self.fiscal_year(date))
    }

    pub fn quarter_label(&self, date: NaiveDate) -> String {
        format!("{} Q{}", self.label_for(date), self.fiscal_quarter(date))
    }

    /// First and last day of fiscal year `fy`.
    pub fn fiscal_year_bounds(&self, fy: i32) -> Option<(NaiveDate, NaiveDate)> {
        let start_year = if self.start_month == 1 { fy } else { fy - 1 };
        let start = NaiveDate::from_ymd_opt(start_year, self.start_month, 1)?;
        let next_start = NaiveDate::from_ymd_opt(start_year + 1, self.start_month, 1)?;
        Some((start, next_start.pred_opt()?))
    }
}
