use crate::core::dates::{format_iso, DateParser, ParseFailure};
use crate::core::fiscal::FiscalCalendar;
use crate::core::los::{length_of_stay, LosBands, LosOptions, StayIssue};
use crate::domain::model::{RowWarning, StepOutcome, Table};
use crate::domain::ports::TableStep;
use crate::utils::error::Result;
use std::collections::HashSet;

fn failures_to_warnings(column: &str, failures: &[ParseFailure]) -> Vec<RowWarning> {
    failures
        .iter()
        .map(|f| RowWarning {
            row: f.row,
            column: column.to_string(),
            value: f.value.clone(),
            message: "unrecognised date".to_string(),
        })
        .collect()
}

/// Normalises a date column to ISO `YYYY-MM-DD`.
pub struct ParseDatesStep {
    pub column: String,
    /// Target column; `None` rewrites the source column in place.
    pub into: Option<String>,
    pub parser: DateParser,
}

impl TableStep for ParseDatesStep {
    fn name(&self) -> &str {
        "parse_dates"
    }

    fn apply(&self, mut table: Table) -> Result<StepOutcome> {
        let idx = table.column_index(&self.column)?;
        let source = table.headers[idx].clone();
        let parsed = self.parser.parse_column(&table.column_values(&source)?);

        tracing::info!(
            "📅 {}: {}/{} values parsed (day order {:?}, mostly {})",
            source,
            parsed.parsed_count(),
            table.len(),
            parsed.day_order,
            parsed
                .dominant_format()
                .map(|f| f.to_string())
                .unwrap_or_else(|| "n/a".to_string())
        );

        let warnings = failures_to_warnings(&source, &parsed.failures);
        let target = self.into.clone().unwrap_or(source);
        table.set_column(&target, parsed.iso_strings())?;
        Ok(StepOutcome { table, warnings })
    }
}

pub struct LengthOfStayStep {
    pub admit_column: String,
    pub discharge_column: String,
    pub output_column: String,
    pub options: LosOptions,
    /// Adds `<output_column>_band` when set.
    pub bands: Option<LosBands>,
    pub parser: DateParser,
}

impl LengthOfStayStep {
    pub fn new(admit_column: &str, discharge_column: &str) -> Self {
        Self {
            admit_column: admit_column.to_string(),
            discharge_column: discharge_column.to_string(),
            output_column: "los_days".to_string(),
            options: LosOptions::default(),
            bands: None,
            parser: DateParser::default(),
        }
    }
}

impl TableStep for LengthOfStayStep {
    fn name(&self) -> &str {
        "length_of_stay"
    }

    fn apply(&self, mut table: Table) -> Result<StepOutcome> {
        let admits = self
            .parser
            .parse_column(&table.column_values(&self.admit_column)?);
        let discharges = self
            .parser
            .parse_column(&table.column_values(&self.discharge_column)?);

        let mut warnings = failures_to_warnings(&self.admit_column, &admits.failures);
        warnings.extend(failures_to_warnings(&self.discharge_column, &discharges.failures));

        // Rows whose dates did not parse are already warned about above.
        let unparsed: HashSet<usize> = admits
            .failures
            .iter()
            .chain(&discharges.failures)
            .map(|f| f.row)
            .collect();

        let mut days = Vec::with_capacity(table.len());
        let mut bands = Vec::with_capacity(table.len());
        let mut open = 0usize;

        for (i, (admit, discharge)) in admits.dates.iter().zip(&discharges.dates).enumerate() {
            let row = i + 1;
            if unparsed.contains(&row) {
                days.push(String::new());
                bands.push(String::new());
                continue;
            }
            match length_of_stay(*admit, *discharge, &self.options) {
                Ok(n) => {
                    days.push(n.to_string());
                    bands.push(self.bands.as_ref().map(|b| b.label(n)).unwrap_or_default());
                }
                Err(issue) => {
                    if issue == StayIssue::Open {
                        open += 1;
                    } else {
                        let (column, value) = match issue {
                            StayIssue::MissingAdmission => {
                                (&self.admit_column, admit.map(format_iso))
                            }
                            _ => (&self.discharge_column, discharge.map(format_iso)),
                        };
                        warnings.push(RowWarning {
                            row,
                            column: column.clone(),
                            value: value.unwrap_or_default(),
                            message: issue.to_string(),
                        });
                    }
                    days.push(String::new());
                    bands.push(String::new());
                }
            }
        }

        if open > 0 {
            tracing::info!(
                "🏥 {} open stay(s) left blank (no discharge and no as-of date)",
                open
            );
        }

        table.set_column(&self.output_column, days)?;
        if self.bands.is_some() {
            table.set_column(&format!("{}_band", self.output_column), bands)?;
        }
        Ok(StepOutcome { table, warnings })
    }
}

pub struct FiscalYearStep {
    pub column: String,
    pub calendar: FiscalCalendar,
    pub with_quarter: bool,
    pub parser: DateParser,
}

impl TableStep for FiscalYearStep {
    fn name(&self) -> &str {
        "fiscal_year"
    }

    fn apply(&self, mut table: Table) -> Result<StepOutcome> {
        let parsed = self.parser.parse_column(&table.column_values(&self.column)?);
        let warnings = failures_to_warnings(&self.column, &parsed.failures);

        let years = parsed
            .dates
            .iter()
            .map(|d| d.map(|d| self.calendar.label_for(d)).unwrap_or_default())
            .collect();
        table.set_column("fiscal_year", years)?;

        if self.with_quarter {
            let quarters = parsed
                .dates
                .iter()
                .map(|d| {
                    d.map(|d| format!("Q{}", self.calendar.fiscal_quarter(d)))
                        .unwrap_or_default()
                })
                .collect();
            table.set_column("fiscal_quarter", quarters)?;
        }

        Ok(StepOutcome { table, warnings })
    }
}

pub struct CleanNamesStep;

impl TableStep for CleanNamesStep {
    fn name(&self) -> &str {
        "clean_names"
    }

    fn apply(&self, mut table: Table) -> Result<StepOutcome> {
        table.clean_column_names();
        Ok(StepOutcome {
            table,
            warnings: Vec::new(),
        })
    }
}
