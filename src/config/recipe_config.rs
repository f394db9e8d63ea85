use crate::adapters::storage::LocalStorage;
use crate::config::analyst_config::{substitute_env_vars, AnalystConfig};
use crate::core::dates::{DateParser, DayOrder};
use crate::core::engine::{OutputFormat, OutputTarget, RecipeEngine};
use crate::core::fiscal::FiscalCalendar;
use crate::core::los::{self, LosBands, LosCounting, LosOptions};
use crate::core::period::Period;
use crate::core::steps::{CleanNamesStep, FiscalYearStep, LengthOfStayStep, ParseDatesStep};
use crate::domain::ports::TableStep;
use crate::utils::error::{KitError, Result};
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

const PERIOD_PLACEHOLDER: &str = "{period}";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeConfig {
    pub recipe: RecipeInfo,
    pub input: InputConfig,
    #[serde(default)]
    pub steps: Vec<StepConfig>,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeInfo {
    pub name: String,
    pub description: Option<String>,
    /// Fixed folder date; defaults to the configured reporting period.
    pub period: Option<Period>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Relative to the recipe's base directory; may contain `{period}`.
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepConfig {
    ParseDates {
        column: String,
        into: Option<String>,
        day_first: Option<bool>,
    },
    LengthOfStay {
        admit: String,
        discharge: String,
        output: Option<String>,
        inclusive: Option<bool>,
        /// `YYYY-MM-DD`, `period_end` or `today`.
        as_of: Option<String>,
        bands: Option<Vec<i64>>,
    },
    FiscalYear {
        column: String,
        quarter: Option<bool>,
        start_month: Option<u32>,
    },
    CleanNames,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Relative to the recipe's base directory; may contain `{period}`.
    pub dir: String,
    pub file_stem: String,
    pub formats: Vec<String>,
    pub sheet_name: Option<String>,
    pub overwrite: Option<bool>,
}

/// Values a recipe is resolved against at run time.
pub struct RecipeContext<'a> {
    pub analyst: &'a AnalystConfig,
    pub period: Period,
    pub today: NaiveDate,
}

impl RecipeConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(KitError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| KitError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn input_path(&self, period: &Period) -> String {
        fill_period(&self.input.path, period)
    }

    pub fn output_targets(&self, period: &Period) -> Result<Vec<OutputTarget>> {
        let dir = fill_period(&self.output.dir, period);
        let stem = fill_period(&self.output.file_stem, period);
        let sheet_name = self
            .output
            .sheet_name
            .clone()
            .unwrap_or_else(|| self.recipe.name.clone());
        let overwrite = self.output.overwrite.unwrap_or(false);

        self.output
            .formats
            .iter()
            .map(|format| {
                let format = parse_format(format)?;
                let file_name = format!("{}.{}", stem, format.extension());
                let path = Path::new(&dir).join(file_name).to_string_lossy().into_owned();
                Ok(OutputTarget {
                    path,
                    format,
                    sheet_name: sheet_name.clone(),
                    overwrite,
                })
            })
            .collect()
    }

    pub fn build_steps(&self, ctx: &RecipeContext<'_>) -> Result<Vec<Box<dyn TableStep>>> {
        let base_parser = ctx.analyst.date_parser();
        let with_order = |day_first: Option<bool>| -> DateParser {
            match day_first {
                Some(true) => DateParser::new(DayOrder::DayFirst)
                    .with_na_values(&ctx.analyst.dates.na_values),
                Some(false) => DateParser::new(DayOrder::MonthFirst)
                    .with_na_values(&ctx.analyst.dates.na_values),
                None => base_parser.clone(),
            }
        };

        let mut steps: Vec<Box<dyn TableStep>> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let built: Box<dyn TableStep> = match step {
                StepConfig::ParseDates {
                    column,
                    into,
                    day_first,
                } => Box::new(ParseDatesStep {
                    column: column.clone(),
                    into: into.clone(),
                    parser: with_order(*day_first),
                }),
                StepConfig::LengthOfStay {
                    admit,
                    discharge,
                    output,
                    inclusive,
                    as_of,
                    bands,
                } => Box::new(LengthOfStayStep {
                    admit_column: admit.clone(),
                    discharge_column: discharge.clone(),
                    output_column: output.clone().unwrap_or_else(|| "los_days".to_string()),
                    options: LosOptions {
                        counting: if inclusive.unwrap_or(false) {
                            LosCounting::Inclusive
                        } else {
                            LosCounting::Nights
                        },
                        as_of: as_of
                            .as_deref()
                            .map(|raw| resolve_as_of(raw, ctx))
                            .transpose()?,
                    },
                    bands: bands.clone().map(LosBands::new),
                    parser: base_parser.clone(),
                }),
                StepConfig::FiscalYear {
                    column,
                    quarter,
                    start_month,
                } => {
                    let calendar = match start_month {
                        Some(month) => FiscalCalendar::new(*month, ctx.analyst.fiscal.label)?,
                        None => ctx.analyst.fiscal_calendar()?,
                    };
                    Box::new(FiscalYearStep {
                        column: column.clone(),
                        calendar,
                        with_quarter: quarter.unwrap_or(true),
                        parser: base_parser.clone(),
                    })
                }
                StepConfig::CleanNames => Box::new(CleanNamesStep),
            };
            steps.push(built);
        }
        Ok(steps)
    }

    pub fn build_engine(
        &self,
        base_dir: &Path,
        ctx: &RecipeContext<'_>,
    ) -> Result<RecipeEngine<LocalStorage>> {
        let mut engine =
            RecipeEngine::new(LocalStorage::new(base_dir), self.input_path(&ctx.period));
        for step in self.build_steps(ctx)? {
            engine = engine.with_step(step);
        }
        for target in self.output_targets(&ctx.period)? {
            engine = engine.with_output(target);
        }
        Ok(engine)
    }
}

fn fill_period(template: &str, period: &Period) -> String {
    template.replace(PERIOD_PLACEHOLDER, &period.to_string())
}

fn parse_format(raw: &str) -> Result<OutputFormat> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "csv" => Ok(OutputFormat::Csv),
        "xlsx" => Ok(OutputFormat::Xlsx),
        other => Err(KitError::InvalidConfigValueError {
            field: "output.formats".to_string(),
            value: other.to_string(),
            reason: "Unsupported format. Valid formats: csv, xlsx".to_string(),
        }),
    }
}

fn resolve_as_of(raw: &str, ctx: &RecipeContext<'_>) -> Result<NaiveDate> {
    los::resolve_as_of(raw, &ctx.period, ctx.today, &ctx.analyst.date_parser())
}

impl Validate for RecipeConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("recipe.name", &self.recipe.name)?;
        validation::validate_path("input.path", &self.input.path)?;
        validation::validate_extension("input.path", &self.input.path, &["csv"])?;
        validation::validate_path("output.dir", &self.output.dir)?;
        validation::validate_non_empty_string("output.file_stem", &self.output.file_stem)?;

        if self.output.formats.is_empty() {
            return Err(KitError::config_validation(
                "output.formats",
                "At least one output format is required",
            ));
        }
        for format in &self.output.formats {
            validation::validate_one_of(
                "output.formats",
                &format.trim().to_ascii_lowercase(),
                &["csv", "xlsx"],
            )?;
        }

        for step in &self.steps {
            match step {
                StepConfig::ParseDates { column, .. } => {
                    validation::validate_non_empty_string("steps.column", column)?
                }
                StepConfig::LengthOfStay {
                    admit, discharge, ..
                } => {
                    validation::validate_non_empty_string("steps.admit", admit)?;
                    validation::validate_non_empty_string("steps.discharge", discharge)?;
                }
                StepConfig::FiscalYear {
                    column, start_month, ..
                } => {
                    validation::validate_non_empty_string("steps.column", column)?;
                    if let Some(month) = start_month {
                        validation::validate_range("steps.start_month", *month, 1..=12)?;
                    }
                }
                StepConfig::CleanNames => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPE: &str = r#"
[recipe]
name = "quarterly-los"
description = "Length of stay for the quarter"

[input]
path = "data/raw/{period}/bookings.csv"

[[steps]]
type = "clean_names"

[[steps]]
type = "length_of_stay"
admit = "booking_date"
discharge = "release_date"
as_of = "period_end"
bands = [7, 30]

[[steps]]
type = "fiscal_year"
column = "booking_date"

[output]
dir = "output/{period}"
file_stem = "los_{period}"
formats = ["csv", "xlsx"]
sheet_name = "LOS"
"#;

    #[test]
    fn test_parse_recipe() {
        let recipe = RecipeConfig::from_toml_str(RECIPE).unwrap();
        assert!(recipe.validate().is_ok());
        assert_eq!(recipe.steps.len(), 3);
        assert!(matches!(recipe.steps[0], StepConfig::CleanNames));

        let period: Period = "2025_Q1".parse().unwrap();
        assert_eq!(recipe.input_path(&period), "data/raw/2025_Q1/bookings.csv");

        let targets = recipe.output_targets(&period).unwrap();
        assert_eq!(targets.len(), 2);
        assert!(targets[0].path.ends_with("los_2025_Q1.csv"));
        assert_eq!(targets[1].format, OutputFormat::Xlsx);
        assert_eq!(targets[1].sheet_name, "LOS");
        assert!(!targets[1].overwrite);
    }

    #[test]
    fn test_build_steps_resolves_as_of() {
        let recipe = RecipeConfig::from_toml_str(RECIPE).unwrap();
        let analyst = AnalystConfig::default();
        let ctx = RecipeContext {
            analyst: &analyst,
            period: "2025_Q1".parse().unwrap(),
            today: NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(),
        };
        let steps = recipe.build_steps(&ctx).unwrap();
        let names: Vec<&str> = steps.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["clean_names", "length_of_stay", "fiscal_year"]);

        let period = ctx.period;
        assert_eq!(
            resolve_as_of("period_end", &ctx).unwrap(),
            period.end_date()
        );
        assert_eq!(resolve_as_of("today", &ctx).unwrap(), ctx.today);
        assert_eq!(
            resolve_as_of("Feb 14, 2025", &ctx).unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 14).unwrap()
        );
        assert!(resolve_as_of("March 3rd", &ctx).is_err());
    }

    #[test]
    fn test_validation_rejects_bad_recipes() {
        let bad_format = RECIPE.replace(r#"formats = ["csv", "xlsx"]"#, r#"formats = ["json"]"#);
        let recipe = RecipeConfig::from_toml_str(&bad_format).unwrap();
        assert!(recipe.validate().is_err());

        let bad_input = RECIPE.replace("bookings.csv", "bookings.xlsx");
        let recipe = RecipeConfig::from_toml_str(&bad_input).unwrap();
        assert!(recipe.validate().is_err());

        let unknown_step = RECIPE.replace(r#"type = "clean_names""#, r#"type = "pivot""#);
        assert!(RecipeConfig::from_toml_str(&unknown_step).is_err());
    }
}
