use crate::core::dates::{DateParser, DayOrder};
use crate::core::fiscal::{FiscalCalendar, FyLabel};
use crate::core::period::{Cadence, Period};
use crate::core::project::ScaffoldConfig;
use crate::utils::error::{KitError, Result};
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "analyst-kit.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalystConfig {
    pub paths: PathsConfig,
    pub periods: PeriodsConfig,
    pub fiscal: FiscalConfig,
    pub dates: DatesConfig,
    pub scaffold: ScaffoldSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub projects_root: String,
    pub data_root: String,
    pub output_root: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            projects_root: ".".to_string(),
            data_root: "data".to_string(),
            output_root: "output".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodsConfig {
    pub cadence: Cadence,
    /// Periods to step back from the one containing today.
    pub lag: u32,
}

impl Default for PeriodsConfig {
    fn default() -> Self {
        Self {
            cadence: Cadence::Quarterly,
            lag: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FiscalConfig {
    pub start_month: u32,
    pub label: FyLabel,
}

impl Default for FiscalConfig {
    fn default() -> Self {
        Self {
            start_month: 7,
            label: FyLabel::EndYear,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatesConfig {
    pub day_order: DayOrder,
    /// Extra tokens treated as missing, on top of NA, NULL, N/A and friends.
    pub na_values: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaffoldSection {
    pub folders: Option<Vec<String>>,
    pub period_folders: Option<Vec<String>>,
    pub script_extension: Option<String>,
    pub author: Option<String>,
}

/// The analyst's session paths, resolved per reporting period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePaths {
    pub projects_root: PathBuf,
    pub data_root: PathBuf,
    pub output_root: PathBuf,
}

impl WorkspacePaths {
    pub fn data_dir(&self, period: &Period) -> PathBuf {
        self.data_root.join(period.to_string())
    }

    pub fn output_dir(&self, period: &Period) -> PathBuf {
        self.output_root.join(period.to_string())
    }
}

impl AnalystConfig {
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

    /// An explicit path must exist; otherwise `analyst-kit.toml` in the
    /// working directory is used when present, else built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::from_file(path)
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                tracing::debug!("Loading configuration from ./{}", DEFAULT_CONFIG_FILE);
                Self::from_file(DEFAULT_CONFIG_FILE)
            }
            None => {
                tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                Ok(Self::default())
            }
        }
    }

    pub fn workspace(&self) -> WorkspacePaths {
        WorkspacePaths {
            projects_root: PathBuf::from(&self.paths.projects_root),
            data_root: PathBuf::from(&self.paths.data_root),
            output_root: PathBuf::from(&self.paths.output_root),
        }
    }

    pub fn reporting_period(&self, today: NaiveDate) -> Result<Period> {
        Period::reporting(today, self.periods.cadence, self.periods.lag)
    }

    pub fn date_parser(&self) -> DateParser {
        DateParser::new(self.dates.day_order).with_na_values(&self.dates.na_values)
    }

    pub fn fiscal_calendar(&self) -> Result<FiscalCalendar> {
        FiscalCalendar::new(self.fiscal.start_month, self.fiscal.label)
    }

    pub fn scaffold_config(&self) -> ScaffoldConfig {
        let defaults = ScaffoldConfig::default();
        ScaffoldConfig {
            folders: self.scaffold.folders.clone().unwrap_or(defaults.folders),
            period_folders: self
                .scaffold
                .period_folders
                .clone()
                .unwrap_or(defaults.period_folders),
            script_extension: self
                .scaffold
                .script_extension
                .clone()
                .unwrap_or(defaults.script_extension),
            author: self.scaffold.author.clone(),
        }
    }
}

/// Replaces `${VAR}` with the environment value; unknown variables are left as-is.
pub(crate) fn substitute_env_vars(content: &str) -> String {
    let re = match Regex::new(r"\$\{([^}]+)\}") {
        Ok(re) => re,
        Err(_) => return content.to_string(),
    };

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    })
    .to_string()
}

impl Validate for AnalystConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("paths.projects_root", &self.paths.projects_root)?;
        validation::validate_path("paths.data_root", &self.paths.data_root)?;
        validation::validate_path("paths.output_root", &self.paths.output_root)?;
        validation::validate_range("periods.lag", self.periods.lag, 0..=24)?;
        validation::validate_range("fiscal.start_month", self.fiscal.start_month, 1..=12)?;

        let scaffold = self.scaffold_config();
        validation::validate_non_empty_string(
            "scaffold.script_extension",
            &scaffold.script_extension,
        )?;
        for folder in scaffold.folders.iter().chain(&scaffold.period_folders) {
            validation::validate_relative_folder("scaffold.folders", folder)?;
        }
        Ok(())
    }
}
