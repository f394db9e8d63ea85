use thiserror::Error;

#[derive(Error, Debug)]
pub enum KitError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Column '{column}' not found (available: {})", available.join(", "))]
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },

    #[error("Unrecognised date value: '{value}'")]
    DateParseError { value: String },

    #[error("Invalid period token '{value}': {reason}")]
    InvalidPeriod { value: String, reason: String },

    #[error("Invalid commitment identifier '{value}'")]
    InvalidCommitment { value: String },

    #[error("Project folder already exists: {path}")]
    ProjectExists { path: String },

    #[error("Output file already exists: {path}")]
    OutputExists { path: String },

    #[error("No file under '{root}' matches keywords [{}]", keywords.join(", "))]
    FileNotFound { root: String, keywords: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Data,
    Filesystem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl KitError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            KitError::ConfigError { .. }
            | KitError::ConfigValidationError { .. }
            | KitError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            KitError::InvalidPeriod { .. }
            | KitError::InvalidCommitment { .. }
            | KitError::ColumnNotFound { .. } => ErrorCategory::Input,
            KitError::CsvError(_)
            | KitError::SerializationError(_)
            | KitError::ProcessingError { .. }
            | KitError::DateParseError { .. } => ErrorCategory::Data,
            KitError::ZipError(_)
            | KitError::IoError(_)
            | KitError::ProjectExists { .. }
            | KitError::OutputExists { .. }
            | KitError::FileNotFound { .. } => ErrorCategory::Filesystem,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // Re-running with --force / --overwrite resolves these.
            KitError::ProjectExists { .. } | KitError::OutputExists { .. } => {
                ErrorSeverity::Medium
            }
            KitError::FileNotFound { .. } => ErrorSeverity::Medium,
            KitError::IoError(_) | KitError::ZipError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            KitError::ConfigError { .. }
            | KitError::ConfigValidationError { .. }
            | KitError::InvalidConfigValueError { .. } => {
                "Check analyst-kit.toml (or the file passed with --config)".to_string()
            }
            KitError::ColumnNotFound { available, .. } => {
                format!("Use one of the available columns: {}", available.join(", "))
            }
            KitError::DateParseError { .. } => {
                concat!(
                    "Supported shapes: 2025-01-15, 01/15/2025, 15-Jan-2025, ",
                    "January 15 2025, 20250115, Excel serials"
                )
                .to_string()
            }
            KitError::InvalidPeriod { .. } => {
                "Use a folder date such as 2025_Q1, 2025_01 or 2025".to_string()
            }
            KitError::InvalidCommitment { .. } => {
                "Commitments look like 1.3 or 1.3.a".to_string()
            }
            KitError::ProjectExists { .. } => {
                "Pass --force to fill in missing folders without touching existing files"
                    .to_string()
            }
            KitError::OutputExists { .. } => {
                "Pass --overwrite or choose another output path".to_string()
            }
            KitError::FileNotFound { .. } => {
                "Loosen the keywords, use --any, or check the search root".to_string()
            }
            KitError::CsvError(_) => {
                "Make sure the input is a CSV file with a header row".to_string()
            }
            KitError::IoError(_) | KitError::ZipError(_) => {
                "Check that the path exists and you have permission to read/write it".to_string()
            }
            KitError::SerializationError(_) | KitError::ProcessingError { .. } => {
                "Re-run with --verbose for details".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Invalid input: {}", self),
            ErrorCategory::Data => format!("Could not process data: {}", self),
            ErrorCategory::Filesystem => format!("File problem: {}", self),
        }
    }

    pub fn config_validation(field: &str, message: impl Into<String>) -> Self {
        KitError::ConfigValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        KitError::ProcessingError {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KitError>;
