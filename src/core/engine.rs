use crate::core::export::Workbook;
use crate::domain::model::{RowWarning, Table};
use crate::domain::ports::{Storage, TableStep};
use crate::utils::error::{KitError, Result};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Xlsx,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Xlsx => "xlsx",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputTarget {
    /// Relative to the storage base path.
    pub path: String,
    pub format: OutputFormat,
    pub sheet_name: String,
    pub overwrite: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub rows: usize,
    pub columns: usize,
    pub warnings: Vec<RowWarning>,
    pub outputs: Vec<PathBuf>,
}

/// Extract a CSV, run each step in order, load every configured output.
pub struct RecipeEngine<S: Storage> {
    storage: S,
    input: String,
    steps: Vec<Box<dyn TableStep>>,
    outputs: Vec<OutputTarget>,
}

impl<S: Storage> RecipeEngine<S> {
    pub fn new(storage: S, input: impl Into<String>) -> Self {
        Self {
            storage,
            input: input.into(),
            steps: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: Box<dyn TableStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_output(mut self, output: OutputTarget) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn extract(&self) -> Result<Table> {
        let bytes = self.storage.read_file(&self.input)?;
        Table::from_reader(bytes.as_slice())
    }

    pub fn transform(&self, table: Table) -> Result<(Table, Vec<RowWarning>)> {
        let mut table = table;
        let mut warnings = Vec::new();
        for step in &self.steps {
            tracing::debug!("Running step '{}'", step.name());
            let outcome = step.apply(table)?;
            for warning in &outcome.warnings {
                tracing::warn!(
                    "⚠️ {} row {} [{}] '{}': {}",
                    step.name(),
                    warning.row,
                    warning.column,
                    warning.value,
                    warning.message
                );
            }
            warnings.extend(outcome.warnings);
            table = outcome.table;
        }
        Ok((table, warnings))
    }

    pub fn load(&self, table: &Table) -> Result<Vec<PathBuf>> {
        // Check every target before writing any so a refusal leaves nothing half-written.
        for output in &self.outputs {
            if !output.overwrite && self.storage.exists(&output.path) {
                return Err(KitError::OutputExists {
                    path: output.path.clone(),
                });
            }
        }

        let mut written = Vec::with_capacity(self.outputs.len());
        for output in &self.outputs {
            let bytes = match output.format {
                OutputFormat::Csv => table.to_csv_string()?.into_bytes(),
                OutputFormat::Xlsx => {
                    let mut workbook = Workbook::new();
                    workbook.add_sheet(&output.sheet_name, table.clone());
                    workbook.to_xlsx_bytes()?
                }
            };
            written.push(self.storage.write_file(&output.path, &bytes)?);
        }
        Ok(written)
    }

    pub fn run(&self) -> Result<RunReport> {
        tracing::info!("📥 Reading {}", self.input);
        let table = self.extract()?;
        tracing::info!("Read {} rows x {} columns", table.len(), table.headers.len());

        tracing::info!(
            "🔧 Applying {} step(s): {}",
            self.steps.len(),
            self.step_names().join(", ")
        );
        let (table, warnings) = self.transform(table)?;

        let outputs = self.load(&table)?;
        for path in &outputs {
            tracing::info!("📁 Wrote {}", path.display());
        }

        Ok(RunReport {
            rows: table.len(),
            columns: table.headers.len(),
            warnings,
            outputs,
        })
    }
}
