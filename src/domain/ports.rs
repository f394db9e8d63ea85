use crate::domain::model::{StepOutcome, Table};
use crate::utils::error::Result;
use std::path::PathBuf;

pub trait Storage {
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;
    fn write_file(&self, path: &str, data: &[u8]) -> Result<PathBuf>;
    fn exists(&self, path: &str) -> bool;
}

/// One transformation applied to a table in a recipe or CLI command.
pub trait TableStep {
    fn name(&self) -> &str;
    fn apply(&self, table: Table) -> Result<StepOutcome>;
}
