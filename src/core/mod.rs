pub mod dates;
pub mod discovery;
pub mod engine;
pub mod export;
pub mod fiscal;
pub mod los;
pub mod period;
pub mod project;
pub mod steps;

pub use crate::domain::model::{RowWarning, StepOutcome, Table};
pub use crate::domain::ports::{Storage, TableStep};
pub use crate::utils::error::Result;
