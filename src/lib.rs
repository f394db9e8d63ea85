pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::Cli;

pub use crate::core::dates::{DateParser, DayOrder};
pub use crate::core::engine::RecipeEngine;
pub use crate::core::period::{Cadence, Period};
pub use adapters::storage::LocalStorage;
pub use config::{AnalystConfig, RecipeConfig, RecipeContext, WorkspacePaths};
pub use domain::model::Table;
pub use utils::error::{KitError, Result};
