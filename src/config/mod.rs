pub mod analyst_config;
#[cfg(feature = "cli")]
pub mod cli;
pub mod recipe_config;

pub use analyst_config::{AnalystConfig, WorkspacePaths};
pub use recipe_config::{RecipeConfig, RecipeContext};
