//! Field checks shared by `AnalystConfig` and `RecipeConfig`.

use crate::utils::error::{KitError, Result};
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::path::Path;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl Display, reason: impl Into<String>) -> KitError {
    KitError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_path(field: &str, path: &str) -> Result<()> {
    match path {
        "" => Err(invalid(field, path, "Path cannot be empty")),
        p if p.contains('\0') => {
            Err(invalid(field, p.escape_default(), "Path contains null bytes"))
        }
        _ => Ok(()),
    }
}

/// A folder below the project root: relative and never climbing out with `..`.
pub fn validate_relative_folder(field: &str, folder: &str) -> Result<()> {
    validate_path(field, folder)?;
    let climbs = folder.split(&['/', '\\'][..]).any(|part| part == "..");
    if Path::new(folder).is_absolute() || folder.starts_with(&['/', '\\'][..]) || climbs {
        return Err(invalid(field, folder, "Folders must be relative to the project root"));
    }
    Ok(())
}

/// Case-insensitive; `allowed` is lowercase without the dot.
pub fn validate_extension(field: &str, path: &str, allowed: &[&str]) -> Result<()> {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension {
        Some(ext) if allowed.contains(&ext.as_str()) => Ok(()),
        Some(ext) => Err(invalid(
            field,
            path,
            format!("Unsupported file extension .{}; expected {}", ext, allowed.join(", ")),
        )),
        None => Err(invalid(
            field,
            path,
            format!("No file extension; expected {}", allowed.join(", ")),
        )),
    }
}

pub fn validate_non_empty_string(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(invalid(field, value, "Value cannot be empty or whitespace-only"))
    } else {
        Ok(())
    }
}

pub fn validate_range<T: PartialOrd + Display>(
    field: &str,
    value: T,
    bounds: RangeInclusive<T>,
) -> Result<()> {
    if bounds.contains(&value) {
        return Ok(());
    }
    let reason = format!("Value must be between {} and {}", bounds.start(), bounds.end());
    Err(invalid(field, value, reason))
}

pub fn validate_one_of(field: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(invalid(
            field,
            value,
            format!("Unsupported value. Valid values: {}", allowed.join(", ")),
        ))
    }
}
