// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{RawSettings, Settings};
use crate::errors::Result;

/// Load a settings file from a given path and return the raw `RawSettings`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawSettings> {
    let contents = fs::read_to_string(path.as_ref())?;
    let raw: RawSettings = toml::from_str(&contents)?;
    Ok(raw)
}

/// Load a settings file from path and run validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults for any omitted section or key.
/// - Checks thresholds and duration strings.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Settings> {
    let raw = load_from_path(&path)?;
    Settings::try_from(raw)
}
