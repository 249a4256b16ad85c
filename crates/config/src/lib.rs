//! Shared file locations for Leadline binaries
//!
//! Everything Leadline persists outside the database lives in one
//! directory (~/.config/leadline/): the settings file and, unless
//! overridden, the SQLite database itself.
//!
//! Call [`init`] once at startup so later writes can assume the
//! directory exists.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Directory name under the platform config root
const APP_DIR: &str = "leadline";

/// Create the Leadline config directory if needed and return its path.
pub fn init() -> Result<PathBuf> {
    let dir = config_dir().context("Could not determine config directory")?;
    ensure_dir(&dir)?;
    Ok(dir)
}

/// Get the Leadline config directory (~/.config/leadline/)
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_DIR))
}

/// Resolve a file name inside the Leadline config directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|p| p.join(filename))
}

/// Whether `filename` exists inside the Leadline config directory
pub fn config_exists(filename: &str) -> bool {
    config_path(filename).is_some_and(|p| p.is_file())
}

/// Load a JSON document from the Leadline config directory
pub fn load_json<T: DeserializeOwned>(filename: &str) -> Result<T> {
    let path = config_path(filename).context("Could not determine config directory")?;
    load_json_file(&path)
}

/// Load a JSON document from an arbitrary path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Write `value` as pretty JSON into the Leadline config directory
pub fn save_json<T: Serialize>(filename: &str, value: &T) -> Result<PathBuf> {
    let path = init()?.join(filename);
    save_json_file(&path, value)?;
    Ok(path)
}

/// Write `value` as pretty JSON to an arbitrary path, creating parents
pub fn save_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))
}
