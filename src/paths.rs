//! Common paths for wpreader data storage
//!
//! Everything lives under ~/.config/wpreader/ on all platforms:
//! - config.toml - User configuration
//! - wpreader.sqlite - Bookmarks and session

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Get the wpreader data directory (~/.config/wpreader/)
pub fn data_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let dir = home.join(".config").join("wpreader");
    fs::create_dir_all(&dir).context("Failed to create wpreader directory")?;
    Ok(dir)
}

/// Get the config file path (~/.config/wpreader/config.toml)
pub fn config_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("config.toml"))
}

/// Get the database file path (~/.config/wpreader/wpreader.sqlite)
pub fn database_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("wpreader.sqlite"))
}
