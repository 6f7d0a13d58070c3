//! Path utilities for plaza data.
//!
//! - [`get_plaza_dir`] - `~/.plaza/` (base directory, `PLAZA_HOME` overrides)
//! - [`get_config_path`] - `~/.plaza/plaza.toml`
//! - [`get_store_path`] - `~/.plaza/plaza.redb` (document store)
//! - [`get_blobs_dir`] - `~/.plaza/blobs/` (story media)

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::constants::CONFIG_FILE_NAME;

/// Get the plaza base directory.
///
/// Resolution order:
/// 1. `PLAZA_HOME` environment variable (if set)
/// 2. `~/.plaza/` (default)
pub fn get_plaza_dir() -> Result<PathBuf> {
    if let Ok(plaza_home) = std::env::var("PLAZA_HOME")
        && !plaza_home.is_empty()
    {
        return Ok(PathBuf::from(plaza_home));
    }

    let home = dirs::home_dir().context("Failed to get home directory")?;
    Ok(home.join(".plaza"))
}

/// Get the config file path: `~/.plaza/plaza.toml`
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_plaza_dir()?.join(CONFIG_FILE_NAME))
}

/// Get the document store path: `~/.plaza/plaza.redb`
pub fn get_store_path() -> Result<PathBuf> {
    Ok(get_plaza_dir()?.join("plaza.redb"))
}

/// Get the blob directory: `~/.plaza/blobs/`
pub fn get_blobs_dir() -> Result<PathBuf> {
    Ok(get_plaza_dir()?.join("blobs"))
}
