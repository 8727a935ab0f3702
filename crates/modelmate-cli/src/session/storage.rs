//! Token file location.

use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;

const TOKEN_FILE: &str = "tokens.json";

/// Resolve the token file: the explicit override if given, otherwise
/// `tokens.json` in the user data directory.
pub fn token_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }

    let dirs =
        ProjectDirs::from("", "", "modelmate").context("Could not determine data directory")?;

    Ok(dirs.data_dir().join(TOKEN_FILE))
}
