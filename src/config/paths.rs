//! Where the configuration file lives.

use crate::constants::{APP_NAME, CONFIG_ENV, CONFIG_FILE_NAME};
use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::ffi::OsString;
use std::path::PathBuf;

/// Path of the configuration file.
///
/// `MIXID_CONFIG` names the file directly. Without it the file is
/// `config.toml` in the platform config directory (`~/.config/mixid/` on
/// Linux, `~/Library/Application Support/mixid/` on macOS,
/// `%APPDATA%\mixid\` on Windows).
pub fn config_file_path() -> Result<PathBuf> {
    resolve_config_path(std::env::var_os(CONFIG_ENV))
}

fn resolve_config_path(explicit: Option<OsString>) -> Result<PathBuf> {
    if let Some(path) = explicit.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
        .ok_or(Error::ConfigDirNotFound)
}
