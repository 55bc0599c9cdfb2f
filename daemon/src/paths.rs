/// Canonical file paths for BackgroundMute data files.
///
/// Both files live under the per-user config directory
/// (%APPDATA%\BackgroundMute\ on Windows):
///   - config.toml  Written by the GUI, read by the daemon.
///   - status.toml  Written by the daemon, read by the GUI.
use std::path::PathBuf;

use anyhow::{Context, Result};

const APP_DIR_NAME: &str = "BackgroundMute";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const STATUS_FILE_NAME: &str = "status.toml";

/// Returns the BackgroundMute application data directory.
pub fn app_data_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("No per-user config directory on this system")?;
    Ok(base.join(APP_DIR_NAME))
}

/// Returns the full path to the config file inside `app_dir`.
pub fn config_file_path(app_dir: &std::path::Path) -> PathBuf {
    app_dir.join(CONFIG_FILE_NAME)
}

/// Returns the full path to the status file inside `app_dir`.
pub fn status_file_path(app_dir: &std::path::Path) -> PathBuf {
    app_dir.join(STATUS_FILE_NAME)
}
