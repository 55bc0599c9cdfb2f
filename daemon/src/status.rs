use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::error;

use crate::reconciler::TickReport;
use crate::tracked::TrackedSet;

/// Current operational state of the daemon.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "lowercase")]
pub enum DaemonState {
    /// The focus loop is running and tracked apps are being managed.
    Running,
    /// Disabled from the config: every mute is released and nothing is
    /// managed until re-enabled.
    Paused,
    /// The daemon has exited and restored every app it muted.
    Stopped,
}

/// Runtime status written by the daemon to %APPDATA%\BackgroundMute\status.toml.
/// The GUI reads this file (read-only) to display daemon state.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DaemonStatus {
    /// Daemon binary version (set from Cargo.toml at compile time).
    pub version: String,
    /// Current operational state.
    pub state: DaemonState,
    /// RFC 3339 timestamp of daemon startup.
    pub started_at: String,
    /// Executable owning the foreground window at the last tick, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focused_application: Option<String>,
    /// Tracked executables, in tracking order.
    #[serde(default)]
    pub tracked_applications: Vec<String>,
    /// Tracked executables currently muted by the daemon.
    #[serde(default)]
    pub muted_applications: Vec<String>,
    /// Running, untracked applications the GUI can offer for tracking.
    #[serde(default)]
    pub available_applications: Vec<String>,
    /// Human-readable error message if the daemon encountered a non-fatal error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DaemonStatus {
    /// Constructs the initial running status on daemon startup.
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: DaemonState::Running,
            started_at: chrono::Local::now().to_rfc3339(),
            focused_application: None,
            tracked_applications: Vec::new(),
            muted_applications: Vec::new(),
            available_applications: Vec::new(),
            error: None,
        }
    }

    pub fn set_tracked(&mut self, tracked: &TrackedSet) {
        self.tracked_applications = tracked.iter().map(|app| app.to_string()).collect();
    }

    /// Copies the outcome of a tick.  Returns `true` if anything visible
    /// changed, so callers only rewrite the file when needed.
    pub fn apply_tick(&mut self, report: &TickReport) -> bool {
        let focused = report.focused.as_ref().map(|app| app.to_string());
        let muted: Vec<String> = report.muted.iter().map(|app| app.to_string()).collect();
        if focused == self.focused_application && muted == self.muted_applications {
            return false;
        }
        self.focused_application = focused;
        self.muted_applications = muted;
        true
    }

    /// Replaces the list of tracking candidates.  Returns `true` if it
    /// differs from the one already published.
    pub fn set_available(&mut self, apps: Vec<String>) -> bool {
        if apps == self.available_applications {
            return false;
        }
        self.available_applications = apps;
        true
    }
}

/// Serializes `status` to TOML and writes it to `path`.
/// Creates the parent directory if it does not exist.
/// Logs errors rather than panicking — a status write failure should
/// never crash the daemon.
pub fn write_status(path: &Path, status: &DaemonStatus) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            error!(target: "status", "Failed to create directory {}: {e}", parent.display());
            return;
        }
    }
    match toml::to_string_pretty(status) {
        Ok(content) => {
            if let Err(e) = std::fs::write(path, content) {
                error!(target: "status", "Failed to write status file: {e}");
            }
        }
        Err(e) => error!(target: "status", "Failed to serialize status: {e}"),
    }
}
