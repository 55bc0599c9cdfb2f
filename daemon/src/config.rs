use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{error, warn};

use crate::app_id::ApplicationId;
use crate::event::DaemonEvent;

pub const MIN_POLL_INTERVAL_MS: u64 = 100;
pub const MAX_POLL_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 400;
/// How often the list of running applications in the status file is rebuilt.
pub const APP_LIST_REFRESH_MS: u64 = 5_000;

/// Root configuration structure. Deserialized from %APPDATA%\BackgroundMute\config.toml.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    /// Applications to mute while they are not focused, in GUI order.
    #[serde(default)]
    pub applications: Vec<ApplicationConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GlobalConfig {
    /// How often the foreground window is checked, in milliseconds.
    /// Clamped to [100, 5000].
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// List every running process as a tracking candidate, not only those
    /// with a visible window.
    #[serde(default)]
    pub show_all_applications: bool,
    /// When false the daemon releases every mute and stops managing audio
    /// until re-enabled.  The GUI sets this before terminating the daemon.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            show_all_applications: false,
            enabled: true,
        }
    }
}

impl GlobalConfig {
    fn clamped_poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
            .clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS)
    }

    /// Returns the tick period after clamping to the supported range.
    pub fn effective_poll_interval(&self) -> Duration {
        Duration::from_millis(self.clamped_poll_interval_ms())
    }

    /// Number of ticks between rebuilds of the running-application list.
    /// Never zero.
    pub fn app_list_refresh_ticks(&self) -> u64 {
        (APP_LIST_REFRESH_MS / self.clamped_poll_interval_ms()).max(1)
    }
}

/// A tracked application entry.  Extra keys the GUI keeps here (such as a
/// display label) are ignored.
#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationConfig {
    /// Executable filename (e.g. "Spotify.exe") used to find audio sessions.
    pub executable_name: String,
}

impl Config {
    /// Tracking keys for every configured application, in file order.
    /// Entries with a blank executable name are skipped.
    pub fn tracked_ids(&self) -> Vec<ApplicationId> {
        self.applications
            .iter()
            .filter_map(|app| {
                let id = ApplicationId::new(&app.executable_name);
                if id.is_none() {
                    warn!(target: "config", "Ignoring application entry with empty executable_name");
                }
                id
            })
            .collect()
    }
}

/// Loads the config file at `path`, returning `Config::default()` if the file does not exist.
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Spawns a file watcher on the parent directory of `path`.  Whenever the config
/// file is created or modified, reloads it and sends a `ConfigReloaded` event.
pub async fn watch_config(path: PathBuf, tx: mpsc::Sender<DaemonEvent>) {
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Event>(16);

    let mut watcher = match RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = watch_tx.blocking_send(event);
            }
        },
        NotifyConfig::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            error!(target: "config", "Failed to create file watcher: {e}");
            return;
        }
    };

    // Watch the parent directory rather than the file directly so we catch
    // editor-style atomic saves (write-new + rename).
    let watch_dir = match path.parent() {
        Some(d) => d.to_path_buf(),
        None => {
            error!(target: "config", "Config path has no parent directory");
            return;
        }
    };

    if let Err(e) = watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
        error!(target: "config", "Failed to watch config directory: {e}");
        return;
    }

    while let Some(event) = watch_rx.recv().await {
        let affects_config = event.paths.iter().any(|p| p == path.as_path());
        let is_write = matches!(
            event.kind,
            notify::EventKind::Create(_) | notify::EventKind::Modify(_)
        );

        if affects_config && is_write {
            match load_or_default(&path) {
                Ok(config) => {
                    if tx.send(DaemonEvent::ConfigReloaded(config)).await.is_err() {
                        break;
                    }
                }
                // Keep the config in force; the GUI may be mid-write.
                Err(e) => warn!(target: "config", "Failed to reload config: {e:#}"),
            }
        }
    }
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_enabled() -> bool {
    true
}
