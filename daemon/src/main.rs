mod app_id;
mod config;
mod error;
mod event;
mod focus;
mod mute;
mod paths;
mod processes;
mod reconciler;
mod status;
mod ticker;
mod tracked;
mod volume;

#[cfg(test)]
mod test_support;

use std::future::Future;

use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::focus::SystemFocusObserver;
use crate::processes::ProcessTable;
use crate::reconciler::Reconciler;
use crate::ticker::Ticker;
use crate::volume::SystemVolumeBackend;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[tokio::main]
async fn main() {
    init_logging();

    // ── App data directory ────────────────────────────────────────────────────
    let app_dir = match paths::app_data_dir() {
        Ok(dir) => dir,
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    };
    if let Err(e) = std::fs::create_dir_all(&app_dir) {
        error!("Failed to create app data directory {}: {e}", app_dir.display());
        std::process::exit(1);
    }

    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = paths::config_file_path(&app_dir);
    let mut config_error = None;
    let initial_config = config::load_or_default(&config_path).unwrap_or_else(|e| {
        warn!(target: "config", "{e:#} (using defaults)");
        config_error = Some(format!("Config error: {e:#}"));
        config::Config::default()
    });
    let mut show_all_applications = initial_config.global.show_all_applications;
    let mut poll_interval = initial_config.global.effective_poll_interval();
    let mut refresh_every = initial_config.global.app_list_refresh_ticks();
    let mut enabled = initial_config.global.enabled;

    // ── Reconciler ────────────────────────────────────────────────────────────
    let mut reconciler = Reconciler::new(SystemVolumeBackend::new(), SystemFocusObserver::new());
    reconciler.sync_tracked(&initial_config.tracked_ids());
    let mut processes = ProcessTable::new();
    if reconciler.tracked().is_empty() {
        info!(target: "config", "No applications tracked yet; add them to {}", config_path.display());
    }

    // ── Initial status ────────────────────────────────────────────────────────
    let status_path = paths::status_file_path(&app_dir);
    let mut current_status = status::DaemonStatus::new();
    if !enabled {
        current_status.state = status::DaemonState::Paused;
    }
    current_status.error = config_error;
    current_status.set_tracked(reconciler.tracked());
    current_status.set_available(
        processes.running_applications(reconciler.tracked(), show_all_applications),
    );
    status::write_status(&status_path, &current_status);

    let (event_tx, mut event_rx) = mpsc::channel::<event::DaemonEvent>(32);

    // ── Background tasks ──────────────────────────────────────────────────────
    tokio::spawn(config::watch_config(config_path, event_tx.clone()));
    let mut ticker = Ticker::start(poll_interval, event_tx.clone());
    let mut ticks_since_refresh: u64 = 0;

    // Graceful shutdown on every termination request we can observe.
    {
        let tx = event_tx.clone();
        match shutdown_signal() {
            Ok(signalled) => {
                tokio::spawn(async move {
                    let source = signalled.await;
                    info!("Received {source}");
                    let _ = tx.send(event::DaemonEvent::Shutdown).await;
                });
            }
            Err(e) => error!("Failed to install shutdown handlers: {e}"),
        }
    }

    info!(
        "background-mute-daemon v{} started, tracking {} application(s), polling every {} ms{}",
        env!("CARGO_PKG_VERSION"),
        reconciler.tracked().len(),
        poll_interval.as_millis(),
        if enabled { "" } else { " (paused)" }
    );

    // ── Event loop ────────────────────────────────────────────────────────────
    while let Some(evt) = event_rx.recv().await {
        match evt {
            event::DaemonEvent::Tick => {
                let mut changed = false;
                if enabled {
                    let report = reconciler.tick();
                    changed |= current_status.apply_tick(&report);
                }

                ticks_since_refresh += 1;
                if ticks_since_refresh >= refresh_every {
                    ticks_since_refresh = 0;
                    changed |= current_status.set_available(
                        processes.running_applications(reconciler.tracked(), show_all_applications),
                    );
                }

                if changed {
                    status::write_status(&status_path, &current_status);
                }
            }

            event::DaemonEvent::ConfigReloaded(new_config) => {
                info!(target: "config", "Config reloaded");
                reconciler.sync_tracked(&new_config.tracked_ids());

                let new_interval = new_config.global.effective_poll_interval();
                if new_interval != poll_interval {
                    ticker.stop().await;
                    ticker = Ticker::start(new_interval, event_tx.clone());
                    poll_interval = new_interval;
                    info!("Polling every {} ms", poll_interval.as_millis());
                }
                refresh_every = new_config.global.app_list_refresh_ticks();
                show_all_applications = new_config.global.show_all_applications;
                current_status.error = None;

                if new_config.global.enabled != enabled {
                    enabled = new_config.global.enabled;
                    if enabled {
                        current_status.state = status::DaemonState::Running;
                        info!("Resumed");
                    } else {
                        // Ticks are skipped from here on, so the release is final.
                        reconciler.release_all();
                        current_status.state = status::DaemonState::Paused;
                        current_status.focused_application = None;
                        info!("Paused, all audio restored");
                    }
                }

                current_status.set_tracked(reconciler.tracked());
                current_status.muted_applications =
                    reconciler.muted_apps().iter().map(|app| app.to_string()).collect();
                current_status.set_available(
                    processes.running_applications(reconciler.tracked(), show_all_applications),
                );
                ticks_since_refresh = 0;
                status::write_status(&status_path, &current_status);
            }

            event::DaemonEvent::Shutdown => {
                info!("Shutting down");
                break;
            }
        }
    }

    // No tick may run after this point, so the release below is final.
    ticker.stop().await;
    reconciler.release_all();

    current_status.state = status::DaemonState::Stopped;
    current_status.focused_application = None;
    current_status.muted_applications.clear();
    current_status.error = None;
    status::write_status(&status_path, &current_status);
}

/// Installs handlers for every termination request the platform delivers
/// and returns a future that resolves with the name of the first one
/// received.
#[cfg(windows)]
fn shutdown_signal() -> std::io::Result<impl Future<Output = &'static str>> {
    use tokio::signal::windows;

    let mut ctrl_c = windows::ctrl_c()?;
    let mut ctrl_break = windows::ctrl_break()?;
    let mut ctrl_close = windows::ctrl_close()?;
    let mut ctrl_logoff = windows::ctrl_logoff()?;
    let mut ctrl_shutdown = windows::ctrl_shutdown()?;

    Ok(async move {
        tokio::select! {
            _ = ctrl_c.recv() => "Ctrl+C",
            _ = ctrl_break.recv() => "Ctrl+Break",
            _ = ctrl_close.recv() => "console close",
            _ = ctrl_logoff.recv() => "logoff",
            _ = ctrl_shutdown.recv() => "system shutdown",
        }
    })
}

#[cfg(unix)]
fn shutdown_signal() -> std::io::Result<impl Future<Output = &'static str>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => "Ctrl+C",
            _ = terminate.recv() => "SIGTERM",
            _ = hangup.recv() => "SIGHUP",
        }
    })
}

#[cfg(not(any(windows, unix)))]
fn shutdown_signal() -> std::io::Result<impl Future<Output = &'static str>> {
    Ok(async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        "Ctrl+C"
    })
}
