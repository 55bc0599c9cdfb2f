use crate::config::Config;

pub enum DaemonEvent {
    /// Time to reconcile mute state with the current foreground window.
    Tick,
    /// The config file changed on disk and was successfully re-parsed.
    /// Carries the tracked-application list the GUI wants in force.
    ConfigReloaded(Config),
    /// A termination request (Ctrl+C, console close, logoff, SIGTERM) was
    /// received; restore all audio and exit.
    Shutdown,
}
