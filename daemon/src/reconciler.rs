/// The focus-driven mute loop.
///
/// Each tick re-derives the desired state of every tracked application from
/// the current foreground window alone: the focused app is unmuted, every
/// other tracked app is muted.  Nothing about previous ticks is consulted, so
/// the loop heals external changes (a user unmuting in the OS mixer) and
/// tolerates missed ticks.
use tracing::{debug, info};

use crate::app_id::ApplicationId;
use crate::focus::FocusObserver;
use crate::mute::MuteManager;
use crate::tracked::TrackedSet;
use crate::volume::VolumeBackend;

/// Outcome of a single tick, used for status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Foreground application this tick, if it could be determined.
    pub focused: Option<ApplicationId>,
    /// Tracked applications muted after the tick.
    pub muted: Vec<ApplicationId>,
}

pub struct Reconciler<B, F> {
    tracked: TrackedSet,
    mutes: MuteManager<B>,
    observer: F,
    /// Only used to log focus changes; never drives decisions.
    last_focus: Option<ApplicationId>,
}

impl<B: VolumeBackend, F: FocusObserver> Reconciler<B, F> {
    pub fn new(backend: B, observer: F) -> Self {
        Self {
            tracked: TrackedSet::new(),
            mutes: MuteManager::new(backend),
            observer,
            last_focus: None,
        }
    }

    /// Starts managing `app`.  It is muted from the next tick on unless it
    /// has focus.  Returns `false` if it was already tracked.
    pub fn track(&mut self, app: ApplicationId) -> bool {
        let label = app.to_string();
        let added = self.tracked.track(app);
        if added {
            info!(target: "reconciler", "Tracking {label}");
        }
        added
    }

    /// Stops managing `app` and unmutes it regardless of focus.  Returns
    /// `false` if it was not tracked.
    pub fn untrack(&mut self, app: &ApplicationId) -> bool {
        let removed = self.tracked.untrack(app);
        self.mutes.unmute(app);
        if removed {
            info!(target: "reconciler", "Stopped tracking {app}");
        }
        removed
    }

    /// Replaces the tracked set with `apps`, untracking (and unmuting)
    /// anything no longer listed.  The new order follows `apps`; duplicates
    /// keep their first position.
    pub fn sync_tracked(&mut self, apps: &[ApplicationId]) {
        let dropped: Vec<ApplicationId> = self
            .tracked
            .iter()
            .filter(|app| !apps.contains(app))
            .cloned()
            .collect();
        for app in &dropped {
            self.untrack(app);
        }

        for app in apps {
            self.track(app.clone());
        }

        let mut ordered = TrackedSet::new();
        for app in apps {
            ordered.track(app.clone());
        }
        self.tracked = ordered;
    }

    /// Runs one reconciliation pass.
    pub fn tick(&mut self) -> TickReport {
        let focused = self.observer.foreground_application();
        if focused != self.last_focus {
            debug!(
                target: "reconciler",
                "Foreground: {}",
                focused.as_ref().map_or("<none>", |app| app.as_str())
            );
            self.last_focus = focused.clone();
        }

        for app in self.tracked.iter() {
            if focused.as_ref() == Some(app) {
                self.mutes.unmute(app);
            } else {
                self.mutes.mute(app);
            }
        }

        TickReport {
            focused,
            muted: self.muted_apps(),
        }
    }

    /// Unmutes every application we muted.  Must run before the process
    /// exits so no foreign app is left silenced.
    pub fn release_all(&mut self) -> usize {
        let restored = self.mutes.unmute_all();
        if restored > 0 {
            info!(target: "reconciler", "Restored audio for {restored} application(s)");
        }
        restored
    }

    pub fn tracked(&self) -> &TrackedSet {
        &self.tracked
    }

    /// Tracked applications currently muted by us.
    pub fn muted_apps(&self) -> Vec<ApplicationId> {
        self.mutes.muted_apps().cloned().collect()
    }
}
