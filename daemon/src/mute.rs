/// Mute bookkeeping for tracked applications.
///
/// [`MuteManager`] owns the volume backend and remembers which applications
/// it has muted and through which sessions, so they can be restored later.
/// Backend failures for one application are logged and swallowed; they never
/// affect other applications.
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::app_id::ApplicationId;
use crate::volume::{SessionHandle, VolumeBackend};

pub struct MuteManager<B> {
    backend: B,
    /// Applications currently muted by us and the sessions we muted.
    muted: BTreeMap<ApplicationId, Vec<SessionHandle>>,
    /// Applications whose last session lookup failed.  Only the first failure
    /// in a row is logged as a warning.
    failing: BTreeSet<ApplicationId>,
}

impl<B: VolumeBackend> MuteManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            muted: BTreeMap::new(),
            failing: BTreeSet::new(),
        }
    }

    /// Mutes every live audio session of `app`.
    ///
    /// The mute flag is re-asserted on each call, so a session that was
    /// unmuted behind our back is muted again; the recorded state is the same
    /// after one call or many.  An app with no sessions (not playing, not
    /// running, or failing lookup) is left alone.
    pub fn mute(&mut self, app: &ApplicationId) {
        let sessions = match self.backend.list_sessions(app) {
            Ok(sessions) => {
                if self.failing.remove(app) {
                    info!(target: "mute", "Session lookup for {app} recovered");
                }
                sessions
            }
            Err(e) => {
                if self.failing.insert(app.clone()) {
                    warn!(target: "mute", "Session lookup for {app} failed: {e}");
                } else {
                    debug!(target: "mute", "Session lookup for {app} still failing: {e}");
                }
                return;
            }
        };
        if sessions.is_empty() {
            return;
        }

        let mut applied = Vec::with_capacity(sessions.len());
        for session in sessions {
            match self.backend.set_mute(&session, true) {
                Ok(()) => applied.push(session),
                Err(e) => debug!(
                    target: "mute",
                    "Could not mute session {} of {app}: {e}", session.instance_id
                ),
            }
        }
        if applied.is_empty() {
            return;
        }

        if self.muted.insert(app.clone(), applied).is_none() {
            info!(target: "mute", "Muted {app}");
        }
    }

    /// Restores audio for `app` if we muted it.  Returns `false` if `app` was
    /// not muted by us.
    ///
    /// Recorded sessions that have gone stale are re-resolved by name and
    /// every live session of the app is unmuted instead.
    pub fn unmute(&mut self, app: &ApplicationId) -> bool {
        let Some(recorded) = self.muted.remove(app) else {
            return false;
        };

        let mut restored = Vec::with_capacity(recorded.len());
        let mut stale = false;
        for session in recorded {
            match self.backend.set_mute(&session, false) {
                Ok(()) => restored.push(session),
                Err(e) => {
                    debug!(
                        target: "mute",
                        "Recorded session {} of {app} unusable: {e}", session.instance_id
                    );
                    stale = true;
                }
            }
        }

        if stale {
            match self.backend.list_sessions(app) {
                Ok(live) => {
                    for session in live.iter().filter(|s| !restored.contains(s)) {
                        if let Err(e) = self.backend.set_mute(session, false) {
                            warn!(target: "mute", "Could not unmute {app}: {e}");
                        }
                    }
                }
                Err(e) => warn!(target: "mute", "Session lookup for {app} failed: {e}"),
            }
        }

        info!(target: "mute", "Unmuted {app}");
        true
    }

    /// Unmutes everything we muted.  Returns how many apps were restored.
    pub fn unmute_all(&mut self) -> usize {
        let apps: Vec<ApplicationId> = self.muted.keys().cloned().collect();
        apps.iter().filter(|app| self.unmute(app)).count()
    }

    #[cfg(test)]
    pub fn is_muted(&self, app: &ApplicationId) -> bool {
        self.muted.contains_key(app)
    }

    /// Applications currently muted by us, in key order.
    pub fn muted_apps(&self) -> impl Iterator<Item = &ApplicationId> {
        self.muted.keys()
    }
}
