//! In-memory stand-ins for the OS mixer and the foreground window, shared by
//! the mute manager and reconciler tests.

#![cfg(test)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::app_id::ApplicationId;
use crate::error::BackendError;
use crate::focus::FocusObserver;
use crate::volume::{SessionHandle, VolumeBackend};

#[derive(Debug, Default)]
struct Mixer {
    /// Live sessions keyed by handle, with their owning process name and
    /// current mute flag.
    sessions: HashMap<SessionHandle, (String, bool)>,
    next_pid: u32,
    /// Process names whose lookups fail with the given error.
    failing: HashMap<String, BackendError>,
    set_mute_calls: usize,
}

/// Fake volume backend.  Clones share one mixer so a test can keep a handle
/// for inspection after moving the backend into the code under test.
#[derive(Debug, Clone, Default)]
pub struct FakeMixer {
    inner: Arc<Mutex<Mixer>>,
}

impl FakeMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new audio session for `process` and returns its handle.
    pub fn add_session(&self, process: &str) -> SessionHandle {
        let mut m = self.inner.lock().unwrap();
        m.next_pid += 1;
        let handle = SessionHandle {
            process_id: m.next_pid,
            instance_id: format!("{process}#{}", m.next_pid),
        };
        m.sessions.insert(handle.clone(), (process.to_string(), false));
        handle
    }

    /// Ends every session owned by `process`, as if it had exited.
    pub fn kill(&self, process: &str) {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .retain(|_, (name, _)| name != process);
    }

    /// Makes every lookup for `process` fail with `err`.
    pub fn fail_lookups(&self, process: &str, err: BackendError) {
        self.inner.lock().unwrap().failing.insert(process.to_string(), err);
    }

    /// Lets lookups for `process` succeed again.
    pub fn clear_failures(&self, process: &str) {
        self.inner.lock().unwrap().failing.remove(process);
    }

    /// Flips a session's mute flag out-of-band, like a user in the OS mixer.
    pub fn set_externally(&self, handle: &SessionHandle, muted: bool) {
        if let Some(entry) = self.inner.lock().unwrap().sessions.get_mut(handle) {
            entry.1 = muted;
        }
    }

    pub fn is_muted(&self, handle: &SessionHandle) -> bool {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .get(handle)
            .map_or(false, |(_, muted)| *muted)
    }

    pub fn set_mute_calls(&self) -> usize {
        self.inner.lock().unwrap().set_mute_calls
    }
}

impl VolumeBackend for FakeMixer {
    fn list_sessions(&mut self, app: &ApplicationId) -> Result<Vec<SessionHandle>, BackendError> {
        let m = self.inner.lock().unwrap();
        if let Some(err) = m.failing.get(app.as_str()) {
            return Err(err.clone());
        }
        let mut found: Vec<SessionHandle> = m
            .sessions
            .iter()
            .filter(|(_, (name, _))| app.matches(name))
            .map(|(handle, _)| handle.clone())
            .collect();
        found.sort_by_key(|h| h.process_id);
        Ok(found)
    }

    fn set_mute(&mut self, session: &SessionHandle, muted: bool) -> Result<(), BackendError> {
        let mut m = self.inner.lock().unwrap();
        m.set_mute_calls += 1;
        match m.sessions.get_mut(session) {
            Some(entry) => {
                entry.1 = muted;
                Ok(())
            }
            None => Err(BackendError::SessionVanished),
        }
    }
}

/// Focus observer whose answer the test sets directly.
#[derive(Debug, Clone, Default)]
pub struct FakeFocus {
    current: Arc<Mutex<Option<ApplicationId>>>,
}

impl FakeFocus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&self, name: &str) {
        *self.current.lock().unwrap() = ApplicationId::new(name);
    }

    pub fn clear(&self) {
        *self.current.lock().unwrap() = None;
    }
}

impl FocusObserver for FakeFocus {
    fn foreground_application(&mut self) -> Option<ApplicationId> {
        self.current.lock().unwrap().clone()
    }
}

pub fn id(name: &str) -> ApplicationId {
    ApplicationId::new(name).unwrap()
}
