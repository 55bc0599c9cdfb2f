/// Per-application mute control on the OS audio mixer.
///
/// On Windows this talks to WASAPI: the session manager of the default render
/// endpoint enumerates every audio session, `IAudioSessionControl2` maps each
/// session to its owning process, and `ISimpleAudioVolume` flips the mute
/// flag.  Handles are plain data (PID + session instance id) and every call
/// re-enumerates the live sessions, so a stale handle is detected rather than
/// dereferenced.
///
/// On non-Windows platforms the public API compiles but every call returns
/// [`BackendError::Unsupported`].
use crate::app_id::ApplicationId;
use crate::error::BackendError;
use crate::processes::ProcessTable;

/// Reference to one live OS audio session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    /// PID of the process that owns the session.
    pub process_id: u32,
    /// OS identifier unique to this session instance.
    pub instance_id: String,
}

/// Capability to find and mute audio sessions.
pub trait VolumeBackend {
    /// Returns every live session owned by a process named `app`.  An empty
    /// list means the app is not producing audio right now.
    fn list_sessions(&mut self, app: &ApplicationId) -> Result<Vec<SessionHandle>, BackendError>;

    /// Sets the mute flag of one session.  Fails with
    /// [`BackendError::SessionVanished`] if the session no longer exists.
    fn set_mute(&mut self, session: &SessionHandle, muted: bool) -> Result<(), BackendError>;
}

/// Volume backend for the host operating system.
pub struct SystemVolumeBackend {
    processes: ProcessTable,
}

impl SystemVolumeBackend {
    pub fn new() -> Self {
        Self { processes: ProcessTable::new() }
    }
}

impl VolumeBackend for SystemVolumeBackend {
    fn list_sessions(&mut self, app: &ApplicationId) -> Result<Vec<SessionHandle>, BackendError> {
        let all = imp::all_sessions()?;

        let mut pids: Vec<u32> = all.iter().map(|s| s.process_id).collect();
        pids.sort_unstable();
        pids.dedup();

        let matching: Vec<u32> = self
            .processes
            .names_of(&pids)
            .into_iter()
            .filter(|(_, name)| app.matches(name))
            .map(|(pid, _)| pid)
            .collect();

        Ok(all
            .into_iter()
            .filter(|s| matching.contains(&s.process_id))
            .collect())
    }

    fn set_mute(&mut self, session: &SessionHandle, muted: bool) -> Result<(), BackendError> {
        imp::set_mute(session, muted)
    }
}

// ── Windows implementation ────────────────────────────────────────────────────

#[cfg(windows)]
mod imp {
    use windows::core::{Interface, GUID};
    use windows::Win32::Foundation::BOOL;
    use windows::Win32::Media::Audio::{
        eConsole, eRender, AudioSessionStateExpired, IAudioSessionControl,
        IAudioSessionControl2, IAudioSessionManager2, IMMDeviceEnumerator, ISimpleAudioVolume,
        MMDeviceEnumerator,
    };
    use windows::Win32::System::Com::{
        CoCreateInstance, CoInitializeEx, CoTaskMemFree, CLSCTX_ALL, COINIT_MULTITHREADED,
    };

    use super::SessionHandle;
    use crate::error::BackendError;

    /// Event context passed with every mute change so other mixers can tell
    /// the change came from this daemon.
    static EVENT_CONTEXT: GUID = GUID::from_u128(0x6d75_7465_2d62_6700_8000_0000_0000_0001);

    /// Every non-expired session on the default render endpoint, paired with
    /// its plain-data handle.  System sounds (PID 0) are skipped.
    unsafe fn live_sessions() -> Result<Vec<(SessionHandle, IAudioSessionControl)>, BackendError> {
        // COM must be initialised on this thread; repeated calls are harmless.
        let _ = CoInitializeEx(None, COINIT_MULTITHREADED);

        let enumerator: IMMDeviceEnumerator =
            CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)?;
        let device = enumerator.GetDefaultAudioEndpoint(eRender, eConsole)?;
        let manager: IAudioSessionManager2 = device.Activate(CLSCTX_ALL, None)?;
        let sessions = manager.GetSessionEnumerator()?;
        let count = sessions.GetCount()?;

        let mut out = Vec::new();
        for i in 0..count {
            let Ok(control) = sessions.GetSession(i) else { continue };
            if matches!(control.GetState(), Ok(state) if state == AudioSessionStateExpired) {
                continue;
            }
            let Ok(control2) = control.cast::<IAudioSessionControl2>() else { continue };
            let process_id = control2.GetProcessId().unwrap_or(0);
            if process_id == 0 {
                continue;
            }
            let Ok(raw_id) = control2.GetSessionInstanceIdentifier() else { continue };
            let instance_id = raw_id.to_string().unwrap_or_default();
            CoTaskMemFree(Some(raw_id.0 as *const _));

            out.push((SessionHandle { process_id, instance_id }, control));
        }
        Ok(out)
    }

    pub fn all_sessions() -> Result<Vec<SessionHandle>, BackendError> {
        unsafe {
            Ok(live_sessions()?
                .into_iter()
                .map(|(handle, _)| handle)
                .collect())
        }
    }

    pub fn set_mute(session: &SessionHandle, muted: bool) -> Result<(), BackendError> {
        unsafe {
            let control = live_sessions()?
                .into_iter()
                .find(|(handle, _)| handle == session)
                .map(|(_, control)| control)
                .ok_or(BackendError::SessionVanished)?;

            let volume: ISimpleAudioVolume = control.cast()?;
            volume.SetMute(BOOL::from(muted), &EVENT_CONTEXT)?;
        }
        Ok(())
    }
}

// ── Fallback ──────────────────────────────────────────────────────────────────

#[cfg(not(windows))]
mod imp {
    use super::SessionHandle;
    use crate::error::BackendError;

    pub fn all_sessions() -> Result<Vec<SessionHandle>, BackendError> {
        Err(BackendError::Unsupported)
    }

    pub fn set_mute(_session: &SessionHandle, _muted: bool) -> Result<(), BackendError> {
        Err(BackendError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(windows))]
    #[test]
    fn system_backend_is_unsupported_off_windows() {
        let mut backend = SystemVolumeBackend::new();
        let app = ApplicationId::new("anything").unwrap();
        assert_eq!(backend.list_sessions(&app), Err(BackendError::Unsupported));

        let handle = SessionHandle { process_id: 1, instance_id: "x".into() };
        assert_eq!(backend.set_mute(&handle, true), Err(BackendError::Unsupported));
    }

    /// Listing sessions for a name no process uses must succeed with an empty
    /// list (or fail softly when no audio device exists on the test machine).
    #[cfg(windows)]
    #[test]
    fn system_backend_lists_nothing_for_unknown_app() {
        let mut backend = SystemVolumeBackend::new();
        let app = ApplicationId::new("definitely-not-running-1f2e3d.exe").unwrap();
        if let Ok(sessions) = backend.list_sessions(&app) {
            assert!(sessions.is_empty());
        }
    }
}
