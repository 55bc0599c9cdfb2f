/// Foreground-window observation.
///
/// On Windows the owner of the foreground window is resolved through
/// `GetForegroundWindow` → `GetWindowThreadProcessId` → process name.  A
/// process that exits between the window query and the name lookup simply
/// yields `None`.
///
/// On other platforms the observer always reports "nothing focused", which
/// makes the reconciler fail safe toward muting.
use std::collections::HashSet;

use crate::app_id::ApplicationId;
use crate::processes::ProcessTable;

/// Reports which application owns the foreground window.
pub trait FocusObserver {
    /// Returns `None` when the owner cannot be determined (no window,
    /// permission denied, the process already exited).
    fn foreground_application(&mut self) -> Option<ApplicationId>;
}

/// Focus observer for the host operating system.
pub struct SystemFocusObserver {
    processes: ProcessTable,
}

impl SystemFocusObserver {
    pub fn new() -> Self {
        Self { processes: ProcessTable::new() }
    }
}

impl FocusObserver for SystemFocusObserver {
    fn foreground_application(&mut self) -> Option<ApplicationId> {
        let pid = imp::foreground_pid()?;
        let name = self.processes.name_of(pid)?;
        ApplicationId::new(&name)
    }
}

/// PIDs that own at least one visible top-level window with a non-empty
/// title.  `None` when the platform offers no way to tell.
pub fn visible_window_pids() -> Option<HashSet<u32>> {
    imp::visible_window_pids()
}

// ── Windows implementation ────────────────────────────────────────────────────

#[cfg(windows)]
mod imp {
    use std::collections::HashSet;

    use windows::Win32::Foundation::{BOOL, HWND, LPARAM};
    use windows::Win32::UI::WindowsAndMessaging::{
        EnumWindows, GetForegroundWindow, GetWindowTextLengthW, GetWindowThreadProcessId,
        IsWindowVisible,
    };

    pub fn foreground_pid() -> Option<u32> {
        unsafe {
            let hwnd = GetForegroundWindow();
            if hwnd.0 == 0 {
                return None;
            }
            window_pid(hwnd)
        }
    }

    unsafe fn window_pid(hwnd: HWND) -> Option<u32> {
        let mut pid = 0u32;
        // Returns the creating thread id; 0 means the window is already gone.
        if GetWindowThreadProcessId(hwnd, Some(&mut pid)) == 0 || pid == 0 {
            return None;
        }
        Some(pid)
    }

    unsafe extern "system" fn collect_visible(hwnd: HWND, lparam: LPARAM) -> BOOL {
        let pids = &mut *(lparam.0 as *mut HashSet<u32>);
        if IsWindowVisible(hwnd).as_bool() && GetWindowTextLengthW(hwnd) > 0 {
            if let Some(pid) = window_pid(hwnd) {
                pids.insert(pid);
            }
        }
        BOOL::from(true)
    }

    pub fn visible_window_pids() -> Option<HashSet<u32>> {
        let mut pids: HashSet<u32> = HashSet::new();
        let result = unsafe {
            EnumWindows(
                Some(collect_visible),
                LPARAM(&mut pids as *mut HashSet<u32> as isize),
            )
        };
        match result {
            Ok(()) => Some(pids),
            Err(e) => {
                tracing::warn!(target: "focus", "EnumWindows failed: {e}");
                None
            }
        }
    }
}

// ── Fallback ──────────────────────────────────────────────────────────────────

#[cfg(not(windows))]
mod imp {
    use std::collections::HashSet;

    pub fn foreground_pid() -> Option<u32> {
        None
    }

    pub fn visible_window_pids() -> Option<HashSet<u32>> {
        None
    }
}
