/// Process-name lookups backed by `sysinfo`.
///
/// Used by the focus observer and the volume backend to turn PIDs into
/// executable names, and by the daemon to publish the list of running
/// applications the user could choose to track.
use std::collections::{BTreeSet, HashSet};

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind, Users};

use crate::app_id::ApplicationId;
use crate::tracked::TrackedSet;

/// Service-host processes never make sense as tracking candidates.
const EXCLUDED_PREFIX: &str = "svchost";

/// Processes run by an account whose name ends in this (`SYSTEM`,
/// `NT AUTHORITY\SYSTEM`) are services, not user applications.
const SYSTEM_ACCOUNT_SUFFIX: &str = "SYSTEM";

pub struct ProcessTable {
    sys: System,
    users: Users,
}

/// A running process as seen by the candidate filter.
struct Candidate {
    pid: u32,
    name: String,
    user: Option<String>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            sys: System::new(),
            users: Users::new(),
        }
    }

    /// Returns the executable name of `pid`, or `None` if the process has
    /// exited (or was never visible to us).
    pub fn name_of(&mut self, pid: u32) -> Option<String> {
        let pid = Pid::from_u32(pid);
        self.sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        self.sys
            .process(pid)
            .map(|p| p.name().to_string_lossy().into_owned())
    }

    /// Refreshes the names of several PIDs at once and returns the ones still
    /// alive.  Cheaper than calling [`name_of`](Self::name_of) in a loop.
    pub fn names_of(&mut self, pids: &[u32]) -> Vec<(u32, String)> {
        let sys_pids: Vec<Pid> = pids.iter().copied().map(Pid::from_u32).collect();
        self.sys.refresh_processes(ProcessesToUpdate::Some(&sys_pids), true);
        pids.iter()
            .filter_map(|&pid| {
                self.sys
                    .process(Pid::from_u32(pid))
                    .map(|p| (pid, p.name().to_string_lossy().into_owned()))
            })
            .collect()
    }

    /// Lists running applications that are not yet tracked, deduplicated by
    /// executable name and sorted.
    ///
    /// Unless `show_all` is set, only processes owning a visible, titled
    /// top-level window are listed (where the platform can tell).  Processes
    /// owned by the system account are never listed.
    pub fn running_applications(&mut self, tracked: &TrackedSet, show_all: bool) -> Vec<String> {
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::new().with_user(UpdateKind::OnlyIfNotSet),
        );
        self.users.refresh_list();

        let visible = if show_all {
            None
        } else {
            crate::focus::visible_window_pids()
        };

        let users = &self.users;
        let processes = self.sys.processes().iter().map(|(pid, p)| Candidate {
            pid: pid.as_u32(),
            name: p.name().to_string_lossy().into_owned(),
            user: p
                .user_id()
                .and_then(|uid| users.get_user_by_id(uid))
                .map(|user| user.name().to_string()),
        });

        filter_applications(processes, tracked, visible.as_ref())
    }
}

fn filter_applications(
    processes: impl Iterator<Item = Candidate>,
    tracked: &TrackedSet,
    visible: Option<&HashSet<u32>>,
) -> Vec<String> {
    let apps: BTreeSet<ApplicationId> = processes
        .filter(|p| visible.map_or(true, |v| v.contains(&p.pid)))
        .filter(|p| !p.name.to_lowercase().starts_with(EXCLUDED_PREFIX))
        .filter(|p| {
            !p.user
                .as_deref()
                .is_some_and(|user| user.ends_with(SYSTEM_ACCOUNT_SUFFIX))
        })
        .filter_map(|p| ApplicationId::new(&p.name))
        .filter(|id| !tracked.contains(id))
        .collect();

    apps.into_iter().map(|id| id.as_str().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn procs(list: &[(u32, &str)]) -> impl Iterator<Item = Candidate> {
        list.iter()
            .map(|(pid, name)| Candidate {
                pid: *pid,
                name: name.to_string(),
                user: Some("alice".to_string()),
            })
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn filter_sorts_and_deduplicates() {
        let list = procs(&[(3, "zoom.exe"), (1, "chrome.exe"), (2, "chrome.exe"), (4, "abc.exe")]);
        let apps = filter_applications(list, &TrackedSet::new(), None);
        assert_eq!(apps, ["abc.exe", "chrome.exe", "zoom.exe"]);
    }

    #[test]
    fn filter_excludes_service_hosts() {
        let list = procs(&[(1, "svchost.exe"), (2, "Svchost.exe"), (3, "game.exe")]);
        let apps = filter_applications(list, &TrackedSet::new(), None);
        assert_eq!(apps, ["game.exe"]);
    }

    #[test]
    fn filter_excludes_system_account_processes() {
        let list = vec![
            Candidate { pid: 1, name: "spoolsv.exe".into(), user: Some("SYSTEM".into()) },
            Candidate {
                pid: 2,
                name: "MsMpEng.exe".into(),
                user: Some("NT AUTHORITY\\SYSTEM".into()),
            },
            Candidate { pid: 3, name: "game.exe".into(), user: Some("alice".into()) },
            Candidate { pid: 4, name: "unknown.exe".into(), user: None },
        ];
        let apps = filter_applications(list.into_iter(), &TrackedSet::new(), None);
        assert_eq!(apps, ["game.exe", "unknown.exe"]);
    }

    #[test]
    fn filter_excludes_tracked_apps() {
        let mut tracked = TrackedSet::new();
        tracked.track(ApplicationId::new("spotify.exe").unwrap());

        let list = procs(&[(1, "spotify.exe"), (2, "discord.exe")]);
        let apps = filter_applications(list, &tracked, None);
        assert_eq!(apps, ["discord.exe"]);
    }

    #[test]
    fn filter_applies_visible_window_set() {
        let visible: HashSet<u32> = [2].into_iter().collect();
        let list = procs(&[(1, "background.exe"), (2, "editor.exe")]);
        let apps = filter_applications(list, &TrackedSet::new(), Some(&visible));
        assert_eq!(apps, ["editor.exe"]);
    }

    #[test]
    fn filter_skips_blank_names() {
        let list = procs(&[(1, ""), (2, "  "), (3, "ok.exe")]);
        let apps = filter_applications(list, &TrackedSet::new(), None);
        assert_eq!(apps, ["ok.exe"]);
    }

    #[test]
    fn name_of_current_process_is_known() {
        let mut table = ProcessTable::new();
        let name = table.name_of(std::process::id());
        assert!(name.is_some());
    }

    #[test]
    fn names_of_drops_dead_pids() {
        let mut table = ProcessTable::new();
        let me = std::process::id();
        // PID 0x7FFF_FFF0 is far above any real PID range.
        let names = table.names_of(&[me, 0x7FFF_FFF0]);
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].0, me);
    }
}
