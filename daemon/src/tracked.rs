use crate::app_id::ApplicationId;

/// Ordered set of applications the user has opted into mute-when-unfocused.
///
/// Insertion order is preserved so the status file lists apps in the order
/// they were tracked.
#[derive(Debug, Default, Clone)]
pub struct TrackedSet {
    apps: Vec<ApplicationId>,
}

impl TrackedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `id`.  Returns `false` if it was already tracked.
    pub fn track(&mut self, id: ApplicationId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.apps.push(id);
        true
    }

    /// Removes `id`.  Returns `false` if it was not tracked.
    pub fn untrack(&mut self, id: &ApplicationId) -> bool {
        let before = self.apps.len();
        self.apps.retain(|app| app != id);
        self.apps.len() != before
    }

    pub fn contains(&self, id: &ApplicationId) -> bool {
        self.apps.iter().any(|app| app == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ApplicationId> {
        self.apps.iter()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> ApplicationId {
        ApplicationId::new(name).unwrap()
    }

    #[test]
    fn new_set_is_empty() {
        let set = TrackedSet::new();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn track_preserves_insertion_order() {
        let mut set = TrackedSet::new();
        set.track(id("c.exe"));
        set.track(id("a.exe"));
        set.track(id("b.exe"));

        let names: Vec<_> = set.iter().map(|a| a.as_str()).collect();
        assert_eq!(names, ["c.exe", "a.exe", "b.exe"]);
    }

    #[test]
    fn track_rejects_duplicates() {
        let mut set = TrackedSet::new();
        assert!(set.track(id("a.exe")));
        assert!(!set.track(id("a.exe")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn untrack_reports_whether_present() {
        let mut set = TrackedSet::new();
        set.track(id("a.exe"));
        assert!(set.untrack(&id("a.exe")));
        assert!(!set.untrack(&id("a.exe")));
        assert!(!set.contains(&id("a.exe")));
    }
}
