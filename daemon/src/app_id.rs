/// Stable identity of a tracked application: its executable name.
///
/// PIDs churn across restarts and window titles change while an app runs, so
/// neither is usable as a tracking key.  Comparison follows the OS convention
/// for file names: case-insensitive on Windows, case-sensitive elsewhere.
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
pub struct ApplicationId {
    /// Name as the user or the OS spelled it, kept for display.
    name: String,
    /// Normalised comparison key.
    key: String,
}

impl ApplicationId {
    /// Builds an id from an executable name.  Surrounding whitespace is
    /// trimmed; returns `None` if nothing is left.
    pub fn new(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            key: normalise(name),
        })
    }

    /// The executable name as originally spelled.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Returns `true` if `process_name` refers to this application.
    pub fn matches(&self, process_name: &str) -> bool {
        normalise(process_name.trim()) == self.key
    }
}

#[cfg(windows)]
fn normalise(name: &str) -> String {
    name.to_lowercase()
}

#[cfg(not(windows))]
fn normalise(name: &str) -> String {
    name.to_string()
}

impl PartialEq for ApplicationId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ApplicationId {}

impl Hash for ApplicationId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for ApplicationId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ApplicationId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn new_trims_whitespace() {
        let id = ApplicationId::new("  spotify.exe \n").unwrap();
        assert_eq!(id.as_str(), "spotify.exe");
    }

    #[test]
    fn new_rejects_blank_names() {
        assert!(ApplicationId::new("").is_none());
        assert!(ApplicationId::new("   ").is_none());
    }

    #[test]
    fn display_uses_original_spelling() {
        let id = ApplicationId::new("Discord.exe").unwrap();
        assert_eq!(id.to_string(), "Discord.exe");
    }

    #[test]
    fn identical_names_are_equal_and_hash_together() {
        let a = ApplicationId::new("vlc.exe").unwrap();
        let b = ApplicationId::new("vlc.exe").unwrap();
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn matches_exact_process_name() {
        let id = ApplicationId::new("chrome.exe").unwrap();
        assert!(id.matches("chrome.exe"));
        assert!(!id.matches("chromedriver.exe"));
    }

    #[cfg(windows)]
    #[test]
    fn comparison_ignores_case_on_windows() {
        let a = ApplicationId::new("Spotify.exe").unwrap();
        let b = ApplicationId::new("SPOTIFY.EXE").unwrap();
        assert_eq!(a, b);
        assert!(a.matches("spotify.exe"));
    }

    #[cfg(not(windows))]
    #[test]
    fn comparison_is_case_sensitive_elsewhere() {
        let a = ApplicationId::new("Spotify").unwrap();
        let b = ApplicationId::new("spotify").unwrap();
        assert_ne!(a, b);
        assert!(!a.matches("spotify"));
    }
}
