//! Operating system detection and OS package manager selection.
use std::fmt;
use std::path::Path;

use crate::tools::package::PackageManager;

/// Debian-family distribution IDs that ship `apt`.
const DEBIAN_FAMILY: &[&str] = &["debian", "ubuntu", "linuxmint", "pop"];

/// Detected operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// Any Linux distribution.
    Linux,
    /// macOS.
    MacOs,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::MacOs => write!(f, "macos"),
        }
    }
}

/// Platform information for the current system.
#[derive(Debug, Clone)]
pub struct Platform {
    /// Operating system.
    pub os: Os,
    /// Whether this is a Debian-family Linux (`apt` available).
    pub is_debian: bool,
}

impl Platform {
    /// Detect the current platform.
    #[must_use]
    pub fn detect() -> Self {
        let os = if cfg!(target_os = "macos") {
            Os::MacOs
        } else {
            Os::Linux
        };
        let is_debian = os == Os::Linux && detect_debian(Path::new("/etc/os-release"));
        Self { os, is_debian }
    }

    /// Create a platform with explicit values.
    #[must_use]
    pub const fn new(os: Os, is_debian: bool) -> Self {
        Self { os, is_debian }
    }

    /// Whether this is macOS.
    #[must_use]
    pub fn is_macos(&self) -> bool {
        self.os == Os::MacOs
    }

    /// The OS-level package manager, if the platform has a supported one.
    #[must_use]
    pub const fn os_manager(&self) -> Option<PackageManager> {
        match self.os {
            Os::MacOs => Some(PackageManager::Brew),
            Os::Linux if self.is_debian => Some(PackageManager::Apt),
            Os::Linux => None,
        }
    }
}

/// Read an os-release file and report whether `ID` or `ID_LIKE` names a
/// Debian-family distribution.
fn detect_debian(os_release: &Path) -> bool {
    std::fs::read_to_string(os_release).is_ok_and(|content| is_debian_release(&content))
}

fn is_debian_release(content: &str) -> bool {
    content
        .lines()
        .filter_map(|line| {
            line.strip_prefix("ID=")
                .or_else(|| line.strip_prefix("ID_LIKE="))
        })
        .flat_map(|value| value.trim_matches('"').split_whitespace())
        .any(|id| DEBIAN_FAMILY.contains(&id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macos_uses_brew() {
        let p = Platform::new(Os::MacOs, false);
        assert!(p.is_macos());
        assert_eq!(p.os_manager(), Some(PackageManager::Brew));
    }

    #[test]
    fn debian_uses_apt() {
        let p = Platform::new(Os::Linux, true);
        assert_eq!(p.os_manager(), Some(PackageManager::Apt));
    }

    #[test]
    fn other_linux_has_no_os_manager() {
        let p = Platform::new(Os::Linux, false);
        assert_eq!(p.os_manager(), None);
    }

    #[test]
    fn os_release_ubuntu() {
        let content = "NAME=\"Ubuntu\"\nID=ubuntu\nID_LIKE=debian\nVERSION_ID=\"24.04\"\n";
        assert!(is_debian_release(content));
    }

    #[test]
    fn os_release_derivative_via_id_like() {
        let content = "ID=elementary\nID_LIKE=\"ubuntu debian\"\n";
        assert!(is_debian_release(content));
    }

    #[test]
    fn os_release_fedora_is_not_debian() {
        let content = "ID=fedora\nID_LIKE=\"rhel centos\"\n";
        assert!(!is_debian_release(content));
    }

    #[test]
    fn missing_os_release_is_not_debian() {
        assert!(!detect_debian(Path::new("/nonexistent/os-release")));
    }

    #[test]
    fn os_display() {
        assert_eq!(Os::Linux.to_string(), "linux");
        assert_eq!(Os::MacOs.to_string(), "macos");
    }
}
