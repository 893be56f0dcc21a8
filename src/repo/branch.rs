//! Choosing which branch to check out when the configured one is missing.

/// Outcome of [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchResolution {
    /// The requested branch exists.
    Exact(String),
    /// `main` was requested but only `master` exists, or the reverse.
    Swapped {
        /// Configured name.
        requested: String,
        /// Branch that will be used.
        actual: String,
    },
    /// The remote's default branch is used instead.
    RemoteHead {
        /// Configured name.
        requested: String,
        /// Branch that will be used.
        actual: String,
    },
    /// Nothing matched; the first available branch is used.
    FirstAvailable {
        /// Configured name.
        requested: String,
        /// Branch that will be used.
        actual: String,
    },
    /// No branches exist at all.
    NotFound {
        /// Configured name.
        requested: String,
    },
}

impl BranchResolution {
    /// The branch to use, if any.
    #[must_use]
    pub fn branch(&self) -> Option<&str> {
        match self {
            Self::Exact(b) => Some(b),
            Self::Swapped { actual, .. }
            | Self::RemoteHead { actual, .. }
            | Self::FirstAvailable { actual, .. } => Some(actual),
            Self::NotFound { .. } => None,
        }
    }

    /// Explanation for the user when the configured branch was not used.
    #[must_use]
    pub fn note(&self) -> Option<String> {
        match self {
            Self::Exact(_) => None,
            Self::Swapped { requested, actual } => Some(format!(
                "branch '{requested}' not found, using '{actual}'"
            )),
            Self::RemoteHead { requested, actual } => Some(format!(
                "branch '{requested}' not found, using the remote default '{actual}'"
            )),
            Self::FirstAvailable { requested, actual } => Some(format!(
                "branch '{requested}' not found, falling back to '{actual}'"
            )),
            Self::NotFound { requested } => {
                Some(format!("branch '{requested}' not found and the repository has no branches"))
            }
        }
    }
}

/// Resolve `requested` against the `available` branch names.
///
/// Order: exact match, `main`/`master` swap, the remote default branch,
/// then `main` or `master` if present, then the first available branch.
#[must_use]
pub fn resolve(requested: &str, available: &[String], remote_head: Option<&str>) -> BranchResolution {
    let has = |name: &str| available.iter().any(|b| b == name);
    let requested_owned = requested.to_string();

    if has(requested) {
        return BranchResolution::Exact(requested_owned);
    }
    let swap = match requested {
        "main" => Some("master"),
        "master" => Some("main"),
        _ => None,
    };
    if let Some(other) = swap.filter(|o| has(o)) {
        return BranchResolution::Swapped {
            requested: requested_owned,
            actual: other.to_string(),
        };
    }
    if let Some(head) = remote_head.filter(|h| has(h)) {
        return BranchResolution::RemoteHead {
            requested: requested_owned,
            actual: head.to_string(),
        };
    }
    let fallback = ["main", "master"]
        .into_iter()
        .find(|c| has(c))
        .map(String::from)
        .or_else(|| available.first().cloned());
    match fallback {
        Some(actual) => BranchResolution::FirstAvailable {
            requested: requested_owned,
            actual,
        },
        None => BranchResolution::NotFound {
            requested: requested_owned,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn exact_match_wins() {
        let r = resolve("work", &names(&["main", "work"]), Some("main"));
        assert_eq!(r, BranchResolution::Exact("work".into()));
        assert!(r.note().is_none());
    }

    #[test]
    fn main_falls_back_to_master() {
        let r = resolve("main", &names(&["master", "work"]), None);
        assert_eq!(r.branch(), Some("master"));
        assert!(matches!(r, BranchResolution::Swapped { .. }));
    }

    #[test]
    fn unknown_uses_remote_head() {
        let r = resolve("laptop", &names(&["dev", "trunk"]), Some("trunk"));
        assert!(matches!(r, BranchResolution::RemoteHead { .. }));
        assert_eq!(r.branch(), Some("trunk"));
    }

    #[test]
    fn unknown_prefers_main_over_first() {
        let r = resolve("laptop", &names(&["alpha", "main"]), None);
        assert_eq!(r.branch(), Some("main"));
    }

    #[test]
    fn unknown_uses_first_available() {
        let r = resolve("laptop", &names(&["alpha", "beta"]), None);
        assert_eq!(r.branch(), Some("alpha"));
        assert!(r.note().unwrap_or_default().contains("falling back"));
    }

    #[test]
    fn empty_repository_is_not_found() {
        let r = resolve("main", &[], None);
        assert_eq!(r.branch(), None);
        assert!(matches!(r, BranchResolution::NotFound { .. }));
    }
}
