//! Push decision table derived from local and remote ref state.
//!
//! | local ref | `origin/<b>` | ahead/behind | plan |
//! |-----------|--------------|--------------|------|
//! | absent    | any          | any          | [`PushPlan::NoCommits`] |
//! | present   | absent       | n/a          | [`PushPlan::SetUpstream`] |
//! | present   | present      | 0/0          | [`PushPlan::UpToDate`] |
//! | present   | present      | n/0          | [`PushPlan::FastForward`] |
//! | present   | present      | 0/m          | [`PushPlan::Behind`] |
//! | present   | present      | n/m          | [`PushPlan::Diverged`] |
//!
//! Nothing here ever force-pushes.

/// Ref state a push decision is made from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefState {
    /// `refs/heads/<b>` exists.
    pub local: bool,
    /// `refs/remotes/origin/<b>` exists.
    pub remote: bool,
    /// Commits on local not on remote.
    pub ahead: u32,
    /// Commits on remote not on local.
    pub behind: u32,
}

/// What a push of one branch should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushPlan {
    /// The branch has no commits yet.
    NoCommits,
    /// First push: the remote branch does not exist, set upstream.
    SetUpstream,
    /// Remote already has every local commit.
    UpToDate,
    /// Local is strictly ahead, a plain push fast-forwards the remote.
    FastForward {
        /// Commits to send.
        ahead: u32,
    },
    /// Remote has commits local lacks; pull first.
    Behind {
        /// Remote-only commits.
        behind: u32,
    },
    /// Both sides have unique commits; manual resolution needed.
    Diverged {
        /// Local-only commits.
        ahead: u32,
        /// Remote-only commits.
        behind: u32,
    },
}

impl PushPlan {
    /// Decide from ref state.
    #[must_use]
    pub const fn from_state(state: RefState) -> Self {
        match state {
            RefState { local: false, .. } => Self::NoCommits,
            RefState { remote: false, .. } => Self::SetUpstream,
            RefState {
                ahead: 0,
                behind: 0,
                ..
            } => Self::UpToDate,
            RefState {
                ahead, behind: 0, ..
            } => Self::FastForward { ahead },
            RefState {
                ahead: 0, behind, ..
            } => Self::Behind { behind },
            RefState { ahead, behind, .. } => Self::Diverged { ahead, behind },
        }
    }

    /// Whether the plan sends commits to the remote.
    #[must_use]
    pub const fn needs_push(self) -> bool {
        matches!(self, Self::SetUpstream | Self::FastForward { .. })
    }

    /// Why the push cannot proceed, for plans that block it.
    #[must_use]
    pub fn blocked_reason(self) -> Option<String> {
        match self {
            Self::NoCommits => Some("branch has no commits to push".to_string()),
            Self::Behind { behind } => Some(format!(
                "remote has {behind} commit(s) you don't have; run `freckle update` first"
            )),
            Self::Diverged { ahead, behind } => Some(format!(
                "local and remote have diverged ({ahead} ahead, {behind} behind); resolve manually"
            )),
            Self::SetUpstream | Self::UpToDate | Self::FastForward { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn state(local: bool, remote: bool, ahead: u32, behind: u32) -> RefState {
        RefState {
            local,
            remote,
            ahead,
            behind,
        }
    }

    #[test]
    fn no_local_ref_means_no_commits() {
        assert_eq!(PushPlan::from_state(state(false, true, 0, 3)), PushPlan::NoCommits);
    }

    #[test]
    fn missing_remote_sets_upstream() {
        let plan = PushPlan::from_state(state(true, false, 0, 0));
        assert_eq!(plan, PushPlan::SetUpstream);
        assert!(plan.needs_push());
        assert!(plan.blocked_reason().is_none());
    }

    #[test]
    fn equal_refs_are_up_to_date() {
        let plan = PushPlan::from_state(state(true, true, 0, 0));
        assert_eq!(plan, PushPlan::UpToDate);
        assert!(!plan.needs_push());
    }

    #[test]
    fn ahead_only_fast_forwards() {
        let plan = PushPlan::from_state(state(true, true, 2, 0));
        assert_eq!(plan, PushPlan::FastForward { ahead: 2 });
        assert!(plan.needs_push());
    }

    #[test]
    fn behind_blocks_push() {
        let plan = PushPlan::from_state(state(true, true, 0, 1));
        assert_eq!(plan, PushPlan::Behind { behind: 1 });
        assert!(plan.blocked_reason().unwrap_or_default().contains("update"));
    }

    #[test]
    fn diverged_blocks_push_and_never_forces() {
        let plan = PushPlan::from_state(state(true, true, 1, 1));
        assert_eq!(plan, PushPlan::Diverged { ahead: 1, behind: 1 });
        assert!(!plan.needs_push());
    }
}
