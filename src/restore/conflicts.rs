//! Detect and clear work-tree files that would block a checkout.
//!
//! A path is in the way of `target` when the checkout would write it, it
//! exists in the work tree, git does not own it cleanly (untracked, or
//! tracked with local edits), and its content differs from what `target`
//! holds. Those paths are moved into one restore point before git runs.
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;

use crate::error::FreckleError;
use crate::logging::Log;
use crate::repo::BareRepo;
use crate::restore::{PendingPoint, RestorePoint, RestorePoints};

/// What [`ConflictResolver::resolve`] did.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Restore point holding the moved files; `None` when nothing moved or
    /// in dry-run mode.
    pub point: Option<RestorePoint>,
    /// Home-relative paths that were (or would be) moved.
    pub moved: Vec<String>,
}

struct Scan {
    conflicts: Vec<String>,
    head_paths: HashSet<String>,
    tracked: HashSet<String>,
}

/// Clears the way for checkouts, merges and initial materialization.
#[derive(Debug)]
pub struct ConflictResolver<'a> {
    repo: &'a BareRepo,
    points: &'a RestorePoints,
    log: &'a dyn Log,
    dry_run: bool,
}

/// First proper ancestor of `rel` that exists under `home` as something
/// other than a directory. Git cannot create `rel` beneath it.
fn blocking_ancestor(home: &Path, rel: &str) -> Option<String> {
    let mut prefix = String::new();
    let parts: Vec<&str> = rel.split('/').collect();
    let (_, dirs) = parts.split_last()?;
    for part in dirs {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(part);
        match fs::symlink_metadata(home.join(&prefix)) {
            Ok(meta) if !meta.is_dir() => return Some(prefix),
            Ok(_) => {}
            Err(_) => return None,
        }
    }
    None
}

impl<'a> ConflictResolver<'a> {
    /// Resolver acting on `repo`'s work tree.
    #[must_use]
    pub const fn new(
        repo: &'a BareRepo,
        points: &'a RestorePoints,
        log: &'a dyn Log,
        dry_run: bool,
    ) -> Self {
        Self {
            repo,
            points,
            log,
            dry_run,
        }
    }

    fn scan(&self, baseline: Option<&str>, target: &str) -> Result<Scan, FreckleError> {
        let home = self.repo.work_tree();
        let head: HashMap<String, String> = if let Some(base) = baseline {
            self.repo
                .tree_entries(base)?
                .into_iter()
                .map(|e| (e.path, e.oid))
                .collect()
        } else {
            HashMap::new()
        };
        let target_entries = self.repo.tree_entries(target)?;
        let tracked: HashSet<String> = self.repo.tracked_files()?.into_iter().collect();
        let dirty: HashSet<String> = self.repo.changed_files()?.into_iter().collect();
        let clean = |path: &str| tracked.contains(path) && !dirty.contains(path);

        let mut conflicts: HashSet<String> = HashSet::new();
        let mut to_hash: Vec<(String, String)> = Vec::new();

        for entry in target_entries.iter().filter(|e| head.get(&e.path) != Some(&e.oid)) {
            let Ok(meta) = fs::symlink_metadata(home.join(&entry.path)) else {
                if let Some(blocker) = blocking_ancestor(home, &entry.path)
                    && !clean(&blocker)
                {
                    conflicts.insert(blocker);
                }
                continue;
            };
            if clean(&entry.path) {
                continue;
            }
            if meta.is_file() {
                to_hash.push((entry.path.clone(), entry.oid.clone()));
            } else {
                conflicts.insert(entry.path.clone());
            }
        }

        // Local edits to files the target drops would be lost by git.
        let target_paths: HashSet<&str> = target_entries.iter().map(|e| e.path.as_str()).collect();
        for path in head.keys().filter(|p| !target_paths.contains(p.as_str())) {
            if dirty.contains(path) && fs::symlink_metadata(home.join(path)).is_ok() {
                conflicts.insert(path.clone());
            }
        }

        let paths: Vec<String> = to_hash.iter().map(|(p, _)| p.clone()).collect();
        let hashes = self.repo.hash_files(&paths)?;
        for ((path, want), got) in to_hash.into_iter().zip(hashes) {
            if got != want {
                conflicts.insert(path);
            }
        }

        let mut conflicts: Vec<String> = conflicts.into_iter().collect();
        conflicts.sort();
        Ok(Scan {
            conflicts,
            head_paths: head.into_keys().collect(),
            tracked,
        })
    }

    /// Paths that would block checking out `target`, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`FreckleError::Git`] if the trees or index cannot be read.
    pub fn conflicts(&self, target: &str) -> Result<Vec<String>, FreckleError> {
        Ok(self.scan(self.head(), target)?.conflicts)
    }

    fn head(&self) -> Option<&'static str> {
        self.repo.head_exists().then_some("HEAD")
    }

    /// Move every conflict for `target` into a single restore point.
    ///
    /// Moves are all-or-nothing: if one fails, the ones already made are
    /// put back and [`FreckleError::ConflictRelocation`] is returned.
    /// Tracked paths that were moved are then reset to `HEAD` (or unstaged
    /// when `HEAD` lacks them) so git sees a clean work tree.
    ///
    /// # Errors
    ///
    /// Returns [`FreckleError`] if scanning, moving or resetting fails.
    pub fn resolve(&self, target: &str, reason: &str) -> Result<Resolution, FreckleError> {
        let scan = self.scan(self.head(), target)?;
        self.relocate(scan, reason)
    }

    /// Like [`resolve`](Self::resolve) for the first checkout after a
    /// clone, when the index is empty and every path of `target` will be
    /// written regardless of `HEAD`.
    ///
    /// # Errors
    ///
    /// Returns [`FreckleError`] if scanning or moving fails.
    pub fn resolve_initial(&self, target: &str, reason: &str) -> Result<Resolution, FreckleError> {
        let scan = self.scan(None, target)?;
        self.relocate(scan, reason)
    }

    fn relocate(&self, scan: Scan, reason: &str) -> Result<Resolution, FreckleError> {
        if scan.conflicts.is_empty() {
            return Ok(Resolution::default());
        }
        let home = self.repo.work_tree();

        if self.dry_run {
            for path in &scan.conflicts {
                self.log
                    .dry_run(&format!("would move ~/{path} to a restore point"));
            }
            return Ok(Resolution {
                point: None,
                moved: scan.conflicts,
            });
        }

        let mut pending = self.points.begin(reason)?;
        for path in &scan.conflicts {
            if let Err(source) = pending.stash(home, path) {
                self.put_back(pending, home);
                return Err(FreckleError::ConflictRelocation {
                    path: home.join(path),
                    source,
                });
            }
            self.log.debug(&format!("moved aside: {path}"));
        }
        let point = match pending.commit() {
            Ok(point) => point,
            Err(e) => {
                let path = pending.dir().to_path_buf();
                self.put_back(pending, home);
                return Err(FreckleError::ConflictRelocation {
                    path,
                    source: io::Error::other(e),
                });
            }
        };

        let (from_head, staged_only): (Vec<String>, Vec<String>) = scan
            .conflicts
            .iter()
            .filter(|p| scan.tracked.contains(*p))
            .cloned()
            .partition(|p| scan.head_paths.contains(p));
        self.repo.restore_from_head(&from_head)?;
        if !staged_only.is_empty() {
            self.repo.remove(&staged_only, true)?;
        }

        self.log.warn(&format!(
            "moved {} conflicting file(s) to restore point {}",
            scan.conflicts.len(),
            point.name
        ));
        Ok(Resolution {
            point: Some(point),
            moved: scan.conflicts,
        })
    }

    /// Undo a partial relocation, reporting anything that could not go back.
    fn put_back(&self, pending: PendingPoint, home: &Path) {
        for stranded in pending.rollback(home) {
            self.log.error(&format!(
                "could not put ~/{stranded} back; it remains under {}",
                self.points.root().display()
            ));
        }
    }
}
