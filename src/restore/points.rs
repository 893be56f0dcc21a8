//! On-disk restore points.
//!
//! Layout under the backup root:
//!
//! ```text
//! <root>/<YYYY-MM-DD_HH-MM-SS[-N]>/
//!     manifest.json          {created_at, reason, files[]}
//!     files/<relative path>  displaced content
//! ```
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::RestorePointError;

const MANIFEST: &str = "manifest.json";
const FILES_DIR: &str = "files";
const NAME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Metadata stored alongside the displaced files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// RFC 3339 creation time.
    pub created_at: String,
    /// Operation that created the point (e.g. "update main").
    pub reason: String,
    /// Home-relative paths stored in the point.
    pub files: Vec<String>,
}

/// A completed restore point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorePoint {
    /// Directory name, also the timestamp identifier.
    pub name: String,
    /// Absolute directory.
    pub dir: PathBuf,
    /// Parsed manifest.
    pub manifest: Manifest,
}

impl RestorePoint {
    /// Where the saved copy of `rel` lives.
    #[must_use]
    pub fn stored_path(&self, rel: &str) -> PathBuf {
        self.dir.join(FILES_DIR).join(rel)
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> RestorePointError + '_ {
    move |source| RestorePointError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Sort key putting `-N` collision suffixes after the base name numerically.
fn order_key(name: &str) -> (&str, u32) {
    match name.get(..19) {
        Some(base) => {
            let suffix = name
                .get(19..)
                .and_then(|s| s.strip_prefix('-'))
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            (base, suffix)
        }
        None => (name, 0),
    }
}

/// Move `from` to `to`, creating parents and falling back to copy+remove
/// across filesystems.
pub(crate) fn move_path(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::rename(from, to) {
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            copy_recursive(from, to)?;
            if fs::symlink_metadata(from)?.is_dir() {
                fs::remove_dir_all(from)
            } else {
                fs::remove_file(from)
            }
        }
        other => other,
    }
}

fn copy_recursive(from: &Path, to: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(from)?;
    #[cfg(unix)]
    if meta.file_type().is_symlink() {
        return std::os::unix::fs::symlink(fs::read_link(from)?, to);
    }
    if meta.is_dir() {
        fs::create_dir_all(to)?;
        for entry in fs::read_dir(from)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &to.join(entry.file_name()))?;
        }
        return Ok(());
    }
    fs::copy(from, to).map(|_| ())
}

/// A restore point being filled. Either [`commit`](Self::commit) it or
/// [`rollback`](Self::rollback) to put every moved file back.
#[derive(Debug)]
pub struct PendingPoint {
    name: String,
    dir: PathBuf,
    reason: String,
    created_at: DateTime<Local>,
    moved: Vec<String>,
}

impl PendingPoint {
    /// Move `home/rel` into the point.
    ///
    /// # Errors
    ///
    /// Returns the I/O error of the failed move; nothing is recorded then.
    pub fn stash(&mut self, home: &Path, rel: &str) -> io::Result<()> {
        move_path(&home.join(rel), &self.dir.join(FILES_DIR).join(rel))?;
        self.moved.push(rel.to_string());
        Ok(())
    }

    /// Paths moved so far.
    #[must_use]
    pub fn moved(&self) -> &[String] {
        &self.moved
    }

    /// Directory of the point.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Move everything back to `home` and delete the directory.
    ///
    /// Files that cannot be moved back are left in place (and reported) so
    /// no content is lost.
    #[must_use]
    pub fn rollback(self, home: &Path) -> Vec<String> {
        let mut stranded = Vec::new();
        for rel in self.moved.iter().rev() {
            if move_path(&self.dir.join(FILES_DIR).join(rel), &home.join(rel)).is_err() {
                stranded.push(rel.clone());
            }
        }
        if stranded.is_empty() {
            fs::remove_dir_all(&self.dir).ok();
        }
        stranded
    }

    /// Write the manifest and return the finished point. On failure the
    /// point is still pending and can be rolled back.
    ///
    /// # Errors
    ///
    /// Returns [`RestorePointError`] if the manifest cannot be written.
    pub fn commit(&self) -> Result<RestorePoint, RestorePointError> {
        let manifest = Manifest {
            created_at: self.created_at.to_rfc3339(),
            reason: self.reason.clone(),
            files: self.moved.clone(),
        };
        let path = self.dir.join(MANIFEST);
        let json = serde_json::to_string_pretty(&manifest).map_err(|source| {
            RestorePointError::Manifest {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, json).map_err(io_err(&path))?;
        Ok(RestorePoint {
            name: self.name.clone(),
            dir: self.dir.clone(),
            manifest,
        })
    }
}

/// Store of restore points under one root directory.
#[derive(Debug, Clone)]
pub struct RestorePoints {
    root: PathBuf,
}

impl RestorePoints {
    /// Store rooted at `root` (created lazily).
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Backup root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve a new, uniquely named point directory for `now`.
    ///
    /// # Errors
    ///
    /// Returns [`RestorePointError::Io`] if the directory cannot be created.
    pub fn begin_at(&self, reason: &str, now: DateTime<Local>) -> Result<PendingPoint, RestorePointError> {
        fs::create_dir_all(&self.root).map_err(io_err(&self.root))?;
        let base = now.format(NAME_FORMAT).to_string();
        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                base.clone()
            } else {
                format!("{base}-{attempt}")
            };
            let dir = self.root.join(&name);
            match fs::create_dir(&dir) {
                Ok(()) => {
                    return Ok(PendingPoint {
                        name,
                        dir,
                        reason: reason.to_string(),
                        created_at: now,
                        moved: Vec::new(),
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(source) => return Err(RestorePointError::Io { path: dir, source }),
            }
        }
    }

    /// [`begin_at`](Self::begin_at) the current local time.
    ///
    /// # Errors
    ///
    /// Returns [`RestorePointError::Io`] if the directory cannot be created.
    pub fn begin(&self, reason: &str) -> Result<PendingPoint, RestorePointError> {
        self.begin_at(reason, Local::now())
    }

    fn load(&self, name: &str) -> Result<Option<RestorePoint>, RestorePointError> {
        let dir = self.root.join(name);
        let path = dir.join(MANIFEST);
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(RestorePointError::Io { path, source }),
        };
        let manifest = serde_json::from_str(&text)
            .map_err(|source| RestorePointError::Manifest { path, source })?;
        Ok(Some(RestorePoint {
            name: name.to_string(),
            dir,
            manifest,
        }))
    }

    /// All complete points, newest first. Directories without a manifest
    /// (interrupted runs) are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RestorePointError`] if the root or a manifest is unreadable.
    pub fn list(&self) -> Result<Vec<RestorePoint>, RestorePointError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(RestorePointError::Io {
                    path: self.root.clone(),
                    source,
                });
            }
        };
        let mut points = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_err(&self.root))?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(point) = self.load(&name)? {
                points.push(point);
            }
        }
        points.sort_by(|a, b| order_key(&b.name).cmp(&order_key(&a.name)));
        Ok(points)
    }

    /// Find a point by exact name or unique prefix.
    ///
    /// # Errors
    ///
    /// Returns [`RestorePointError::NotFound`] or
    /// [`RestorePointError::Ambiguous`].
    pub fn get(&self, prefix: &str) -> Result<RestorePoint, RestorePointError> {
        let points = self.list()?;
        if let Some(exact) = points.iter().find(|p| p.name == prefix) {
            return Ok(exact.clone());
        }
        let mut matches: Vec<RestorePoint> = points
            .into_iter()
            .filter(|p| p.name.starts_with(prefix))
            .collect();
        match matches.len() {
            0 => Err(RestorePointError::NotFound(prefix.to_string())),
            1 => Ok(matches.remove(0)),
            _ => Err(RestorePointError::Ambiguous {
                prefix: prefix.to_string(),
                matches: matches
                    .iter()
                    .map(|p| p.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Copy the point's files back into `home`, overwriting what is there.
    /// With a non-empty `only`, just those files. No backup of the
    /// overwritten files is taken.
    ///
    /// # Errors
    ///
    /// Returns [`RestorePointError::MissingFile`] for a requested file the
    /// point does not hold, or [`RestorePointError::Io`] on copy failure.
    pub fn restore(
        &self,
        point: &RestorePoint,
        home: &Path,
        only: &[String],
    ) -> Result<Vec<String>, RestorePointError> {
        if let Some(missing) = only.iter().find(|f| !point.manifest.files.contains(f)) {
            return Err(RestorePointError::MissingFile {
                point: point.name.clone(),
                file: missing.clone(),
            });
        }
        let selected: Vec<String> = point
            .manifest
            .files
            .iter()
            .filter(|f| only.is_empty() || only.contains(f))
            .cloned()
            .collect();
        for rel in &selected {
            let from = point.stored_path(rel);
            let to = home.join(rel);
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent).map_err(io_err(parent))?;
            }
            if fs::symlink_metadata(&to).is_ok_and(|m| m.is_dir() && !m.file_type().is_symlink()) {
                fs::remove_dir_all(&to).map_err(io_err(&to))?;
            } else if fs::symlink_metadata(&to).is_ok() {
                fs::remove_file(&to).map_err(io_err(&to))?;
            }
            copy_recursive(&from, &to).map_err(io_err(&from))?;
        }
        Ok(selected)
    }

    /// Delete a point.
    ///
    /// # Errors
    ///
    /// Returns [`RestorePointError::Io`] if removal fails.
    pub fn delete(&self, point: &RestorePoint) -> Result<(), RestorePointError> {
        fs::remove_dir_all(&point.dir).map_err(io_err(&point.dir))
    }
}
