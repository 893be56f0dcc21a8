//! User-supplied path normalisation.
use std::path::{Component, Path, PathBuf};

use crate::error::FreckleError;

/// Drop `.` and fold `..` without touching the filesystem, so paths to
/// files that do not exist (yet) still normalise.
fn lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve `raw` to a `/`-separated path relative to `home`.
///
/// Accepts `~`-prefixed, absolute and relative paths. A relative path is
/// taken from `cwd` when it exists there, otherwise from `home`.
///
/// # Errors
///
/// Returns [`FreckleError::OutsideHome`] when the result is not strictly
/// inside `home`.
pub fn home_relative(raw: &str, home: &Path, cwd: &Path) -> Result<String, FreckleError> {
    let candidate = if raw == "~" {
        home.to_path_buf()
    } else if let Some(rest) = raw.strip_prefix("~/") {
        home.join(rest)
    } else if Path::new(raw).is_absolute() {
        PathBuf::from(raw)
    } else if cwd.join(raw).symlink_metadata().is_ok() {
        cwd.join(raw)
    } else {
        home.join(raw)
    };
    let normalised = lexical(&candidate);
    let relative = normalised
        .strip_prefix(lexical(home))
        .map_err(|_| FreckleError::OutsideHome(raw.to_string()))?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if parts.is_empty() {
        return Err(FreckleError::OutsideHome(raw.to_string()));
    }
    Ok(parts.join("/"))
}

/// Normalise every path, failing on the first one outside `home`.
///
/// # Errors
///
/// Returns [`FreckleError::OutsideHome`] for the first offending path.
pub fn home_relative_all(
    raws: &[String],
    home: &Path,
    cwd: &Path,
) -> Result<Vec<String>, FreckleError> {
    raws.iter().map(|raw| home_relative(raw, home, cwd)).collect()
}
