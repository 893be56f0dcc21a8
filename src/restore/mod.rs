//! Restore points and the conflict resolver that fills them.
//!
//! Nothing freckle does overwrites a user file in place: files in the way of
//! a checkout are first moved into a timestamped restore point under
//! `$XDG_DATA_HOME/freckle/backups`, from which `freckle restore` copies
//! them back.
mod conflicts;
mod points;

pub use conflicts::{ConflictResolver, Resolution};
pub use points::{Manifest, PendingPoint, RestorePoint, RestorePoints};
