//! Command: `restore`.
use anyhow::Result;

use super::CommandSetup;
use crate::cli::RestoreOpts;
use crate::manager::paths::home_relative_all;
use crate::restore::RestorePoint;

/// Run `restore`.
///
/// # Errors
///
/// Returns an error if the point does not exist, the prefix is ambiguous,
/// or a file cannot be copied back.
pub fn run(setup: &CommandSetup, opts: &RestoreOpts) -> Result<()> {
    let log = &*setup.ctx.log;
    let points = setup.ctx.restore_points();
    if opts.list {
        let all = points.list()?;
        if all.is_empty() {
            log.info(&format!("no restore points in {}", points.root().display()));
        }
        for point in &all {
            log.info(&render_point(point));
        }
        return Ok(());
    }

    let Some(name) = &opts.point else {
        anyhow::bail!("name a restore point or pass --list");
    };
    let point = points.get(name)?;

    if opts.delete {
        if setup.ctx.dry_run {
            log.dry_run(&format!("would delete restore point {}", point.name));
        } else {
            points.delete(&point)?;
            log.info(&format!("deleted restore point {}", point.name));
        }
        return Ok(());
    }

    let cwd = std::env::current_dir()?;
    let only = home_relative_all(&opts.files, &setup.ctx.home, &cwd)?;
    if setup.ctx.dry_run {
        let files = if only.is_empty() { &point.manifest.files } else { &only };
        for file in files {
            log.dry_run(&format!("would restore ~/{file} from {}", point.name));
        }
        return Ok(());
    }
    let restored = points.restore(&point, &setup.ctx.home, &only)?;
    for file in &restored {
        log.info(&format!("restored ~/{file}"));
    }
    Ok(())
}

fn render_point(point: &RestorePoint) -> String {
    format!(
        "{}  {} file(s)  {}",
        point.name,
        point.manifest.files.len(),
        point.manifest.reason
    )
}
