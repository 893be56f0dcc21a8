//! Command: `schedule [daily|weekly|off]`.
use anyhow::{Context as _, Result};

use super::CommandSetup;
use crate::cli::{ScheduleChoice, ScheduleOpts};
use crate::schedule::{Frequency, Schedule, Scheduler};

/// Run `schedule`.
///
/// # Errors
///
/// Returns an error if the time is out of range or the OS scheduler
/// rejects the change.
pub fn run(setup: &CommandSetup, opts: &ScheduleOpts) -> Result<()> {
    let log = &*setup.ctx.log;
    let exe = std::env::current_exe().context("cannot locate the freckle executable")?;
    let scheduler = Scheduler::new(&setup.ctx, exe.to_string_lossy());
    let frequency = match opts.frequency {
        None => {
            match scheduler.current() {
                Some(schedule) => log.info(&format!("backups run {schedule}")),
                None => log.info("no scheduled backup; enable one with `freckle schedule daily`"),
            }
            return Ok(());
        }
        Some(ScheduleChoice::Off) => {
            if !scheduler.remove()? {
                log.info("no scheduled backup to remove");
            } else if !setup.ctx.dry_run {
                log.info("scheduled backup removed");
            }
            return Ok(());
        }
        Some(ScheduleChoice::Daily) => Frequency::Daily,
        Some(ScheduleChoice::Weekly) => Frequency::Weekly,
    };
    let defaults = setup.ctx.config.schedule;
    let schedule = Schedule::new(
        frequency,
        opts.hour.unwrap_or(defaults.hour),
        opts.minute.unwrap_or(defaults.minute),
    )?;
    scheduler.install(schedule)
}
