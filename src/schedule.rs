//! Scheduled backups through the OS task scheduler.
//!
//! Linux gets a crontab line tagged with [`CRON_MARKER`]; macOS gets a
//! launchd agent. Both run `freckle backup --quiet`.
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use regex::Regex;

use crate::context::Context;

/// Comment identifying the freckle line in a crontab.
pub const CRON_MARKER: &str = "# freckle-backup";
/// launchd job label.
pub const LAUNCHD_LABEL: &str = "com.freckle.backup";

/// How often the backup runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    /// Every day.
    Daily,
    /// Sundays.
    Weekly,
}

/// When the backup runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Daily or weekly.
    pub frequency: Frequency,
    /// Hour, 0-23.
    pub hour: u8,
    /// Minute, 0-59.
    pub minute: u8,
}

impl Schedule {
    /// Validated schedule.
    ///
    /// # Errors
    ///
    /// Returns an error if `hour` or `minute` is out of range.
    pub fn new(frequency: Frequency, hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 {
            bail!("hour must be 0-23, got {hour}");
        }
        if minute > 59 {
            bail!("minute must be 0-59, got {minute}");
        }
        Ok(Self {
            frequency,
            hour,
            minute,
        })
    }

    /// Crontab entry running `program backup --quiet`.
    #[must_use]
    pub fn cron_line(&self, program: &str) -> String {
        let dow = match self.frequency {
            Frequency::Daily => "*",
            Frequency::Weekly => "0",
        };
        format!(
            "{} {} * * {dow} {} backup --quiet {CRON_MARKER}",
            self.minute,
            self.hour,
            cron_quote(program)
        )
    }

    /// launchd agent definition.
    #[must_use]
    pub fn launchd_plist(&self, program: &str) -> String {
        let weekday = match self.frequency {
            Frequency::Daily => String::new(),
            Frequency::Weekly => "    <key>Weekday</key>\n    <integer>0</integer>\n".to_string(),
        };
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>Label</key>
  <string>{LAUNCHD_LABEL}</string>
  <key>ProgramArguments</key>
  <array>
    <string>{program}</string>
    <string>backup</string>
    <string>--quiet</string>
  </array>
  <key>StartCalendarInterval</key>
  <dict>
{weekday}    <key>Hour</key>
    <integer>{hour}</integer>
    <key>Minute</key>
    <integer>{minute}</integer>
  </dict>
  <key>RunAtLoad</key>
  <false/>
</dict>
</plist>
"#,
            hour = self.hour,
            minute = self.minute,
        )
    }

    /// Parse the schedule back out of a crontab line.
    #[must_use]
    pub fn from_cron_line(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let minute = fields.next()?.parse().ok()?;
        let hour = fields.next()?.parse().ok()?;
        let frequency = match fields.nth(2)? {
            "0" => Frequency::Weekly,
            _ => Frequency::Daily,
        };
        Self::new(frequency, hour, minute).ok()
    }

    /// Parse the schedule back out of a plist written by
    /// [`launchd_plist`](Self::launchd_plist).
    #[must_use]
    pub fn from_plist(text: &str) -> Option<Self> {
        let value = |key: &str| -> Option<u8> {
            let re = Regex::new(&format!(r"<key>{key}</key>\s*<integer>(\d+)</integer>")).ok()?;
            re.captures(text)?.get(1)?.as_str().parse().ok()
        };
        let frequency = if value("Weekday").is_some() {
            Frequency::Weekly
        } else {
            Frequency::Daily
        };
        Self::new(frequency, value("Hour")?, value("Minute")?).ok()
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let when = match self.frequency {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly (Sunday)",
        };
        write!(f, "{when} at {:02}:{:02}", self.hour, self.minute)
    }
}

/// Quote `word` for the shell cron hands the command to. `%` is special
/// to cron itself, even inside quotes.
fn cron_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+:@,=".contains(c));
    if plain {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r"'\''").replace('%', r"\%"))
}

/// Replace any freckle line in `existing` with `line` (or just drop it).
#[must_use]
pub fn merge_crontab(existing: &str, line: Option<&str>) -> String {
    let mut lines: Vec<&str> = existing
        .lines()
        .filter(|l| !l.contains(CRON_MARKER))
        .collect();
    lines.extend(line);
    if lines.is_empty() {
        String::new()
    } else {
        lines.join("\n") + "\n"
    }
}

/// Installs, removes and reports the scheduled backup.
#[derive(Debug)]
pub struct Scheduler<'a> {
    ctx: &'a Context,
    program: String,
}

impl<'a> Scheduler<'a> {
    /// Scheduler invoking `program` (normally the running executable).
    #[must_use]
    pub fn new(ctx: &'a Context, program: impl Into<String>) -> Self {
        Self {
            ctx,
            program: program.into(),
        }
    }

    /// Path of the launchd agent.
    #[must_use]
    pub fn plist_path(&self) -> PathBuf {
        self.ctx
            .home
            .join("Library")
            .join("LaunchAgents")
            .join(format!("{LAUNCHD_LABEL}.plist"))
    }

    /// Scratch file handed to `crontab`, next to the restore points.
    fn crontab_staging(&self) -> PathBuf {
        self.ctx
            .backup_root
            .parent()
            .map_or_else(|| self.ctx.backup_root.clone(), Path::to_path_buf)
            .join("crontab.new")
    }

    fn read_crontab(&self) -> String {
        self.ctx
            .executor
            .run_unchecked("crontab", &["-l"])
            .ok()
            .filter(|r| r.success)
            .map(|r| r.stdout)
            .unwrap_or_default()
    }

    fn write_crontab(&self, content: &str) -> Result<()> {
        let staging = self.crontab_staging();
        if let Some(parent) = staging.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(&staging, content)
            .with_context(|| format!("writing {}", staging.display()))?;
        let result = self
            .ctx
            .executor
            .run("crontab", &[&staging.to_string_lossy()]);
        std::fs::remove_file(&staging).ok();
        result.map(|_| ())
    }

    /// Install (or replace) the scheduled backup.
    ///
    /// # Errors
    ///
    /// Returns an error if the crontab or plist cannot be written or loaded.
    pub fn install(&self, schedule: Schedule) -> Result<()> {
        if self.ctx.platform.is_macos() {
            let path = self.plist_path();
            if self.ctx.dry_run {
                self.ctx
                    .log
                    .dry_run(&format!("would write {} ({schedule})", path.display()));
                return Ok(());
            }
            if path.exists() {
                let unload = self
                    .ctx
                    .executor
                    .run_unchecked("launchctl", &["unload", &path.to_string_lossy()]);
                if let Ok(r) = unload
                    && !r.success
                {
                    self.ctx.log.debug(&format!("launchctl unload: {}", r.stderr.trim()));
                }
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            std::fs::write(&path, schedule.launchd_plist(&self.program))
                .with_context(|| format!("writing {}", path.display()))?;
            self.ctx
                .executor
                .run("launchctl", &["load", &path.to_string_lossy()])?;
        } else {
            let line = schedule.cron_line(&self.program);
            if self.ctx.dry_run {
                self.ctx.log.dry_run(&format!("would install crontab line: {line}"));
                return Ok(());
            }
            let merged = merge_crontab(&self.read_crontab(), Some(&line));
            self.write_crontab(&merged)?;
        }
        self.ctx.log.info(&format!("scheduled backup {schedule}"));
        Ok(())
    }

    /// Remove the scheduled backup. Returns `false` when none was installed.
    ///
    /// # Errors
    ///
    /// Returns an error if the crontab or plist cannot be updated.
    pub fn remove(&self) -> Result<bool> {
        if self.ctx.platform.is_macos() {
            let path = self.plist_path();
            if !path.exists() {
                return Ok(false);
            }
            if self.ctx.dry_run {
                self.ctx.log.dry_run(&format!("would remove {}", path.display()));
                return Ok(true);
            }
            self.ctx
                .executor
                .run_unchecked("launchctl", &["unload", &path.to_string_lossy()])?;
            std::fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
            return Ok(true);
        }
        let existing = self.read_crontab();
        if !existing.contains(CRON_MARKER) {
            return Ok(false);
        }
        if self.ctx.dry_run {
            self.ctx.log.dry_run("would remove the freckle crontab line");
            return Ok(true);
        }
        self.write_crontab(&merge_crontab(&existing, None))?;
        Ok(true)
    }

    /// The installed schedule, if any.
    #[must_use]
    pub fn current(&self) -> Option<Schedule> {
        if self.ctx.platform.is_macos() {
            let text = std::fs::read_to_string(self.plist_path()).ok()?;
            Schedule::from_plist(&text)
        } else {
            self.read_crontab()
                .lines()
                .find(|l| l.contains(CRON_MARKER))
                .and_then(Schedule::from_cron_line)
        }
    }
}
