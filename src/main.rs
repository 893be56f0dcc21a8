use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use freckle::cli::{Cli, Command};
use freckle::commands;
use freckle::error::{ConfigError, FreckleError};
use freckle::logging::{self, Log, Logger, Verbosity};

fn main() -> ExitCode {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();
    let verbosity = match &args.command {
        _ if args.verbose => Verbosity::Verbose,
        Command::Backup(opts) if opts.quiet => Verbosity::Quiet,
        _ => Verbosity::Normal,
    };
    let name = args.command.name();
    logging::init_subscriber(verbosity, name);
    let log = Arc::new(Logger::new(name));

    match commands::dispatch(&args.command, &args.global, &log) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&log, &e);
            ExitCode::FAILURE
        }
    }
}

fn report(log: &Logger, error: &anyhow::Error) {
    log.error(&error.to_string());
    for cause in error.chain().skip(1) {
        log.debug(&format!("caused by: {cause}"));
    }
    let hint = error.chain().find_map(|c| {
        c.downcast_ref::<FreckleError>()
            .and_then(FreckleError::hint)
            .or_else(|| {
                c.downcast_ref::<ConfigError>()
                    .map(|_| "fix the file, then run `freckle config check`".to_string())
            })
    });
    if let Some(hint) = hint {
        log.info(&format!("hint: {hint}"));
    }
    if let Some(path) = log.log_path() {
        log.debug(&format!("log: {}", path.display()));
    }
}
