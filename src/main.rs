//! `syskit` binary entry point.
use std::io::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::{CommandFactory as _, Parser as _};

use syskit::cli::{Cli, Command, PackagesCommand};
use syskit::commands;
use syskit::logging::{self, Logger};

fn main() -> Result<()> {
    let args = Cli::parse();
    let command = args.command.log_name();

    if let Command::Completions(opts) = &args.command {
        clap_complete::generate(opts.shell, &mut Cli::command(), "syskit", &mut std::io::stdout());
        return Ok(());
    }
    if matches!(args.command, Command::Version) {
        writeln!(std::io::stdout(), "syskit {}", commands::version())?;
        return Ok(());
    }

    logging::init_subscriber(args.verbose, command);
    let log = Arc::new(Logger::new(command));

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;

    match &args.command {
        Command::Install(opts) => commands::install::run(&args.global, opts, &log, interrupted),
        Command::Merge(opts) => commands::merge::run(&args.global, opts, &*log),
        Command::Packages(PackagesCommand::Status(opts)) => {
            commands::packages::status(&args.global, opts, &log)
        }
        Command::Packages(PackagesCommand::Install(opts)) => {
            commands::packages::install(&args.global, opts, &log, interrupted)
        }
        Command::Detect => {
            commands::detect::run(&*log);
            Ok(())
        }
        Command::Completions(_) | Command::Version => Ok(()),
    }
}
