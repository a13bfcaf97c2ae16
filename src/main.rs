mod action;
mod actions;
mod args;
mod attrs;
mod checksum;
mod cli;
mod error;
mod outcome;
mod paths;
mod runner;

use std::io::{self, Read};
use std::process::ExitCode;

use clap::Parser;

use crate::cli::Cli;
use crate::outcome::{EXIT_INTERRUPTED, Outcome};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if cli.list {
        for action in actions::all() {
            println!("{}", action.name());
        }
        return ExitCode::SUCCESS;
    }

    let name = cli.action.unwrap_or_default();
    let Some(action) = actions::lookup(&name) else {
        return emit(&Outcome::fail(format!(
            "the action '{name}' is not supported"
        )));
    };

    // The request document is a single JSON object on stdin. An interrupt
    // while reading terminates the process before any report is written.
    let mut raw = String::new();
    if let Err(err) = io::stdin().read_to_string(&mut raw) {
        if err.kind() == io::ErrorKind::Interrupted {
            return ExitCode::from(EXIT_INTERRUPTED);
        }
        return emit(&Outcome::fail("the input provided could not be parsed"));
    }

    log::debug!("running action '{name}'");
    emit(&action::invoke(action, &raw))
}

/// Write the report to stdout and map the outcome onto the process exit code.
fn emit(outcome: &Outcome) -> ExitCode {
    println!("{}", outcome.render());
    ExitCode::from(outcome.exit_code())
}
