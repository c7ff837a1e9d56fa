//! linmon: command-line linearizability monitor.
//!
//! Reads a textual history, dispatches to the datatype's monitor and
//! prints a single result line. Input problems exit non-zero with a
//! diagnostic on stderr; a non-linearizable history is a normal `0`
//! verdict.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use linmon_core::{is_linearizable, DEFAULT_EMPTY_VALUE};

mod reader;

/// Linearizability monitor for set, stack, queue and priority-queue
/// histories.
#[derive(Parser, Debug)]
#[command(name = "linmon", disable_help_flag = true)]
struct Cli {
    /// History file to check.
    path: Option<PathBuf>,

    /// Report the time taken in seconds.
    #[arg(short = 't')]
    time: bool,

    /// Exclude peek operations (chooses the faster algorithm if possible).
    #[arg(short = 'x')]
    exclude_peeks: bool,

    /// Print verbose information (every output column).
    #[arg(short = 'v')]
    verbose: bool,

    /// Include a header row naming each printed column.
    #[arg(short = 'h')]
    headers: bool,

    /// Print usage information.
    #[arg(long = "help", action = ArgAction::Help)]
    help: Option<bool>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(path) = cli.path.as_deref() else {
        eprintln!("missing history file path");
        return ExitCode::FAILURE;
    };

    let parsed = match reader::read_history(path) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let mut history = parsed.history;
    let operations = history.len();
    tracing::debug!(kind = %parsed.kind, operations, "history loaded");

    let started = Instant::now();
    let result = is_linearizable(
        parsed.kind,
        &mut history,
        DEFAULT_EMPTY_VALUE,
        cli.exclude_peeks,
    );
    let elapsed = started.elapsed();

    let show_time = cli.time || cli.verbose;
    let show_operations = cli.verbose;
    let show_exclude_peeks = cli.verbose;

    if cli.headers {
        let mut header = vec!["result"];
        if show_time {
            header.push("time_taken");
        }
        if show_operations {
            header.push("operations");
        }
        if show_exclude_peeks {
            header.push("exclude_peeks");
        }
        println!("{}", header.join(" "));
    }

    let mut row = vec![if result { "1" } else { "0" }.to_string()];
    if show_time {
        row.push(elapsed.as_secs_f64().to_string());
    }
    if show_operations {
        row.push(operations.to_string());
    }
    if show_exclude_peeks {
        row.push(cli.exclude_peeks.to_string());
    }
    println!("{}", row.join(" "));

    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse_independently() {
        let cli = Cli::try_parse_from(["linmon", "-t", "-x", "history.txt"]).unwrap();
        assert!(cli.time);
        assert!(cli.exclude_peeks);
        assert!(!cli.verbose);
        assert!(!cli.headers);
        assert_eq!(cli.path.unwrap(), PathBuf::from("history.txt"));
    }

    #[test]
    fn short_h_means_headers_not_help() {
        let cli = Cli::try_parse_from(["linmon", "-h", "history.txt"]).unwrap();
        assert!(cli.headers);
    }

    #[test]
    fn long_help_is_still_available() {
        let err = Cli::try_parse_from(["linmon", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(Cli::try_parse_from(["linmon", "-q", "history.txt"]).is_err());
    }

    #[test]
    fn path_is_optional_at_parse_time() {
        let cli = Cli::try_parse_from(["linmon"]).unwrap();
        assert!(cli.path.is_none());
    }
}
