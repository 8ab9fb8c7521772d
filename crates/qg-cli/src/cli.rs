//! Argument definitions

use chrono::{DateTime, Utc};
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

/// Default location of the tracker state file
pub const DEFAULT_STATE_PATH: &str = ".qgate/state.json";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

/// Build the `qgate` command tree
#[must_use]
pub fn command() -> Command {
    Command::new("qgate")
        .version(env!("CARGO_PKG_VERSION"))
        .about("CI test-quality gate")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Gate configuration file (TOML)"),
        )
        .arg(
            Arg::new("state")
                .long("state")
                .global(true)
                .default_value(DEFAULT_STATE_PATH)
                .value_parser(value_parser!(PathBuf))
                .help("Flake history state file (JSON)"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .default_value("text")
                .value_parser(value_parser!(LogFormat))
                .help("Log output format"),
        )
        .subcommand(
            Command::new("evaluate")
                .about("Ingest one stage report, record it and evaluate the gate")
                .arg(
                    Arg::new("report")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Report file, or - for stdin"),
                )
                .arg(dry_run())
                .arg(json()),
        )
        .subcommand(
            Command::new("pipeline")
                .about("Evaluate reports as consecutive stages, stopping at the first failure")
                .arg(
                    Arg::new("reports")
                        .required(true)
                        .num_args(1..)
                        .value_parser(value_parser!(PathBuf))
                        .help("Report files in stage order"),
                )
                .arg(dry_run())
                .arg(json()),
        )
        .subcommand(
            Command::new("quarantine")
                .about("Quarantine a flaky test")
                .arg(test_arg())
                .arg(
                    Arg::new("owner")
                        .long("owner")
                        .help("Person or team responsible for the fix"),
                )
                .arg(
                    Arg::new("ticket")
                        .long("ticket")
                        .help("Tracking ticket"),
                )
                .arg(
                    Arg::new("expires")
                        .long("expires")
                        .value_parser(parse_timestamp)
                        .conflicts_with("days")
                        .help("Expiry as an RFC 3339 timestamp"),
                )
                .arg(
                    Arg::new("days")
                        .long("days")
                        .value_parser(value_parser!(u32).range(1..))
                        .help("Expiry as a number of days from now"),
                ),
        )
        .subcommand(
            Command::new("release")
                .about("Resolve a quarantine")
                .arg(test_arg()),
        )
        .subcommand(
            Command::new("sweep")
                .about("Expire overdue quarantines and print escalations")
                .arg(json()),
        )
        .subcommand(
            Command::new("status")
                .about("Print the weekly flake rate and per-test classification")
                .arg(json()),
        )
}

fn test_arg() -> Arg {
    Arg::new("test")
        .long("test")
        .required(true)
        .help("Test identifier")
}

fn dry_run() -> Arg {
    Arg::new("dry-run")
        .long("dry-run")
        .action(ArgAction::SetTrue)
        .help("Evaluate without updating flake history")
}

fn json() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON")
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}
