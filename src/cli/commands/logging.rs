//! Log verbosity and output format.

use clap::{Arg, ArgAction, Command, builder::ValueParser};

use crate::cli::telemetry::LogFormat;

pub const ARG_VERBOSITY: &str = "verbosity";
pub const ARG_LOG_FORMAT: &str = "log-format";

/// Level names in verbosity order; the index is the `-v` count.
const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accept a level name or its `-v` count from the environment.
fn parse_level(level: &str) -> Result<u8, String> {
    let level = level.trim();
    let index = match level.parse::<usize>() {
        Ok(count) => Some(count).filter(|count| *count < LEVELS.len()),
        Err(_) => LEVELS
            .iter()
            .position(|name| name.eq_ignore_ascii_case(level)),
    };
    index
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| format!("invalid log level '{level}', expected one of {LEVELS:?}"))
}

fn parse_format(format: &str) -> Result<LogFormat, String> {
    format.parse()
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VERBOSITY)
                .short('v')
                .long("verbose")
                .help("Raise log verbosity: -v warn, -vv info, -vvv debug, -vvvv trace")
                .env("ACCOUNT_PORTAL_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(ValueParser::from(parse_level)),
        )
        .arg(
            Arg::new(ARG_LOG_FORMAT)
                .long(ARG_LOG_FORMAT)
                .help("Log output: pretty for terminals, json for log shippers")
                .env("ACCOUNT_PORTAL_LOG_FORMAT")
                .default_value("pretty")
                .value_parser(ValueParser::from(parse_format)),
        )
}
