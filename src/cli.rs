// src/cli.rs

//! CLI argument parsing for the `runguard` binary.

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::orchestrator::Signal;

/// Command-line arguments for `runguard`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "runguard",
    version,
    about = "Run a command with before/after hooks, signal handlers and orderly shutdown.",
    long_about = None
)]
pub struct CliArgs {
    /// Shell command run before the main command; its failure aborts the run.
    #[arg(long, value_name = "CMD")]
    pub before: Option<String>,

    /// Shell command run after the main command has fully exited.
    #[arg(long, value_name = "CMD")]
    pub after: Option<String>,

    /// Run CMD when SIG is received, e.g. `--on-signal HUP='echo reload'`.
    ///
    /// Without an explicit handler, INT and TERM interrupt the command; the
    /// after command still runs.
    #[arg(long = "on-signal", value_name = "SIG=CMD", value_parser = parse_signal_handler)]
    pub on_signal: Vec<SignalHandlerArg>,

    /// Cancel the main command after this long (`250ms`, `30s`, `5m`, `1h`).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Fail the run if the after command fails.
    #[arg(long)]
    pub strict_after: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RUNGUARD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// The command to supervise.
    #[arg(required = true, trailing_var_arg = true, value_name = "CMD")]
    pub command: Vec<String>,
}

impl CliArgs {
    /// The supervised command as one shell string.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

/// One `--on-signal SIG=CMD` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalHandlerArg {
    pub signal: Signal,
    pub cmd: String,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

pub fn parse_signal_handler(s: &str) -> Result<SignalHandlerArg, String> {
    let (sig, cmd) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SIG=CMD, got '{s}'"))?;
    let signal = sig.parse::<Signal>().map_err(|e| e.to_string())?;
    let cmd = cmd.trim();
    if cmd.is_empty() {
        return Err(format!("empty command for {signal}"));
    }
    Ok(SignalHandlerArg {
        signal,
        cmd: cmd.to_string(),
    })
}

/// Parse a duration like `"3s"`, `"250ms"`, `"1m"` or `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;

    match unit_part.trim().to_lowercase().as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => secs(value, 60),
        "h" => secs(value, 60 * 60),
        unit => Err(format!(
            "unsupported duration unit '{unit}'; expected ms, s, m, or h"
        )),
    }
}

fn secs(value: u64, unit: u64) -> Result<Duration, String> {
    value
        .checked_mul(unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{value}' is too large"))
}
