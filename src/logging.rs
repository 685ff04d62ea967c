// src/logging.rs

//! Logging setup for `freshrun` using `tracing` + `tracing-subscriber`.
//!
//! The filter is built from, in order of priority:
//! 1. `--log-level` CLI flag: sets the level for `freshrun` itself
//! 2. `FRESHRUN_LOG`: either a bare level (`debug`), applied to `freshrun`,
//!    or a full `EnvFilter` directive list (`freshrun::watch=trace,info`)
//! 3. `freshrun=info`
//!
//! Unless the directives name them, the watcher backends stay at `warn`.
//! Logs go to STDERR; stdout carries the console echo of pipeline records
//! and worker output.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "FRESHRUN_LOG";

/// Crates whose own logging is capped at `warn` by default.
const QUIET_DEPS: &[&str] = &["notify", "globset"];

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let directives = filter_directives(cli_level, env.as_deref());
    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("invalid {LOG_ENV} directives `{directives}`"))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Directive string for the subscriber's `EnvFilter`.
pub fn filter_directives(cli_level: Option<LogLevel>, env: Option<&str>) -> String {
    let env = env.map(str::trim).filter(|s| !s.is_empty());

    let mut directives = match (cli_level, env) {
        (Some(level), _) => vec![format!("freshrun={}", level_name(level))],
        (None, Some(raw)) => match parse_level_str(raw) {
            Some(level) => vec![format!("freshrun={level}")],
            None => raw.split(',').map(|d| d.trim().to_string()).collect(),
        },
        (None, None) => vec!["freshrun=info".to_string()],
    };

    for dep in QUIET_DEPS {
        if !directives.iter().any(|d| d.starts_with(dep)) {
            directives.push(format!("{dep}=warn"));
        }
    }
    directives.join(",")
}

fn level_name(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

fn parse_level_str(s: &str) -> Option<&'static str> {
    match s.to_lowercase().as_str() {
        "error" => Some("error"),
        "warn" | "warning" => Some("warn"),
        "info" => Some("info"),
        "debug" => Some("debug"),
        "trace" => Some("trace"),
        _ => None,
    }
}
