// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `freshrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "freshrun",
    version,
    about = "Watch a source tree and re-run format/test/build/run on every change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Only run the project with this name.
    #[arg(long, value_name = "NAME")]
    pub project: Option<String>,

    /// Force the polling watch strategy regardless of `[settings].mode`.
    #[arg(long)]
    pub poll: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FRESHRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the resolved projects, but don't watch or run anything.
    #[arg(long)]
    pub dry_run: bool,
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
