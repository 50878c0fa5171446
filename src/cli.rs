// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::dag::ExposedTask;

/// Command-line arguments for `assetflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetflow",
    version,
    about = "Compile, optimize and live-reload static site assets.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run.
    #[arg(value_enum, default_value_t = ExposedTask::Default)]
    pub task: ExposedTask,

    /// Path to the config file (TOML).
    ///
    /// Without this flag `Assetflow.toml` in the current directory is used
    /// when present, otherwise the built-in path table applies.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the path table and task plan without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Override the dev-server port from `[server].port`.
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,
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
