// src/cli.rs

//! CLI argument parsing using `clap`.

use std::net::SocketAddr;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `calcdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "calcdag",
    version,
    about = "Evaluate arithmetic expressions as task graphs on a pool of workers.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// If omitted, `Calcdag.toml` in the current working directory is used
    /// when it exists, and built-in defaults otherwise.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CALCDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the orchestrator: HTTP API plus the lease sweeper.
    Serve {
        /// Address to listen on (overrides `[orchestrator].bind`).
        #[arg(long, value_name = "ADDR")]
        bind: Option<SocketAddr>,

        /// Also run this many workers inside the orchestrator process.
        #[arg(long, value_name = "N", default_value_t = 0)]
        local_workers: usize,
    },

    /// Run a worker agent against a remote orchestrator.
    Agent {
        /// Orchestrator base URL (overrides `[agent].orchestrator_url`).
        #[arg(long, value_name = "URL")]
        orchestrator: Option<String>,

        /// Number of concurrent workers (overrides `[agent].computing_power`).
        #[arg(long, value_name = "N")]
        computing_power: Option<usize>,
    },

    /// Compile an expression and print its task graph without running it.
    Check {
        /// Expression to compile, e.g. "(2+3)*(4-1)".
        expression: String,
    },
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
