//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for the proxy executor.

use clap::{Parser, Subcommand};

/// Proxy Executor - lifecycle-managed task dispatch
///
/// Builds a proxy executor for a driver, dispatches work onto the selected
/// executor kind and drains it on stop.
#[derive(Parser, Debug)]
#[command(name = "proxy-executor")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch a batch of sleeping tasks and drain them
    Run {
        /// Path to configuration file
        #[arg(short, long, env = "PROXY_EXECUTOR_CONFIG")]
        config: Option<String>,

        /// Override the executor kind for this run
        #[arg(short, long)]
        executor: Option<String>,

        /// Override the driver name for this run
        #[arg(short, long)]
        driver: Option<String>,

        /// Number of tasks to dispatch
        #[arg(short, long, default_value = "4")]
        tasks: u32,

        /// How long each task sleeps, in milliseconds
        #[arg(long, default_value = "10")]
        task_ms: u64,

        /// Output file for the run summary (JSON, or MessagePack for .msgpack)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// List accepted executor kind names
    Kinds,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}
