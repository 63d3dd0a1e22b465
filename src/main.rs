//! Proxy Executor - lifecycle-managed task dispatch
//!
//! Main entry point for the `proxy-executor` binary. The `run` command builds
//! a proxy for one driver, dispatches a batch of tasks and drains it.

mod cli;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Parser;
use serde::Serialize;
use tracing::{debug, info, warn};

use proxy_executor::config::{self, DispatchConfig};
use proxy_executor::error::{Error, Result};
use proxy_executor::executor::{ExecutorKind, ProxyExecutor, ProxyOptions};
use proxy_executor::logging::{self, LogGuards};
use proxy_executor::util::{dumps, ensure_tree, safe_abs_path};

use crate::cli::{Cli, Commands, ConfigSubcommand};

/// Outcome of one `run` invocation
#[derive(Debug, Serialize)]
struct RunSummary {
    driver: String,
    executor: String,
    ownership: String,
    submitted: u32,
    completed: u64,
    failed: u64,
    elapsed_ms: u64,
}

fn main() {
    if let Err(e) = real_main() {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn real_main() -> Result<()> {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    match cli.command {
        Commands::Kinds => {
            for name in ExecutorKind::accepted_names() {
                println!("{}", name);
            }
            Ok(())
        }
        Commands::Config { subcommand } => {
            // Config commands use minimal logging
            logging::init_simple(tracing::Level::WARN)?;
            handle_config_command(subcommand)
        }
        Commands::Run {
            config,
            executor,
            driver,
            tasks,
            task_ms,
            output,
        } => {
            let mut cfg = DispatchConfig::load(config.as_deref())?;
            if let Some(kind) = executor {
                cfg.dispatch.executor = kind;
            }
            if let Some(name) = driver {
                cfg.dispatch.driver_name = Some(name);
            }

            // The guards must be kept alive for the lifetime of the program
            let _log_guards = init_logging_from_config(&cfg, cli.verbose, cli.quiet)?;

            info!(version = env!("CARGO_PKG_VERSION"), "Starting proxy executor");
            run_dispatch(&cfg, tasks, task_ms, output.as_deref())
        }
    }
}

/// Initialize logging from configuration
fn init_logging_from_config(
    config: &DispatchConfig,
    verbose: u8,
    quiet: bool,
) -> Result<LogGuards> {
    logging::init_logging(&config.logging, verbose, quiet)
}

/// Dispatch `tasks` sleeping tasks through a proxy and drain them
fn run_dispatch(
    config: &DispatchConfig,
    tasks: u32,
    task_ms: u64,
    output: Option<&str>,
) -> Result<()> {
    let driver_name = config.dispatch.driver_name();
    let proxy = ProxyExecutor::build(&driver_name, ProxyOptions::from_settings(&config.dispatch))?;

    let began = Instant::now();
    proxy.start()?;

    let mut futures = Vec::with_capacity(tasks as usize);
    for index in 0..tasks {
        let future = proxy.submit(move || {
            std::thread::sleep(Duration::from_millis(task_ms));
            index
        })?;
        debug!(driver = %driver_name, task = index, "Task dispatched");
        futures.push(future);
    }

    info!(
        driver = %driver_name,
        in_flight = proxy.in_flight(),
        "Dispatch complete, draining"
    );
    proxy.stop();

    for future in &futures {
        if let Some(err) = future.error() {
            warn!(driver = %driver_name, error = %err, "Task failed");
        }
    }

    let tracker = proxy.tracker();
    let summary = RunSummary {
        driver: driver_name.clone(),
        executor: ExecutorKind::resolve(&config.dispatch.executor)?.name().to_string(),
        ownership: format!("{:?}", proxy.ownership()).to_lowercase(),
        submitted: tasks,
        completed: tracker.total_completed(),
        failed: tracker.total_failed(),
        elapsed_ms: began.elapsed().as_millis() as u64,
    };

    println!();
    println!("Dispatch Summary ({}):", summary.driver);
    println!("  Executor:   {} ({})", summary.executor, summary.ownership);
    println!("  Submitted:  {}", summary.submitted);
    println!("  Completed:  {}", summary.completed);
    println!("  Failed:     {}", summary.failed);
    println!("  Duration:   {}ms", summary.elapsed_ms);

    if let Some(path) = output {
        let path = resolve_output_path(config, path)?;
        write_summary(&summary, &path)?;
        println!("  Summary saved to: {}", path.display());
    }

    Ok(())
}

/// Absolute paths are used as given; relative ones must stay under the data directory
fn resolve_output_path(config: &DispatchConfig, path: &str) -> Result<PathBuf> {
    if Path::new(path).is_absolute() {
        return Ok(PathBuf::from(path));
    }
    safe_abs_path(config.data_dir(), &[path])
}

fn write_summary(summary: &RunSummary, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_tree(parent)?;
    }

    let bytes = match path.extension().and_then(|e| e.to_str()) {
        Some("msgpack") => dumps(summary)?,
        _ => serde_json::to_vec_pretty(summary)?,
    };

    fs::write(path, bytes).map_err(|e| Error::IoWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!(path = %path.display(), "Run summary written");
    Ok(())
}

/// Handle configuration subcommands
fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = DispatchConfig::load(config.as_deref())?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let created = config::init_config(path.as_deref(), force)?;
            println!("Configuration written to {}", created.display());
        }
        ConfigSubcommand::Validate { config } => {
            DispatchConfig::load(config.as_deref())?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
