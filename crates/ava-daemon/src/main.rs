use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use ava_adapters::AdapterRegistry;
use ava_core::{AvaConfig, AvaError};
use ava_daemon::{interrupt_signal, Daemon};
use ava_plugins::PluginRegistry;

/// Filter used with `--debug` / `DEBUG` when `RUST_LOG` is not set.
const DEBUG_FILTER: &str = "ava=debug,ava_core=debug,ava_adapters=debug,ava_plugins=debug,ava_daemon=debug";
const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Parser)]
#[command(name = "ava", version, about = "Route chat messages through sandboxed plugins")]
struct Cli {
    /// Config file. Defaults to ava.yml, ava.yaml or ava.toml in the working directory.
    #[arg(short, long, env = "AVA_CONFIG")]
    config: Option<String>,

    /// Enable debug logging (also enabled by a non-empty DEBUG env var).
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let debug = cli.debug || std::env::var_os("DEBUG").is_some_and(|v| !v.is_empty());

    let default_filter = if debug { DEBUG_FILTER } else { DEFAULT_FILTER };

    // Logs go to stderr: stdout belongs to the shell adapter.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(cli));
    // A blocking stdin read cannot be cancelled; do not wait for it.
    runtime.shutdown_timeout(Duration::from_millis(500));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = error_code(&e), "{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Code of the startup error behind `e`, if there is one.
fn error_code(e: &anyhow::Error) -> &'static str {
    e.downcast_ref::<AvaError>().map_or("INTERNAL_ERROR", AvaError::code)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // load config: --config / AVA_CONFIG > ava.yml > ava.yaml > ava.toml
    let config = AvaConfig::load(cli.config.as_deref()).context("loading configuration")?;
    info!(
        adapters = config.adapters.len(),
        plugins = config.plugins.len(),
        "configuration loaded"
    );

    let daemon = Daemon::load(
        &config,
        &AdapterRegistry::with_builtins(),
        &PluginRegistry::with_builtins(),
    )
    .await?;

    let report = daemon.run(interrupt_signal()).await?;
    info!(
        workers = report.workers,
        teardown_failures = report.teardown_failures,
        "bye"
    );
    Ok(())
}
