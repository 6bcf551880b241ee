//! nestwatch - Nest thermostat trend monitor.
//!
//! Run with: `cargo run -p nestwatch-service -- run`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use nestwatch_service::{
    CONFIG_ENV_VAR, Config, PushoverNotifier, RunError, Runner, default_config_path, open_store,
};

/// nestwatch - alert on, and stop, HVAC that works against itself.
#[derive(Parser, Debug)]
#[command(name = "nestwatch")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Database path (overrides config).
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// More log output (-v for debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll every thermostat once (default).
    Run,

    /// Poll repeatedly until interrupted.
    Watch {
        /// Seconds between polls (overrides config).
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Print the stored readings of a device as JSON.
    History {
        /// Device ID. Lists devices with history when omitted.
        #[arg(short, long)]
        device: Option<String>,

        /// Drop the device's history instead of printing it.
        #[arg(long, requires = "device")]
        clear: bool,
    },

    /// Validate the configuration file.
    CheckConfig,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose)?;

    let config = load_config(&args)?;

    match args.command {
        Some(Command::Run) | None => run(config).await,
        Some(Command::Watch { interval }) => watch(config, interval).await,
        Some(Command::History { device, clear }) => history(&config, device.as_deref(), clear),
        Some(Command::CheckConfig) => check_config(&args, &config),
    }
}

fn init_tracing(verbose: u8) -> anyhow::Result<()> {
    let default = if verbose > 0 {
        "nestwatch=debug"
    } else {
        "nestwatch=info"
    };
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => EnvFilter::new(default),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    if let Some(db_path) = &args.database {
        config.storage.path = db_path.clone();
    }

    Ok(config)
}

async fn build(config: &Config) -> Result<Runner, RunError> {
    config.validate()?;

    let notifier = Arc::new(PushoverNotifier::new(
        config.pushover.clone(),
        &config.endpoints,
        &config.poll,
    )?);
    Runner::from_config(config, notifier).await
}

async fn run(config: Config) -> anyhow::Result<()> {
    let runner = build(&config).await.inspect_err(|e| error!("{}", e))?;

    match runner.run_once().await {
        Ok(report) => {
            info!(
                "Done: {} devices, {} alerts, {} HVAC shutdowns",
                report.devices.len(),
                report.alerts(),
                report.actuations()
            );
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            runner.report_failure(&e).await;
            Err(e.into())
        }
    }
}

async fn watch(config: Config, interval: Option<u64>) -> anyhow::Result<()> {
    let runner = build(&config).await.inspect_err(|e| error!("{}", e))?;
    let period = interval
        .map(std::time::Duration::from_secs)
        .unwrap_or_else(|| config.poll.interval());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let summary = runner.watch(period, shutdown).await;
    info!(
        "Watch ended: {} cycles, {} failed",
        summary.cycles, summary.failures
    );
    Ok(())
}

fn history(config: &Config, device: Option<&str>, clear: bool) -> anyhow::Result<()> {
    let store = open_store(&config.storage).context("Failed to open history store")?;

    let output = match (device, clear) {
        (Some(device_id), true) => {
            let removed = store.clear(device_id)?;
            println!("Removed {} readings for {}", removed, device_id);
            return Ok(());
        }
        (Some(device_id), false) => serde_json::to_string_pretty(&store.recent(device_id)?)?,
        (None, _) => serde_json::to_string_pretty(&store.devices()?)?,
    };
    println!("{}", output);
    Ok(())
}

fn check_config(args: &Args, config: &Config) -> anyhow::Result<()> {
    let path = args.config.clone().unwrap_or_else(default_config_path);
    config.validate()?;

    println!("Configuration OK: {}", path.display());
    println!("  project:   {}", config.nest.project_id);
    println!(
        "  database:  {} (namespace '{}')",
        config.storage.path.display(),
        config.storage.namespace
    );
    println!("  interval:  {}s", config.poll.interval);
    println!(
        "  confirm:   {}",
        if config.alerts.confirm_actuation {
            "on"
        } else {
            "off"
        }
    );
    Ok(())
}
