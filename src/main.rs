//! JobDaemon - single-node job scheduler
//!
//! CLI entry point for inspecting and driving the persisted job state.

use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use jobdaemon::actions::ActionRegistry;
use jobdaemon::cli::{Cli, Command, OutputFormat};
use jobdaemon::config::Config;
use jobdaemon::domain::JobId;
use jobdaemon::engine::Outcome;
use jobdaemon::scheduler::{Scheduler, SchedulerConfig};

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!(
        "JobDaemon loaded config: pool-size={}, data-dir={}",
        config.scheduler.pool_size,
        config.storage.data_dir.display()
    );

    match cli.command {
        Command::Status { format } => cmd_status(&config, format).await,
        Command::Sweep => cmd_sweep(&config).await,
        Command::Run { id } => cmd_run(&config, &id).await,
        Command::Start => cmd_start(&config).await,
    }
}

async fn open_scheduler(config: &Config) -> Result<Scheduler> {
    let scheduler_config = SchedulerConfig::from_config(config);
    let registry = Arc::new(ActionRegistry::standard());
    Scheduler::open(scheduler_config, registry).await
}

/// Show the status ledger and waiting queue
async fn cmd_status(config: &Config, format: OutputFormat) -> Result<()> {
    let scheduler = open_scheduler(config).await?;
    let statuses = scheduler.statuses().await?;
    let waiting = scheduler.waiting().await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "pool_size": scheduler.config().pool_size,
                "admitted": statuses,
                "waiting": waiting,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("JobDaemon Status");
            println!("----------------");
            println!("Admitted: {} / {}", statuses.len(), scheduler.config().pool_size);
            for record in &statuses {
                println!("  {}  {}  {}", record.id, record.action, record.state);
            }
            println!("Waiting: {}", waiting.len());
            for record in &waiting {
                println!("  {}  {}  {}", record.id, record.action, record.state);
            }
        }
    }

    Ok(())
}

/// Run one sweep over the admitted jobs
async fn cmd_sweep(config: &Config) -> Result<()> {
    let scheduler = open_scheduler(config).await?;
    scheduler.sweep().await?;

    let remaining = scheduler.statuses().await?.len();
    println!("Sweep complete, {} task(s) still admitted", remaining);
    Ok(())
}

/// Execute a single task by id
async fn cmd_run(config: &Config, id: &str) -> Result<()> {
    let scheduler = open_scheduler(config).await?;
    let outcome = scheduler.run_task(&JobId::from(id)).await?;

    match outcome {
        Outcome::Finished(value) => println!("finished: {}", value),
        Outcome::Deferred => println!("deferred"),
        Outcome::Failed => println!("failed"),
    }

    Ok(())
}

/// Run the sweep worker in the foreground until Ctrl-C
async fn cmd_start(config: &Config) -> Result<()> {
    let mut scheduler = open_scheduler(config).await?;
    scheduler.start()?;
    println!("Sweep worker running, Ctrl-C to stop");

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;

    println!("Stopping...");
    scheduler.stop().await?;
    Ok(())
}
