//! Slot Monitor CLI
//!
//! Local execution entry point.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use futures::FutureExt;
use slot_monitor::{
    config::{InputPaths, load_config, load_credentials},
    engine::Engine,
    error::Result,
    models::Config,
    notify::{EmailNotifier, LogNotifier, Notifier},
    pipeline::{Scheduler, StopReason},
    registry::Registry,
    storage::{LocalStore, StatusStore},
};

/// slot-monitor - Appointment Availability Monitor
#[derive(Parser, Debug)]
#[command(
    name = "slot-monitor",
    version,
    about = "Polls appointment providers and reports availability changes"
)]
struct Cli {
    /// Directory with config.toml, websites.json and credentials.json
    #[arg(short, long, default_value = "input")]
    input_dir: PathBuf,

    /// Directory receiving status.json and the archive
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll providers until interrupted
    Run(RunArgs),

    /// Run a single sweep and exit
    Check(RunArgs),

    /// Validate configuration, providers and credentials
    Validate,

    /// Show the statuses in the current snapshot
    Status,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Base seconds between sweeps
    #[arg(long)]
    request_rate: Option<u64>,

    /// Stop after this many sweeps (0 = unbounded)
    #[arg(long)]
    max_sweeps: Option<u64>,

    /// Minutes between liveness messages
    #[arg(long)]
    heartbeat_mins: Option<u64>,

    /// Disable liveness messages
    #[arg(long)]
    no_heartbeat: bool,

    /// Do not keep timestamped copies
    #[arg(long)]
    no_archive: bool,

    /// Log notifications instead of sending email
    #[arg(long)]
    no_notify: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(rate) = self.request_rate {
            config.schedule.request_rate_secs = rate;
        }
        if let Some(max) = self.max_sweeps {
            config.schedule.max_sweeps = max;
        }
        if let Some(mins) = self.heartbeat_mins {
            config.schedule.heartbeat_mins = mins;
        }
        if self.no_heartbeat {
            config.schedule.heartbeat_enabled = false;
        }
        if self.no_archive {
            config.output.archive = false;
        }
        if self.no_notify {
            config.notify.enabled = false;
        }
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Email when enabled, otherwise log only.
fn build_notifier(paths: &InputPaths, config: &Config) -> Result<Box<dyn Notifier>> {
    if !config.notify.enabled {
        log::info!("Notifications disabled, logging only");
        return Ok(Box::new(LogNotifier));
    }
    let credentials = load_credentials(&paths.credentials())?;
    Ok(Box::new(EmailNotifier::new(
        &credentials,
        config.notify.subject.clone(),
    )?))
}

/// Resolves on Ctrl-C. The handler is installed on first poll.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

async fn run(paths: &InputPaths, config: Config) -> Result<()> {
    config.validate()?;
    let registry = Registry::load(&paths.websites())?;
    let notifier = build_notifier(paths, &config)?;

    // Take over Ctrl-C before anything needs tearing down.
    let mut shutdown = std::pin::pin!(interrupted().fuse());
    if shutdown.as_mut().now_or_never().is_some() {
        log::info!("Interrupted before start, exiting");
        return Ok(());
    }

    let startup = config.notify.startup_message;
    let mut engine = Engine::build(config, &registry, notifier).await?;

    let mut scheduler = Scheduler::new(&engine.config().schedule).with_startup_message(startup);
    let result = scheduler.run(&mut engine, shutdown.as_mut()).await;
    engine.shutdown().await;

    match result? {
        StopReason::Interrupted => log::info!("Interrupted, exiting"),
        StopReason::Completed { sweeps } => log::info!("Finished after {sweeps} sweeps"),
    }
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let paths = InputPaths::new(&cli.input_dir);
    let mut config = load_config(&paths.config())?;
    if let Some(dir) = &cli.output_dir {
        config.output.dir = dir.display().to_string();
    }
    log::info!("Loaded configuration from {}", cli.input_dir.display());

    match cli.command {
        Command::Run(args) => {
            args.apply(&mut config);
            run(&paths, config).await?;
        }

        Command::Check(args) => {
            args.apply(&mut config);
            config.schedule.max_sweeps = 1;
            config.notify.startup_message = false;
            run(&paths, config).await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            log::info!("✓ Settings OK");

            let registry = Registry::load(&paths.websites())?;
            log::info!("✓ {} providers OK", registry.len());
            for provider in registry.providers() {
                log::info!("  {} ({})", provider.name, provider.kind());
            }

            if config.notify.enabled {
                let credentials = load_credentials(&paths.credentials())?;
                EmailNotifier::new(&credentials, config.notify.subject.clone())?;
                log::info!("✓ Credentials OK");
            }

            log::info!("All validations passed!");
        }

        Command::Status => {
            let store = LocalStore::from_config(&config.output);
            match store.load_current().await? {
                Some(records) => {
                    for record in records {
                        let since = if record.update_time.is_empty() {
                            "no change seen yet".to_string()
                        } else {
                            format!("since {}", record.update_time)
                        };
                        println!("{:<40} {:<14} {}", record.name, record.status.as_str(), since);
                    }
                }
                None => log::info!("No snapshot found yet."),
            }
        }
    }

    Ok(())
}
