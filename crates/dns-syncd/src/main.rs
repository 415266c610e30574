// # dns-syncd - Azure DNS Sync Daemon
//
// The dns-syncd daemon is a thin integration layer. It is responsible for:
// 1. Parsing command line flags (each with an environment fallback)
// 2. Initializing logging and the runtime
// 3. Authenticating against Azure and loading the entry file
// 4. Driving the sync engine on its schedule until a signal arrives
//
// All reconciliation logic lives in dns-sync-core.
//
// ## Configuration
//
// - `--config` / `DNS_SYNC_CONFIG`: entry file (YAML)
// - `--azure-config` / `DNS_SYNC_AZURE_CONFIG`: service principal file (JSON)
// - `--update-time` / `DNS_SYNC_UPDATE_TIME`: trigger, `@every <duration>`
//
// ## Example
//
// ```bash
// dns-syncd --config /etc/azure-dns-sync/config.yml \
//           --azure-config /etc/kubernetes/azure.json \
//           --update-time "@every 5m" -v
// ```

use anyhow::{Context, Result};
use clap::Parser;
use dns_sync_core::{
    EngineEvent, FailurePolicy, Schedule, Scheduler, SchedulerConfig, SyncConfig, SyncEngine,
};
use dns_sync_provider_azure::{AzureCredentials, AzureDnsClient};
use dns_sync_resolver::HickoryResolverFactory;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (a sync cycle failed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (sync cycle failure)
    RuntimeError = 2,
}

impl From<SyncExitCode> for ExitCode {
    fn from(code: SyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "dns-syncd", version, about = "Syncs resolved hostnames into Azure DNS A records", long_about = None)]
struct Args {
    /// DNS configuration file
    #[arg(long, env = "DNS_SYNC_CONFIG", default_value = "/etc/azure-dns-sync/config.yml")]
    config: PathBuf,

    /// Azure configuration file
    #[arg(long, env = "DNS_SYNC_AZURE_CONFIG", default_value = "/etc/kubernetes/azure.json")]
    azure_config: PathBuf,

    /// Update time
    #[arg(long, env = "DNS_SYNC_UPDATE_TIME", default_value = "@every 10m")]
    update_time: String,

    /// Verbose mode (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Run a single sync cycle and exit
    #[arg(long)]
    once: bool,

    /// Run the first cycle immediately instead of after one interval
    #[arg(long)]
    run_on_start: bool,

    /// Log failed cycles and keep running instead of exiting
    #[arg(long)]
    continue_on_error: bool,

    /// Log intended DNS changes without sending them
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    fn scheduler_config(&self) -> Result<SchedulerConfig> {
        let schedule = Schedule::parse(&self.update_time)
            .with_context(|| format!("invalid --update-time '{}'", self.update_time))?;

        Ok(SchedulerConfig {
            schedule,
            on_failure: if self.continue_on_error {
                FailurePolicy::Continue
            } else {
                FailurePolicy::Exit
            },
            run_on_start: self.run_on_start,
        })
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                SyncExitCode::ConfigError.into()
            } else {
                // --help and --version
                SyncExitCode::CleanShutdown.into()
            };
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    // Check the schedule before touching Azure
    let scheduler_config = match args.scheduler_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return SyncExitCode::ConfigError.into();
        }
    };

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(args, scheduler_config)).into()
}

/// Run the daemon
async fn run_daemon(args: Args, scheduler_config: SchedulerConfig) -> SyncExitCode {
    let engine = match build_engine(&args).await {
        Ok(engine) => engine,
        Err(e) => {
            error!("Startup error: {:#}", e);
            return SyncExitCode::ConfigError;
        }
    };

    if args.once {
        info!("Running a single sync cycle");
        return match engine.run().await {
            Ok(report) => {
                info!("Sync finished, {} record set(s) updated", report.upserted.len());
                SyncExitCode::CleanShutdown
            }
            Err(e) => {
                error!("Sync failed: {}", e);
                SyncExitCode::RuntimeError
            }
        };
    }

    // The scheduler only stops cleanly once this task has sent or dropped
    // the shutdown sender, so its outcome is always ready afterwards
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let signals = tokio::spawn(async move {
        let outcome = wait_for_shutdown().await;
        let _ = shutdown_tx.send(());
        outcome
    });

    info!(
        "Starting {} daemon version {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let scheduler = Scheduler::new(engine, scheduler_config);
    match scheduler.run_until(shutdown_rx).await {
        Ok(summary) => {
            let outcome = signals
                .await
                .unwrap_or_else(|e| Err(anyhow::anyhow!("signal task failed: {}", e)));
            let code = shutdown_exit_code(outcome);

            info!(
                "Shutting down daemon ({} cycle(s) succeeded, {} failed)",
                summary.cycles_succeeded, summary.cycles_failed
            );
            code
        }
        Err(e) => {
            signals.abort();
            error!("Error: {}", e);
            SyncExitCode::RuntimeError
        }
    }
}

/// Exit code for a scheduler stopped by the signal task
fn shutdown_exit_code(signal: Result<&'static str>) -> SyncExitCode {
    match signal {
        Ok(name) => {
            info!("Got signal: {}", name);
            SyncExitCode::CleanShutdown
        }
        Err(e) => {
            error!("Signal handling error: {:#}", e);
            SyncExitCode::RuntimeError
        }
    }
}

/// Authenticate, load the entry file and assemble the engine
async fn build_engine(args: &Args) -> Result<SyncEngine> {
    let credentials = AzureCredentials::from_file(&args.azure_config)
        .with_context(|| format!("reading {}", args.azure_config.display()))?;

    if args.dry_run {
        warn!("Azure DNS client running in DRY-RUN mode - no changes will be made");
    }

    let zone_client = AzureDnsClient::connect(&credentials, args.dry_run)
        .await
        .context("authenticating against Azure")?;

    let resolvers = HickoryResolverFactory::new();
    let config = SyncConfig::load(&args.config, &resolvers)
        .with_context(|| format!("loading {}", args.config.display()))?;

    let (engine, events) = SyncEngine::new(config, Arc::new(zone_client));
    tokio::spawn(log_events(events));

    Ok(engine)
}

/// Drain engine events into the debug log
async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::CycleStarted { entries_count } => {
                debug!("Sync cycle started ({} entries)", entries_count);
            }
            EngineEvent::CycleCompleted { upserted } => {
                debug!("Sync cycle completed ({} upserted)", upserted);
            }
            other => debug!("Engine event: {:?}", other),
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT, SIGHUP)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;
    let mut sighup = signal(SignalKind::hangup())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGHUP handler: {}", e))?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
        _ = sighup.recv() => "SIGHUP",
    };

    Ok(name)
}

/// Wait for shutdown signals (CTRL-C only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
