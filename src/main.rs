use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::Path;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use triarb_core::config::TriArbConfig;
use triarb_monitoring::prelude::*;
use triarb_scanner::prelude::*;

#[derive(Parser)]
#[command(name = "triarb")]
#[command(about = "A multi-venue triangular arbitrage scanner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan for arbitrage cycles until interrupted
    Run {
        /// Configuration file path; the built-in development venues are used when absent
        #[arg(short, long)]
        config: Option<String>,

        /// Base currency every cycle starts and ends in
        #[arg(long)]
        base: Option<String>,

        /// Maximum number of hops per cycle
        #[arg(long)]
        depth: Option<usize>,

        /// Minimum performance for a chain to be reported
        #[arg(long)]
        min_performance: Option<Decimal>,

        /// Log level
        #[arg(long)]
        log_level: Option<String>,

        /// Print opportunities as JSON instead of CSV rows
        #[arg(long)]
        json: bool,
    },
    /// Print every candidate cycle and exit
    Tree {
        #[arg(short, long)]
        config: Option<String>,

        #[arg(long)]
        base: Option<String>,

        #[arg(long)]
        depth: Option<usize>,
    },
    /// Show version information
    Version,
}

fn load_config(path: Option<&str>) -> anyhow::Result<TriArbConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            TriArbConfig::from_file(Path::new(path))
                .with_context(|| format!("failed to load configuration from {}", path))
        }
        None => Ok(TriArbConfig::development()),
    }
}

fn apply_overrides(config: &mut TriArbConfig, base: Option<String>, depth: Option<usize>) {
    if let Some(base) = base {
        config.scanner.base_currency = base;
    }
    if let Some(depth) = depth {
        config.scanner.depth = depth;
    }
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}

async fn run(config: TriArbConfig, json: bool) -> anyhow::Result<()> {
    config.validate()?;

    let mut monitoring = MonitoringSystem::new(config.monitoring.clone())?;
    monitoring.start().await?;

    let exchanges = simulated_exchanges(&config).await?;
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut engine = build_engine(&config, exchanges.clone(), Some(monitoring.get_metrics_collector()))
        .await?
        .with_events(events_tx);

    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                ScanEvent::Opportunity(chain) if json => match chain.to_json() {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!("Failed to serialize chain {}: {}", chain.id(), e),
                },
                ScanEvent::Opportunity(chain) => println!("{}", chain.row().join(",")),
                ScanEvent::GenerationCompleted(report) => {
                    if let Some(best) = report.best() {
                        info!(
                            "Generation {}: best {} ({:.6})",
                            report.generation,
                            best.path(),
                            best.performance()
                        );
                    }
                }
            }
        }
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown().await;
        let _ = shutdown_tx.send(true);
    });

    engine.run(shutdown_rx).await?;
    drop(engine);

    if let Err(e) = printer.await {
        warn!("Output task failed: {}", e);
    }
    monitoring.stop();

    for venue in exchanges.venues().await {
        if let Some(status) = exchanges.venue_status(&venue).await {
            info!(
                "{}: {} requests, {} errors{}",
                venue,
                status.request_count,
                status.error_count,
                status
                    .last_error
                    .map(|e| format!(" (last: {})", e))
                    .unwrap_or_default()
            );
        }
    }

    info!("triarb shut down successfully");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            base,
            depth,
            min_performance,
            log_level,
            json,
        } => {
            let mut app_config = load_config(config.as_deref())?;

            // Override with CLI options
            apply_overrides(&mut app_config, base, depth);
            if let Some(min_performance) = min_performance {
                app_config.scanner.min_performance = min_performance;
            }
            if let Some(log_level) = log_level {
                app_config.monitoring.log_level = log_level;
            }

            let _guard = setup_logging(&app_config.monitoring)?;
            run(app_config, json).await?;
        }
        Commands::Tree { config, base, depth } => {
            let mut app_config = load_config(config.as_deref())?;
            apply_overrides(&mut app_config, base, depth);
            app_config.validate()?;

            let exchanges = simulated_exchanges(&app_config).await?;
            let tree = build_tree(&app_config, &exchanges).await?;
            print!("{}", tree.describe());
        }
        Commands::Version => {
            println!("triarb v{}", env!("CARGO_PKG_VERSION"));
            println!("A multi-venue triangular arbitrage scanner");
        }
    }

    Ok(())
}
