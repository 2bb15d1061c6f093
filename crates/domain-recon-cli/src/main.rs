//! domain-recon CLI - reconcile materialized organization domains against their source.

use clap::{Parser, Subcommand};
use domain_recon::{Config, Coordinator, PgStores, ReconError, RunStatus};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "domain-recon")]
#[command(about = "Reconcile materialized organization email domains against their source tables")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON run summary to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a reconciliation pass
    Run {
        /// Override number of parallel workers
        #[arg(long)]
        workers: Option<usize>,

        /// Override directory result files are written to
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Test source and target store connections
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, ReconError> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli.verbosity, &cli.log_format).map_err(ReconError::Config)?;

    // Load configuration
    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    // Setup signal handling (SIGINT and SIGTERM)
    let cancel_token = setup_signal_handler().await;

    match cli.command {
        Commands::Run {
            workers,
            output_dir,
        } => {
            // Apply overrides before auto-tuning so pool sizes follow
            // the effective worker count, then re-validate them.
            if let Some(w) = workers {
                config.recon.workers = Some(w);
            }
            if let Some(dir) = output_dir {
                config.recon.output_dir = Some(dir);
            }
            config.validate()?;
            let config = config.with_auto_tuning();

            println!("Starting at: {}", chrono_now());

            // Pool construction probes both stores; an unreachable
            // store aborts before any records are tested.
            let stores = Arc::new(PgStores::connect(&config).await?);
            let coordinator = Coordinator::new(config, stores);
            let summary = coordinator.run(cancel_token).await?;

            println!("Ending at: {}", chrono_now());

            if cli.output_json {
                println!("{}", summary.to_json()?);
            } else {
                println!("\nReconciliation {:?}", summary.status);
                println!("  Run ID: {}", summary.run_id);
                println!("  Duration: {:.2}s", summary.duration_seconds);
                println!("  Records: {}/{}", summary.rows_tested, summary.rows_total);
                println!("  Discrepancies: {}", summary.discrepancies);
                if summary.ranges_failed > 0 {
                    println!(
                        "  Failed ranges: {}/{} (see log for diagnostics)",
                        summary.ranges_failed, summary.ranges_total
                    );
                }
            }

            // Partial failure gets its own exit status; an interrupted
            // run still exits 0, the summary carries the status.
            if summary.status == RunStatus::Failed {
                return Ok(ExitCode::from(2));
            }
        }

        Commands::HealthCheck => {
            use domain_recon::StoreConnector;

            let config = config.with_auto_tuning();
            let stores = PgStores::connect(&config).await?;
            stores.health_check().await?;
            println!("Source and target stores are reachable");
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn chrono_now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f %Z").to_string()
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// Setup signal handlers for interrupting the coordinator's wait.
/// Handles both SIGINT (Ctrl-C) and SIGTERM.
#[cfg(unix)]
async fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    let token_int = cancel_token.clone();
    let token_term = cancel_token.clone();

    tokio::spawn(async move {
        let mut sigint = signal(SignalKind::interrupt()).expect("Failed to setup SIGINT handler");
        sigint.recv().await;
        eprintln!("\nReceived SIGINT. Abandoning the wait; in-flight workers run on.");
        token_int.cancel();
    });

    tokio::spawn(async move {
        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");
        sigterm.recv().await;
        eprintln!("\nReceived SIGTERM. Abandoning the wait; in-flight workers run on.");
        token_term.cancel();
    });

    cancel_token
}

/// Setup signal handler for Windows (only SIGINT/Ctrl-C)
#[cfg(not(unix))]
async fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to setup Ctrl-C handler");
        eprintln!("\nReceived Ctrl-C. Abandoning the wait; in-flight workers run on.");
        token.cancel();
    });

    cancel_token
}
