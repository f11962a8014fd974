//! datacopy CLI - copy a data set between databases, XML and spreadsheets.

use clap::{Parser, Subcommand};
use datacopy::{Config, CopyError, Orchestrator, ProgressOutput, Readiness};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "datacopy")]
#[command(about = "Copy a data set between databases, XML documents and spreadsheets")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "datacopy.yaml")]
    config: PathBuf,

    /// Draw a text progress bar (on stderr with --output-json)
    #[arg(long)]
    progress: bool,

    /// Output JSON result to stdout
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
    /// Copy every table from the source to the destination
    Run,

    /// Check that the source can be read and the destination written
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), CopyError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);
    let orchestrator = Orchestrator::new(config)?.with_progress(progress_output(&cli));

    match cli.command {
        Commands::Run => {
            let cancel_token = setup_signal_handler();
            let summary = orchestrator.run(cancel_token).await?;

            if cli.output_json {
                println!("{}", summary.to_json()?);
            } else {
                println!("\nTransfer completed!");
                println!("  Run ID: {}", summary.run_id);
                println!("  Duration: {:.2}s", summary.duration_seconds);
                println!("  Tables: {}", summary.tables);
                println!("  Records: {}", summary.records);
                println!("  Throughput: {} records/sec", summary.records_per_second);
            }
        }

        Commands::Check => {
            let report = orchestrator.check();

            if cli.output_json {
                println!("{}", report.to_json()?);
            } else {
                println!("Readiness:");
                print_readiness("Source", &report.source);
                print_readiness("Destination", &report.destination);
            }

            if !report.is_ready() {
                return Err(CopyError::Config("endpoints are not ready".to_string()));
            }
        }
    }

    Ok(())
}

/// The bar would corrupt JSON on stdout, so it moves to stderr.
fn progress_output(cli: &Cli) -> Option<ProgressOutput> {
    match (cli.progress, cli.output_json) {
        (false, _) => None,
        (true, false) => Some(ProgressOutput::Stdout),
        (true, true) => Some(ProgressOutput::Stderr),
    }
}

fn print_readiness(role: &str, readiness: &Readiness) {
    println!(
        "  {}: {} ({})",
        role,
        if readiness.ready { "READY" } else { "NOT READY" },
        readiness.endpoint
    );
    if let Some(ref reason) = readiness.reason {
        println!("    Reason: {}", reason);
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };
    // RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Cancel the returned token on SIGINT (Ctrl-C) or SIGTERM.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let token = cancel_token.clone();
        tokio::spawn(async move {
            let mut stream = match signal(kind) {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Cannot listen for {}: {}", name, e);
                    return;
                }
            };
            if stream.recv().await.is_some() {
                eprintln!("\nReceived {}. Stopping after the current record...", name);
                token.cancel();
            }
        });
    }

    cancel_token
}

/// Ctrl-C only outside unix.
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                eprintln!("\nReceived Ctrl-C. Stopping after the current record...");
                token.cancel();
            }
            Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
        }
    });

    cancel_token
}
