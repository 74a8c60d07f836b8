//! Control relay entry point.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use control_relay::api::{create_router, AppState};
use control_relay::config::{ComputeMode, Config};
use control_relay::estimator::estimate;
use control_relay::metrics;
use control_relay::model::ControlRequest;
use control_relay::utils::shutdown_signal;

/// HTTP relay and parameter-sweep service for adaptive control computations.
#[derive(Parser, Debug)]
#[command(name = "control-relay")]
#[command(about = "Relays control computations upstream and runs parameter sweeps")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve {
        /// HTTP server port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,

        /// Answer with the offline estimator instead of relaying upstream.
        #[arg(long)]
        offline: bool,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Run the offline estimator on a JSON request file.
    Estimate {
        /// Path to a JSON-encoded control request.
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Configuration decides log format, so load it before logging
    let config = Config::load();
    let (verbose, log_json) = match &config {
        Ok(c) => (args.verbose || c.verbose, c.log_json),
        Err(_) => (args.verbose, false),
    };
    init_logging(verbose, log_json);

    // Handle subcommands
    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(config),
        Some(Command::Estimate { file }) => cmd_estimate(&file).await,
        Some(Command::Serve { port, offline }) => cmd_serve(config, port.or(args.port), offline).await,
        None => cmd_serve(config, args.port, false).await,
    }
}

fn init_logging(verbose: bool, log_json: bool) {
    let filter = if verbose {
        EnvFilter::new("control_relay=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let (plain, json) = if log_json {
        (None, Some(fmt::layer().json()))
    } else {
        (Some(fmt::layer()), None)
    };

    tracing_subscriber::registry()
        .with(plain)
        .with(json)
        .with(filter)
        .init();
}

/// Check configuration validity.
fn cmd_check_config(config: Result<Config, envy::Error>) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("CONTROL RELAY - CONFIGURATION CHECK");
    println!("======================================================================");

    // Load configuration
    print!("Loading configuration... ");
    let config = match config {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    // Validate configuration
    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    // Check static assets
    let index = Path::new(&config.static_dir).join("index.html");
    print!("Checking frontend... ");
    if index.is_file() {
        println!("OK");
    } else {
        println!("MISSING");
        println!("  {} not found; / will serve a placeholder page", index.display());
    }

    // Show configuration summary
    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Port: {}", config.port);
    println!("  Compute Mode: {}", config.compute_mode.trim());
    println!("  Sweep Failure Policy: {}", config.sweep_failure_policy.trim());
    println!("  Upstream Timeout: {}s", config.upstream_timeout_secs);
    println!("  Static Dir: {}", config.static_dir);
    println!("  Metrics: {}", if config.metrics_enabled { "Enabled" } else { "Disabled" });
    println!("  Log Format: {}", if config.log_json { "JSON" } else { "Text" });
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Estimate a single request offline and print the result.
async fn cmd_estimate(file: &Path) -> anyhow::Result<()> {
    let body = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let request = ControlRequest::parse(&body)?;

    let result = estimate(&request)?.into_result();
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

/// Run the HTTP server until a shutdown signal arrives.
async fn cmd_serve(
    config: Result<Config, envy::Error>,
    port_override: Option<u16>,
    offline: bool,
) -> anyhow::Result<()> {
    // Load configuration
    info!("Loading configuration...");
    let mut config = config.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    // Override with CLI args if provided
    if let Some(port) = port_override {
        config.port = port;
    }
    if offline {
        config.compute_mode = ComputeMode::Offline.to_string();
    }

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    let mut app_state = AppState::from_config(&config)?;

    if config.metrics_enabled {
        match metrics::install_prometheus() {
            Ok(handle) => app_state = app_state.with_metrics(handle),
            Err(e) => warn!("Metrics disabled, recorder install failed: {}", e),
        }
    }

    info!("Configuration loaded successfully");
    info!("Compute mode: {}", app_state.mode);
    info!("Sweep failure policy: {}", app_state.policy);
    info!("Upstream timeout: {}s", config.upstream_timeout_secs);

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
