//! Spin server entry point.

use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use spin_server::api::{create_router, AppState};
use spin_server::config::Config;
use spin_server::metrics;
use spin_server::spinner::{SpinController, SpinPolicy};
use spin_server::utils::shutdown_signal;
use spin_server::ServerError;

/// HTTP fixture that simulates a CPU-busy, time-bounded workload.
#[derive(Parser, Debug)]
#[command(name = "spin-server")]
#[command(about = "Serve /spin and /unspin to simulate a busy workload")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port (overrides PORT).
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// What a new spin does with earlier tasks: accumulate or replace (overrides SPIN_POLICY).
    #[arg(long, global = true)]
    policy: Option<SpinPolicy>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the server (default).
    Run,

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration before logging so VERBOSE and RUST_LOG apply
    let config = load_config(&args)?;

    // Initialize logging
    let filter = if config.verbose {
        EnvFilter::new("spin_server=debug,info")
    } else {
        EnvFilter::try_new(&config.rust_log).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(config.log_json.then(|| fmt::layer().json()))
        .with((!config.log_json).then(|| fmt::layer()))
        .with(filter)
        .init();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(&config),
        Some(Command::Run) | None => cmd_run(config).await,
    }
}

/// Load configuration from the environment and apply CLI overrides.
fn load_config(args: &Args) -> Result<Config, ServerError> {
    let mut config = Config::load()?;

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(policy) = args.policy {
        config.spin_policy = policy;
    }
    if args.verbose {
        config.verbose = true;
    }

    Ok(config)
}

/// Check configuration validity.
fn cmd_check_config(config: &Config) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("SPIN SERVER - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Port: {}", config.port);
    println!("  Poll Interval: {}us", config.spin_poll_interval_us);
    println!("  Max Spin Time: {}s", config.max_spin_seconds);
    println!("  Spin Policy: {}", config.spin_policy);
    println!("  Log Filter: {}", config.rust_log);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Serve the spin endpoints until a shutdown signal arrives.
async fn cmd_run(config: Config) -> anyhow::Result<()> {
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(ServerError::InvalidConfig(e).into());
    }

    info!("Configuration loaded successfully");
    info!("Spin policy: {}", config.spin_policy);
    info!("Poll interval: {:?}", config.poll_interval());

    let prometheus = metrics::install_prometheus().map_err(ServerError::from)?;

    let spinner = SpinController::new(&config);
    let app_state = AppState::new(spinner.clone()).with_prometheus(prometheus);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await.map_err(ServerError::from)?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::from)?;

    spinner.shutdown();
    info!("Server stopped");

    Ok(())
}
