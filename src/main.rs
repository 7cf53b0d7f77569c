use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fitbot::bot::{Catalog, ConsoleServer, Dispatcher, MemoryStore};
use fitbot::config::{FitbotConfig, LoggingConfig};
use fitbot::ratelimit::{RateLimiter, Sweeper, SystemClock};

/// Workout and nutrition chat bot.
#[derive(Parser, Debug)]
#[command(name = "fitbot", version, about)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Path to the plan catalog (overrides `bot.catalog_path`)
    #[arg(long)]
    catalog: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = FitbotConfig::load(args.config.as_deref())?;
    if args.log_json {
        config.logging.json = true;
    }

    init_tracing(&config.logging);

    info!("Starting Fitbot");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        capacity = config.limiter.capacity,
        refill_rate = config.limiter.refill_rate,
        "Configuration loaded"
    );

    // Initialize the rate limiter and its sweeper
    let rate_limiter = Arc::new(RateLimiter::with_config(&config.limiter, SystemClock::new())?);
    info!(idle_ttl = ?rate_limiter.idle_ttl(), "Rate limiter initialized");
    let sweeper = Sweeper::spawn(rate_limiter.clone(), config.limiter.sweep_interval());

    let catalog = match args.catalog.or(config.bot.catalog_path) {
        Some(path) => Catalog::from_file(path)?,
        None => {
            warn!("No plan catalog configured; plans will only contain defaults");
            Catalog::default()
        }
    };

    let dispatcher = Dispatcher::new(rate_limiter, Arc::new(MemoryStore::new()), Arc::new(catalog));
    let console = ConsoleServer::new(Arc::new(dispatcher));

    // Run until EOF or Ctrl+C / SIGTERM
    console.serve_with_shutdown(shutdown_signal()).await?;

    sweeper.shutdown().await;
    info!("Fitbot stopped");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level. Logs go to stderr so they do not mix with replies.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if logging.json {
        builder.json().init();
    } else {
        builder.with_thread_ids(true).init();
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
