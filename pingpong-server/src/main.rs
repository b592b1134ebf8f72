use anyhow::Context;
use clap::Parser;
use pingpong_core::{LogFormat, LoggingConfig};
use pingpong_server::{create_router, AppConfig, AppState, FeederSystem, Hardware};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Ball feeder controller: camera tracking, servo sweep and HTTP API
#[derive(Parser, Debug)]
#[command(name = "pingpong-server")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the HTTP port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the log filter (e.g. "debug" or "pingpong_motor=trace")
    #[arg(long)]
    log_level: Option<String>,

    /// Use the synthetic camera and the simulated servo
    #[arg(long)]
    simulate: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if cli.simulate {
        config = config.simulated();
    }

    if cli.print_config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    init_tracing(&config.logging, cli.log_level.as_deref());

    info!("🏓 Starting Pingpong Ball Feeder...");
    if config.is_simulated() {
        info!("Running against simulated hardware");
    }

    let hardware = Hardware::from_config(&config).context("Failed to open hardware")?;
    let system = Arc::new(FeederSystem::start(&config, hardware));

    let http_server = start_http_server(&config, system.clone()).await?;
    info!("✅ API listening on http://{}", config.server.bind_address());

    wait_for_shutdown().await;

    info!("🛑 Shutting down...");
    shutdown_gracefully(http_server, system).await;
    info!("👋 Feeder stopped. Goodbye!");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig, level_override: Option<&str>) {
    let filter = match level_override {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level)),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn start_http_server(
    config: &AppConfig,
    system: Arc<FeederSystem>,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let app = create_router(AppState::new(system, config.server.clone()));
    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!("HTTP server error: {}", e);
        }
    }))
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 Shutdown signal received");
}

/// Stop accepting requests, then shut the feeder down in order.
async fn shutdown_gracefully(http_server: tokio::task::JoinHandle<()>, system: Arc<FeederSystem>) {
    info!("🔄 Stopping services...");
    http_server.abort();
    system.shutdown().await;
    info!("✅ All services stopped");
}
