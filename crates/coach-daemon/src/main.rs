//! # coach-daemon
//!
//! Serves `GET/POST {base_path}/data` for the coaching web clients.
//!
//! ```text
//! coach-daemon --config coach.toml
//! coach-daemon --bind 0.0.0.0:8787
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use coach_daemon::{router, DaemonConfig, DaemonState, LogFormat};

/// Coaching data API server.
#[derive(Parser)]
#[command(name = "coach-daemon", about = "Coaching data API server")]
struct Cli {
    /// Path to the daemon config file.
    #[arg(long, default_value = "coach.toml")]
    config: PathBuf,

    /// Listen address, overriding `server.bind`.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = DaemonConfig::load_or_default(&cli.config)?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    init_tracing(config.server.log_format)?;

    tracing::info!("Starting coach daemon");
    tracing::info!("Option store: {}", config.store.dir.display());

    let state = DaemonState::from_config(&config)?;
    let app = router(state, &config.server.base_path);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    tracing::info!(
        "Listening on http://{}{}/data",
        config.server.bind,
        config.server.base_path.trim_end_matches('/')
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Coach daemon shutting down");
    Ok(())
}

fn init_tracing(format: LogFormat) -> Result<()> {
    // Logs go to stderr.
    let filter = EnvFilter::from_default_env()
        .add_directive("coach_daemon=info".parse()?)
        .add_directive("coach_sync=info".parse()?);

    match format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
