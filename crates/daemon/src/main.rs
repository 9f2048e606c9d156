//! Treeserve Daemon
//!
//! Serves a local or FTP-hosted file tree over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use daemon::config::{BackendKind, Config};
use daemon::routes;
use vfs::{Backend, FtpBackend, FtpSession, LocalBackend};

/// Treeserve daemon - browse and download a remote file tree over HTTP.
#[derive(Parser, Debug)]
#[command(name = "treeserve")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for the daemon.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start serving the configured tree
    Serve,

    /// Validate the configuration and exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default()?
    };

    // Apply environment variable overrides
    config.apply_env_overrides();

    // Initialize tracing
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.daemon.log_level.clone()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Treeserve daemon starting...");

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::CheckConfig => {
            println!("Configuration OK");
            println!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    // Construct the backend; the FTP session is kept for shutdown teardown.
    let (backend, ftp_session): (Arc<dyn Backend>, Option<FtpSession>) = match config.backend.kind
    {
        BackendKind::Local => {
            let root = &config.backend.local.root;
            tracing::info!(root = %root.display(), "serving local tree");
            (Arc::new(LocalBackend::new(root)), None)
        }
        BackendKind::Ftp => {
            let ftp_config = config.backend.ftp.to_vfs_config();
            tracing::info!(host = %ftp_config.host, port = ftp_config.port, "connecting FTP session");
            let session = FtpSession::connect(&ftp_config).await?;
            let backend = FtpBackend::new(session.clone(), ftp_config.base_dir.clone());
            (Arc::new(backend), Some(session))
        }
    };

    let app = routes::router(backend);
    let listener = tokio::net::TcpListener::bind(&config.daemon.listen_addr).await?;
    tracing::info!(addr = %config.daemon.listen_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(session) = ftp_session {
        if let Err(e) = session.quit().await {
            tracing::warn!(error = %e, "FTP session teardown failed");
        }
    }

    tracing::info!("Treeserve daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown signal handler");
        return;
    }
    tracing::info!("shutdown signal received");
}
