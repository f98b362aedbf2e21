//! lyricdesk-admin - catalog and account administration service
//!
//! `serve` runs the admin HTTP API; `import` runs one bulk import from a file
//! against the configured backend and prints the summary.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lyricdesk_common::config::{Config, ConfigOverrides};
use lyricdesk_admin::backend::connect;
use lyricdesk_admin::import::{records_from_file, BatchImporter, FileFormat, ImportOptions};
use lyricdesk_admin::{build_router, AppState};
use std::path::PathBuf;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "lyricdesk-admin")]
#[command(about = "Admin service for the LyricDesk song catalog")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Local database file (local backend only)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the admin HTTP API (default)
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Import songs from a CSV or JSON file
    Import {
        /// File to import
        file: PathBuf,

        /// File format; guessed from the extension when omitted
        #[arg(long, value_enum)]
        format: Option<FileFormat>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let command = args.command.unwrap_or(Command::Serve { port: None });

    let overrides = ConfigOverrides {
        config_path: args.config,
        port: match &command {
            Command::Serve { port } => *port,
            Command::Import { .. } => None,
        },
        database_path: args.database,
    };
    let config = Config::load(&overrides).context("Failed to load configuration")?;

    // Initialize tracing subscriber; RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting LyricDesk Admin (lyricdesk-admin) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match command {
        Command::Serve { .. } => serve(config).await,
        Command::Import { file, format } => import(config, file, format).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    let backends = connect(&config.backend)
        .await
        .context("Failed to open backend")?;

    if config.admin_key.is_empty() {
        warn!("API authentication disabled (admin_key is empty)");
    } else {
        info!("✓ Admin key authentication enabled");
    }

    let state = AppState::new(
        backends.catalog,
        backends.identity,
        config.admin_key.clone(),
        config.import.clone(),
    );
    let app = build_router(state);

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("lyricdesk-admin listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn import(config: Config, file: PathBuf, format: Option<FileFormat>) -> Result<()> {
    let format = match format.or_else(|| FileFormat::from_path(&file)) {
        Some(format) => format,
        None => anyhow::bail!(
            "Cannot tell the format of {}; pass --format csv or --format json",
            file.display()
        ),
    };
    let text = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let records = records_from_file(&text, format)?;
    info!(file = %file.display(), %format, records = records.len(), "Importing file");

    let backends = connect(&config.backend)
        .await
        .context("Failed to open backend")?;
    let outcome = BatchImporter::new(&*backends.catalog, ImportOptions::from(&config.import))
        .run(records)
        .await?;

    println!("{}", outcome.summary(config.import.error_preview));
    for skip in &outcome.skipped {
        info!(index = skip.index, reason = %skip.reason, "Skipped");
    }
    for error in &outcome.errors {
        warn!(index = error.index, error = %error.error, "Not imported");
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
