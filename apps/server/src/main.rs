//! # Factura Server
//!
//! ```bash
//! factura-server --config ./factura.toml
//! FACTURA_CONFIG=./factura.toml RUST_LOG=debug factura-server
//! ```

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use factura_db::{Database, DbConfig};
use factura_invoice::SmtpMailer;
use factura_server::{router, AppConfig, AppState};

#[derive(Debug, Parser)]
#[command(name = "factura-server", about = "Point of sale and invoicing service")]
struct Args {
    /// Config file path
    #[arg(short, long, env = "FACTURA_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = AppConfig::load(args.config).context("Failed to load configuration")?;

    info!(
        bind = %config.server.bind_address(),
        database = %config.database.path.display(),
        delivery = %config.invoice.delivery,
        tax_rate = %config.invoice.tax_rate().label(),
        "Starting Factura server"
    );

    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let db = Database::new(
        DbConfig::new(&config.database.path).max_connections(config.database.max_connections),
    )
    .await
    .context("Failed to open database")?;

    let mailer = SmtpMailer::new(config.smtp.clone())
        .context("Invalid SMTP settings (is smtp.from / FACTURA_SMTP_FROM set?)")?;

    let addr = config.server.bind_address();
    let (state, worker, queue) = AppState::build(db.clone(), config, Arc::new(mailer));

    // Before accepting requests, so the sweep never sees a fresh sale
    match worker.recover_pending().await {
        Ok(0) => {}
        Ok(count) => info!(count, "Pending invoices processed"),
        Err(e) => warn!(error = %e, "Pending invoice sweep failed"),
    }
    let worker_task = tokio::spawn(worker.run());

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    queue.shutdown().await;
    if let Err(e) = worker_task.await {
        warn!(error = %e, "Invoice worker task failed");
    }
    db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,factura=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
