//! Bulk Mailer: internal email campaign backend.
//!
//! Loads configuration, seeds the employee directory and serves the
//! management API alongside a Prometheus exporter.

use clap::Parser;
use mailer_audience::{EmployeeDirectory, InMemoryDirectory};
use mailer_core::audit::TracingAuditSink;
use mailer_core::config::AppConfig;
use mailer_management::{management_router, ManagementState};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "bulk-mailer")]
#[command(about = "Internal bulk email campaign backend")]
#[command(version)]
struct Cli {
    /// Config file path without extension
    #[arg(long, env = "BULK_MAILER__CONFIG", default_value = "config/bulk-mailer")]
    config: String,

    /// Bind address (overrides config)
    #[arg(long, env = "BULK_MAILER__API__HOST")]
    host: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "BULK_MAILER__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Employee directory seed file (overrides config)
    #[arg(long, env = "BULK_MAILER__DIRECTORY__SEED_PATH")]
    directory_seed: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "bulk_mailer=info,mailer_management=info,mailer_audience=info,audit=info,tower_http=info".into()
            }),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Bulk Mailer starting up");

    let mut config = AppConfig::load_from(Some(&cli.config)).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(host) = cli.host {
        config.api.host = host;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(path) = cli.directory_seed {
        config.directory.seed_path = Some(path);
    }

    info!(
        host = %config.api.host,
        http_port = config.api.http_port,
        metrics_port = config.metrics.port,
        internal_domains = ?config.sending.internal_domains,
        "Configuration loaded"
    );

    let directory = load_directory(&config)?;
    let state = ManagementState::new(&config, directory, Arc::new(TracingAuditSink));

    if let Err(e) = start_metrics(&config) {
        error!(error = %e, "Failed to start metrics exporter");
    }

    let app = management_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::new(config.api.host.parse()?, config.api.http_port);
    info!(%addr, "Bulk Mailer is ready to serve traffic");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn load_directory(config: &AppConfig) -> anyhow::Result<Arc<dyn EmployeeDirectory>> {
    let directory = match config.directory.seed_path.as_deref() {
        Some(path) => InMemoryDirectory::from_json_file(path)?,
        None => {
            warn!("No directory seed configured; audiences will resolve to nobody");
            InMemoryDirectory::default()
        }
    };
    info!(employees = directory.len(), "Employee directory loaded");
    Ok(Arc::new(directory))
}

/// Install the Prometheus recorder and its scrape listener.
fn start_metrics(config: &AppConfig) -> anyhow::Result<()> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(SocketAddr::new(config.api.host.parse()?, config.metrics.port))
        .install()?;
    info!(port = config.metrics.port, "Metrics exporter started");
    Ok(())
}
