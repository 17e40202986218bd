//! Report API Server
//!
//! Serves snapshot and series biomass reports for uploaded areas of interest.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use report_api::config::{load_pipeline_config, ServiceConfig, DEFAULT_MAX_UPLOAD_BYTES};
use report_api::state::AppState;
use stac_catalog::PLANETARY_COMPUTER_STAC_URL;

/// Report API Server
#[derive(Parser, Debug)]
#[command(name = "report-api")]
#[command(about = "Biomass report server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8000", env = "ECOHUB_LISTEN_ADDR")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "ECOHUB_WORKER_THREADS")]
    worker_threads: Option<usize>,

    /// PostGIS connection string for the reference layers
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// STAC API root
    #[arg(long, default_value = PLANETARY_COMPUTER_STAC_URL, env = "STAC_API_URL")]
    stac_api_url: String,

    /// SAS token endpoint for signing asset hrefs
    #[arg(long, env = "STAC_SAS_URL")]
    stac_sas_url: Option<String>,

    /// Directory for persisted snapshot GeoTIFFs
    #[arg(long, default_value = "./artifacts", env = "ECOHUB_ARTIFACT_DIR")]
    artifact_dir: PathBuf,

    /// Pipeline YAML (time ranges, clip policies, table names)
    #[arg(long, env = "ECOHUB_PIPELINE_CONFIG")]
    pipeline_config: Option<PathBuf>,

    /// Timeout for catalog and asset requests, in seconds
    #[arg(long, default_value_t = 60, env = "ECOHUB_HTTP_TIMEOUT_SECS")]
    http_timeout_secs: u64,

    /// Maximum upload size in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, env = "ECOHUB_MAX_UPLOAD_BYTES")]
    max_upload_bytes: usize,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder
        .build()
        .context("Failed to create Tokio runtime")?;
    runtime.block_on(run_server(args))
}

async fn run_server(args: Args) -> Result<()> {
    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    info!("Starting report API server");

    let config = ServiceConfig {
        stac_sas_url: ServiceConfig::resolve_sas_url(&args.stac_api_url, args.stac_sas_url),
        database_url: args.database_url,
        stac_api_url: args.stac_api_url,
        artifact_dir: args.artifact_dir,
        http_timeout: Duration::from_secs(args.http_timeout_secs),
        max_upload_bytes: args.max_upload_bytes,
        pipeline: load_pipeline_config(args.pipeline_config.as_deref())?,
    };

    let state = Arc::new(AppState::new(&config, prometheus_handle)?);
    let app = report_api::router(state, config.max_upload_bytes);

    let addr: SocketAddr = args.listen.parse().context("Invalid listen address")?;
    info!(address = %addr, "Report API listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    info!("Report API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
