use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use plcwatch::config::{self, ChartConfigStore, DefaultGenerator, Settings};
use plcwatch::server::{self, AppState};
use plcwatch::{ChartService, InfluxStore, StoreClient};

#[derive(Parser, Debug)]
#[command(name = "plcwatch")]
#[command(about = "Dashboard server for PLC process data stored in InfluxDB")]
struct Args {
    /// Settings file (YAML)
    #[arg(short, long, default_value = "config.yml", env = "PLCWATCH_CONFIG")]
    config: PathBuf,

    /// Chart configuration file, overriding `chart.config_path`
    #[arg(long)]
    chart_config: Option<PathBuf>,

    /// Listen address, overriding `server.hostname`
    #[arg(long)]
    hostname: Option<String>,

    /// Listen port, overriding `server.port`
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory of static dashboard files, overriding `server.public_dir`
    #[arg(long)]
    public_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut settings = Settings::load(&args.config)
        .with_context(|| format!("Failed to load settings from {}", args.config.display()))?;
    if let Some(path) = args.chart_config {
        settings.chart.config_path = path;
    }
    if let Some(hostname) = args.hostname {
        settings.server.hostname = hostname;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if let Some(dir) = args.public_dir {
        settings.server.public_dir = dir;
    }

    let lookback = settings
        .chart
        .probe_lookback()
        .context("Invalid chart.probe_lookback")?;

    let store: Arc<dyn StoreClient> = Arc::new(
        InfluxStore::builder()
            .endpoint(&settings.influxdb.url)
            .org(&settings.influxdb.org)
            .token(&settings.influxdb.token)
            .timeout(settings.chart.query_timeout())
            .parameterized(settings.influxdb.parameterized)
            .build()
            .context("Failed to create InfluxDB client")?,
    );

    match store.ping().await {
        Ok(()) => info!(store = store.description(), "Connected to InfluxDB"),
        Err(e) => warn!(store = store.description(), error = %e, "InfluxDB is not reachable"),
    }

    let chart_config = Arc::new(ChartConfigStore::new(
        &settings.chart.config_path,
        &settings.influxdb.bucket,
    ));
    let generator = DefaultGenerator::new(
        Arc::clone(&store),
        settings.chart.query_builder(&settings.influxdb.bucket),
        lookback,
        settings.chart.query_timeout(),
    )
    .with_concurrency(settings.chart.probe_concurrency);
    config::open(&chart_config, &generator).await;

    let shutdown = CancellationToken::new();
    let service = ChartService::from_settings(store, chart_config, &settings);
    let state = AppState::new(service, settings.chart.live_interval(), shutdown.clone());

    let addr = format!("{}:{}", settings.server.hostname, settings.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        info!("Shutting down");
        signal.cancel();
    });

    server::serve(listener, state, &settings.server.public_dir).await?;
    info!("Server stopped");
    Ok(())
}
