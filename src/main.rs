// Main entry point - Dependency injection and chart driver setup
use std::sync::Arc;

use anyhow::Context;
use chart_datasource_prometheus::application::host::ChartId;
use chart_datasource_prometheus::application::runtime::ChartDriver;
use chart_datasource_prometheus::infrastructure::config::{load_chart_config, DEFAULT_CONFIG_PATH};
use chart_datasource_prometheus::infrastructure::prometheus_client::PrometheusClient;
use chart_datasource_prometheus::presentation::console_chart::ConsoleChart;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let chart_config = load_chart_config(&path)?;

    // Initialize tracing, RUST_LOG wins over the config file
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&chart_config.logging.level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Create query executor (infrastructure layer)
    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    let executor = Arc::new(PrometheusClient::new(http));

    // Create chart host (presentation layer) and its driver (application layer)
    let options = chart_config.into_partial_options();
    let driver = ChartDriver::new(ChartId(1), executor, ConsoleChart::default(), options);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut run = tokio::spawn(driver.run(shutdown_rx));

    println!("Rendering chart from {}, press Ctrl-C to stop", path);
    let chart = tokio::select! {
        finished = &mut run => finished.context("Chart driver panicked")??,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            tracing::info!("Shutting down");
            let _ = shutdown_tx.send(true);
            run.await.context("Chart driver panicked")??
        }
    };
    println!("Stopped after {} render(s)", chart.renders());

    Ok(())
}
