use agent_metrics::HttpMetricsClient;
use clap::Parser;
use fleet_monitor::{FleetHealthMonitor, FleetStore, MemoryStore};
use overseer_core::{PlatformConfig, BUILD_INFO};
use overseer_platform::{router, AppState, Distributor};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "overseer-platform", version, about = "Overseer control plane")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, env = "OVERSEER_CONFIG", default_value = "overseer.toml")]
    config: PathBuf,

    /// Override the configured listen address
    #[arg(long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = PlatformConfig::load(&args.config)?;
    if let Some(listen) = args.listen {
        config.listen = listen;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting {}", BUILD_INFO);

    let store = Arc::new(MemoryStore::new());
    for record in &config.agents {
        if let Err(e) = store.register_agent(record).await {
            warn!(agent_id = %record.id, error = %e, "Failed to seed agent");
        }
    }

    let source = Arc::new(HttpMetricsClient::from_config(&config.monitor)?);
    let monitor = Arc::new(FleetHealthMonitor::new(
        config.monitor.clone(),
        store.clone(),
        source,
    )?);
    monitor.refresh_monitoring().await?;
    let monitor_handle = monitor.start()?;

    let distributor = Distributor::new(&config.distribution)?;
    let state = Arc::new(AppState::new(monitor, store, distributor));
    let app = router(state);

    let listener = TcpListener::bind(config.listen).await?;
    info!("Overseer Platform listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
        })
        .await?;

    monitor_handle.shutdown().await;
    Ok(())
}
