//! AWP weather-station exporter service.
//!
//! Receives station reports, publishes the readings as Prometheus gauges
//! and optionally mirrors each report to another collector.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use awp_exporter::config::Args;
use awp_exporter::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mirror = args.mirror_config();
    match mirror.enabled_host() {
        Some(host) => info!(
            host = %host,
            port = mirror.effective_port(),
            path = %mirror.path,
            scheme = mirror.scheme(),
            "Mirroring enabled"
        ),
        None => info!("Mirroring disabled"),
    }

    let state = Arc::new(AppState::new(&mirror)?);
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!(address = %addr, "awp-exporter listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
