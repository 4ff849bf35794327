use anyhow::Result;
use hyper::{server::conn::http1, service::service_fn};
use hyper_util::rt::tokio::TokioIo;
use realm_core::RealmRegistry;
use realm_store::YamlFileStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod metrics;
mod status;

use config::RealmdConfig;
use metrics::RealmMetrics;
use status::StatusState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting realmd...");

    let config = RealmdConfig::from_env()?;
    info!("Realm list: {}", config.realmlist.display());

    let store = Arc::new(YamlFileStore::new(&config.realmlist));
    let registry = Arc::new(RealmRegistry::initialize(store, config.refresh_interval).await?);

    let snapshot = registry.snapshot();
    info!(
        "Realm registry initialized with {} realms ({} listed)",
        snapshot.len(),
        snapshot.listed_len()
    );
    if config.refresh_interval == 0 {
        warn!("Realm list refresh disabled");
    } else {
        info!("Realm list refreshes every {}s", config.refresh_interval);
    }

    let metrics = RealmMetrics::new()?;
    let state = Arc::new(StatusState::new(registry, metrics));

    if config.refresh_interval > 0 {
        tokio::spawn(refresh_loop(state.clone()));
    }

    let listener = TcpListener::bind(config.status_addr).await?;
    info!("Status server listening on {}", config.status_addr);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("Error accepting status connection: {}", e);
                        continue;
                    }
                };
                let io = TokioIo::new(stream);
                let state = state.clone();

                tokio::task::spawn(async move {
                    let service = service_fn(move |req| status::handle_request(req, state.clone()));

                    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                        debug!("Error serving status connection from {}: {}", peer_addr, e);
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, exiting...");
                return Ok(());
            }
        }
    }
}

/// Drive periodic refreshes even when nobody asks for the realm list
async fn refresh_loop(state: Arc<StatusState>) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        ticker.tick().await;
        state.refresh_if_due().await;
    }
}
