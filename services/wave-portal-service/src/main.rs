mod config;
mod routes;

use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};
use wp_chain_client::WalletProvider;
use wp_chain_evm::{JsonRpcClient, RpcWalletProvider, RpcWaveContract};
use wp_portal_core::{PortalConfig, WavePortal};

use crate::config::ServiceConfig;
use crate::routes::{AppState, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServiceConfig::from_env()?;

    let node = Arc::new(JsonRpcClient::new(config.node_url.clone()));
    let wallet = config.wallet_url.as_ref().map(|url| {
        Arc::new(RpcWalletProvider::new(Arc::new(JsonRpcClient::new(url.clone()))))
            as Arc<dyn WalletProvider>
    });
    if wallet.is_none() {
        warn!("WAVE_PORTAL_WALLET_URL is not set; waving is unavailable");
    }
    let contract = Arc::new(RpcWaveContract::new(
        node,
        config.contract_address.clone(),
        config.poll.clone(),
    ));

    let portal = Arc::new(WavePortal::new(
        wallet,
        contract,
        PortalConfig {
            execution_limit: config.execution_limit,
        },
    ));
    let connection = portal.connect().await;
    info!("initial wallet connection: {:?}", connection);

    let app = router(AppState {
        portal: Arc::clone(&portal),
    });

    info!(
        "wave-portal-service listening on {} (contract {}, node {})",
        config.bind_addr, config.contract_address, config.node_url
    );
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    portal.teardown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
