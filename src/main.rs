//! Application entry point.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use eth_transfer_relayer::api::create_router;
use eth_transfer_relayer::app::{AppState, DispatchConfig, PollerConfig, spawn_dispatch_worker};
use eth_transfer_relayer::infra::{EthereumRpcClient, MemoryStateStore, RpcClientConfig};

/// Application configuration
struct Config {
    chain_rpc_url: String,
    /// Sender account used when a submission carries no `from` address
    relayer_from_address: Option<String>,
    host: String,
    port: u16,
    enable_dispatch_worker: bool,
    dispatch_config: DispatchConfig,
    rpc_timeout: Duration,
}

impl Config {
    fn from_env() -> Result<Self> {
        let chain_rpc_url =
            env::var("ETH_RPC_URL").unwrap_or_else(|_| "http://localhost:8545".to_string());
        let relayer_from_address = env::var("ETH_FROM_ADDRESS").ok().filter(|a| !a.is_empty());
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);
        let enable_dispatch_worker = env::var("ENABLE_DISPATCH_WORKER")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        let max_concurrent_pollers = env::var("MAX_CONCURRENT_POLLERS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(512);

        let poll_max_attempts = env::var("POLL_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(60);

        let poll_initial_backoff_secs = env::var("POLL_INITIAL_BACKOFF_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1);

        let poll_max_backoff_secs = env::var("POLL_MAX_BACKOFF_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let dequeue_retry_secs = env::var("DEQUEUE_RETRY_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1);

        let rpc_timeout_secs = env::var("RPC_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let dispatch_config = DispatchConfig {
            dequeue_retry_delay: Duration::from_secs(dequeue_retry_secs),
            max_concurrent_pollers,
            poller: PollerConfig {
                initial_backoff: Duration::from_secs(poll_initial_backoff_secs),
                max_backoff: Duration::from_secs(poll_max_backoff_secs),
                max_attempts: poll_max_attempts,
            },
        };

        Ok(Self {
            chain_rpc_url,
            relayer_from_address,
            host,
            port,
            enable_dispatch_worker,
            dispatch_config,
            rpc_timeout: Duration::from_secs(rpc_timeout_secs),
        })
    }
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    info!("Ethereum Transfer Relayer v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    info!("Initializing infrastructure...");

    let store = Arc::new(MemoryStateStore::new());
    info!("   state store ready (in-memory, 24h retention)");

    let chain = Arc::new(
        EthereumRpcClient::new(
            &config.chain_rpc_url,
            RpcClientConfig {
                timeout: config.rpc_timeout,
                default_from: config.relayer_from_address.clone(),
            },
        )
        .context("Failed to build chain RPC client")?,
    );
    info!(rpc_url = %config.chain_rpc_url, "   chain client created");

    let app_state = Arc::new(AppState::new(store.clone(), chain.clone()));

    // Single consumer: broadcasts stay serialized in queue order.
    let worker_shutdown_tx = if config.enable_dispatch_worker {
        let (_worker_handle, shutdown_tx) =
            spawn_dispatch_worker(store, chain, config.dispatch_config.clone());
        info!(
            max_pollers = config.dispatch_config.max_concurrent_pollers,
            "   dispatch worker started"
        );
        Some(shutdown_tx)
    } else {
        info!("   dispatch worker disabled");
        None
    };

    let router = create_router(app_state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server starting on http://{}", addr);
    info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Signal the worker and its pollers to stop.
    if let Some(tx) = worker_shutdown_tx {
        let _ = tx.send(true);
    }

    info!("Server shutdown complete");
    Ok(())
}
