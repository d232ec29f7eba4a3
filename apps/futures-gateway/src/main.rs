//! Futures Gateway Binary
//!
//! Starts the gateway HTTP/WebSocket server over a scripted connector.
//! The native exchange connector is an external capability; deployments
//! wire a real [`futures_gateway::ConnectorFactory`] in its place.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin futures-gateway
//! ```
//!
//! # Environment Variables
//!
//! - `HTTP_PORT`: HTTP server port (default: 10080)
//! - `GATEWAY_BROKER_ID`: default broker ID (default: 9999)
//! - `GATEWAY_FRONT_ADDRESS`: default front address
//! - `ORDER_ID_POOL_SEED`: order-id tokens seeded at startup (default: 10000)
//! - `RUST_LOG`: log level (default: info)

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;

use futures_gateway::config::GatewayConfig;
use futures_gateway::connector::MockConnectorFactory;
use futures_gateway::instruments::InstrumentDirectory;
use futures_gateway::allocator::OrderIdAllocator;
use futures_gateway::router::OrderRouter;
use futures_gateway::server::{AppState, create_router};
use futures_gateway::store::{InMemoryKvStore, KvStore};
use futures_gateway::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry();
    let config = GatewayConfig::from_env();

    let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
    let directory = Arc::new(InstrumentDirectory::new(Arc::clone(&store)));
    let allocator = Arc::new(OrderIdAllocator::new(Arc::clone(&store)));

    if config.order_id_pool_seed > 0 && allocator.remaining().await? == 0 {
        allocator.seed(config.order_id_pool_seed).await?;
        tracing::info!(count = config.order_id_pool_seed, "seeded order-id pool");
    }

    let state = AppState {
        factory: Arc::new(MockConnectorFactory::new()),
        router: Arc::new(OrderRouter::new(Arc::clone(&directory), allocator)),
        directory,
        store,
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;

    tracing::info!(%addr, "gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = signal::ctrl_c().await {
        tracing::error!(%error, "cannot install shutdown handler");
        return;
    }
    tracing::info!("shutdown signal received");
}
