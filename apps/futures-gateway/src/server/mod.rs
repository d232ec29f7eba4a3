//! HTTP/SSE/WebSocket transport over the session core.
//!
//! Thin driver adapters: each request opens its own session, drives it,
//! and always closes it, whether it ends in success, error or client
//! disconnect.

mod http;
mod request;
mod ws;

pub use request::{
    BrokerCommand, CancelOrderBody, CredentialsParams, SendOrderBody, WsOrderData,
};

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::config::GatewayConfig;
use crate::connector::{ConnectorError, ConnectorFactory};
use crate::instruments::InstrumentDirectory;
use crate::models::Credentials;
use crate::router::OrderRouter;
use crate::session::Session;
use crate::store::KvStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Opens one connector per session.
    pub factory: Arc<dyn ConnectorFactory>,
    /// Shared order router.
    pub router: Arc<OrderRouter>,
    /// Shared instrument directory.
    pub directory: Arc<InstrumentDirectory>,
    /// Shared key-value store.
    pub store: Arc<dyn KvStore>,
    /// Gateway configuration.
    pub config: Arc<GatewayConfig>,
}

impl AppState {
    /// Turn consumer-supplied credential params into full credentials,
    /// applying the gateway defaults.
    #[must_use]
    pub fn credentials(&self, params: CredentialsParams) -> Credentials {
        Credentials {
            user_id: params.user_id,
            password: params.password,
            broker_id: params
                .broker_id
                .unwrap_or_else(|| self.config.default_broker_id.clone()),
            address: params
                .address
                .unwrap_or_else(|| self.config.default_front_address.clone()),
            auth_code: None,
            user_product_info: None,
        }
    }

    /// Open a session over a fresh connector.
    pub async fn open_session(&self, credentials: Credentials) -> Result<Session, ConnectorError> {
        let (connector, callbacks) = self.factory.open(&credentials.address);
        Session::open(
            connector,
            callbacks,
            credentials,
            Arc::clone(&self.router),
            Arc::clone(&self.directory),
            Arc::clone(&self.store),
        )
        .await
    }
}

/// Create the transport router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(http::health))
        .route("/v1/send_order", post(http::send_order))
        .route("/v1/cancel_order", post(http::cancel_order))
        .route("/v1/account", get(http::account))
        .route("/v1/position", get(http::position))
        .route("/v1/instrument_list", get(http::instrument_list))
        .route("/v1/broker", get(ws::broker))
        .with_state(state)
}
