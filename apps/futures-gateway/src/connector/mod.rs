//! Exchange connector capability.
//!
//! The native connector performs the actual login/order/query protocol
//! exchange and delivers asynchronous callbacks on its own thread. The core
//! depends only on this contract: request methods on the trait, callbacks
//! on an unbounded channel consumed by the session's dispatch task.

mod mock;

pub use mock::{MockBehavior, MockConnector, MockConnectorFactory, default_instruments};

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::models::{
    AccountSnapshot, CancelRequest, Credentials, ExchangeError, InstrumentRecord, OrderEvent,
    OrderRequest, PositionRecord, TradeEvent,
};

/// Errors raised synchronously by connector requests.
///
/// Only resource acquisition fails synchronously; everything the exchange
/// reports travels back as a callback.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// The connector front cannot be reached.
    #[error("connector unreachable: {0}")]
    Unreachable(String),

    /// The connector has already been released.
    #[error("connector already closed")]
    Closed,
}

/// Identity assigned by the exchange gateway at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginGrant {
    /// Front ID of this connection incarnation.
    pub front_id: i32,
    /// Session ID of this connection incarnation.
    pub session_id: i64,
}

/// An asynchronous fact delivered by the connector.
#[derive(Debug, Clone)]
pub enum ConnectorCallback {
    /// Transport to the front established.
    Connected,
    /// Transport to the front lost.
    Disconnected,
    /// App-level authentication result.
    Authenticated(Result<(), ExchangeError>),
    /// Login result; success carries the front/session identity.
    LoggedIn(Result<LoginGrant, ExchangeError>),
    /// Settlement information confirmed.
    SettlementConfirmed,
    /// One instrument record from an instrument query.
    Instrument(InstrumentRecord),
    /// Account funds snapshot from an account query.
    Account(AccountSnapshot),
    /// One position record from a position query.
    Position(PositionRecord),
    /// Order insertion rejected by the counter.
    InsertRejected {
        /// The rejected request.
        order: OrderRequest,
        /// The reported error.
        error: ExchangeError,
    },
    /// Order insertion rejected by the exchange.
    InsertFailed {
        /// The rejected request.
        order: OrderRequest,
        /// The reported error.
        error: ExchangeError,
    },
    /// Order status update (acceptance, progress, cancellation).
    OrderUpdate(OrderEvent),
    /// Trade execution.
    TradeExecuted(TradeEvent),
    /// Cancel rejected by the counter.
    CancelRejected {
        /// The rejected cancel.
        cancel: CancelRequest,
        /// The reported error.
        error: ExchangeError,
    },
    /// Cancel rejected by the exchange.
    CancelFailed {
        /// The rejected cancel.
        cancel: CancelRequest,
        /// The reported error.
        error: ExchangeError,
    },
}

/// Capability trait for the exchange connector.
///
/// All request methods are fire-and-forget: results arrive as
/// [`ConnectorCallback`] values on the channel handed out at construction.
#[async_trait]
pub trait ExchangeConnector: Send + Sync {
    /// Open the transport to the front.
    async fn connect(&self) -> Result<(), ConnectorError>;

    /// Request app-level authentication.
    async fn authenticate(&self, credentials: &Credentials) -> Result<(), ConnectorError>;

    /// Request login.
    async fn login(&self, credentials: &Credentials) -> Result<(), ConnectorError>;

    /// Confirm settlement information.
    async fn confirm_settlement(&self, credentials: &Credentials) -> Result<(), ConnectorError>;

    /// Query all instrument records.
    async fn query_instruments(&self) -> Result<(), ConnectorError>;

    /// Query the account funds snapshot.
    async fn query_account(&self) -> Result<(), ConnectorError>;

    /// Query position records.
    async fn query_position(&self) -> Result<(), ConnectorError>;

    /// Submit an order.
    async fn insert_order(&self, order: &OrderRequest) -> Result<(), ConnectorError>;

    /// Submit a cancel.
    async fn cancel_order(&self, cancel: &CancelRequest) -> Result<(), ConnectorError>;

    /// Release the underlying connection. Further requests fail with
    /// [`ConnectorError::Closed`]. Implementations drop their callback
    /// sender here so the session's channel closes.
    async fn disconnect(&self) -> Result<(), ConnectorError>;
}

/// Creates a connector plus its callback channel for one session.
pub trait ConnectorFactory: Send + Sync {
    /// Open a fresh connector bound to the given front address.
    fn open(
        &self,
        address: &str,
    ) -> (
        Arc<dyn ExchangeConnector>,
        UnboundedReceiver<ConnectorCallback>,
    );
}
