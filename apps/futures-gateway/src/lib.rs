// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Futures Gateway - Core Library
//!
//! Exposes a futures-exchange trading connection (login, order placement,
//! cancellation, account/position query) to multiple web-facing consumers
//! over SSE and WebSocket channels.
//!
//! # Architecture
//!
//! The hard part is the session and order-lifecycle coordination layer
//! between a callback-driven exchange connector and concurrent
//! request-scoped consumers:
//!
//! - `session`: the [`session::Session`] orchestrator, the
//!   [`session::SessionManager`] login state machine (with its
//!   login-failure latch), the [`session::RequestCorrelator`] matching
//!   asynchronous callbacks to the originating connection incarnation,
//!   and the [`session::EventRelay`] FIFO between the connector's
//!   callback task and a consumer's poll loop.
//! - `router`: trade intent → exchange-ready order, including the
//!   close-today / close-yesterday offset policy.
//! - `instruments` / `allocator`: shared symbol→exchange directory and
//!   the unique order-reference pool.
//! - `connector` / `store`: capability traits for the native exchange
//!   connector and the key-value store, with scripted/in-memory
//!   implementations.
//! - `server`: thin axum transport (SSE + WebSocket) where every request
//!   owns exactly one session and always releases it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Order reference token allocation.
pub mod allocator;

/// Gateway configuration.
pub mod config;

/// Exchange connector capability.
pub mod connector;

/// Instrument directory.
pub mod instruments;

/// Data model.
pub mod models;

/// Order routing and offset policy.
pub mod router;

/// HTTP/SSE/WebSocket transport.
pub mod server;

/// Session coordination core.
pub mod session;

/// Key-value store capability.
pub mod store;

/// Tracing setup.
pub mod telemetry;

pub use allocator::{AllocatorError, OrderIdAllocator};
pub use config::GatewayConfig;
pub use connector::{
    ConnectorCallback, ConnectorError, ConnectorFactory, ExchangeConnector, LoginGrant,
    MockBehavior, MockConnector, MockConnectorFactory,
};
pub use instruments::InstrumentDirectory;
pub use models::{
    AccountSnapshot, CancelIntent, CancelRequest, Credentials, Direction, GatewayEvent, Offset,
    OrderIntent, OrderRequest, OrderStatus, PriceKind, PriceType, TradeAction,
};
pub use router::{OrderRouter, resolve_offset};
pub use server::{AppState, create_router};
pub use session::{EventRelay, RequestCorrelator, Session, SessionError, SessionManager, SessionState};
pub use store::{InMemoryKvStore, KvStore, StoreError};
