//! Order intents, exchange-ready requests and session identity.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::{
    Direction, Offset, PriceKind, PriceType, TimeCondition, TradeAction, VolumeCondition,
};

/// Credentials for one logical exchange connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Investor account ID.
    pub user_id: String,
    /// Account password.
    pub password: String,
    /// Broker ID at the exchange front.
    pub broker_id: String,
    /// Front address, e.g. `tcp://180.168.146.187:10003`.
    pub address: String,
    /// App-level auth code, when the deployment requires authentication.
    #[serde(default)]
    pub auth_code: Option<String>,
    /// Product info paired with the auth code.
    #[serde(default)]
    pub user_product_info: Option<String>,
}

impl Credentials {
    /// Whether the deployment requires app-level authentication before login.
    #[must_use]
    pub const fn requires_authentication(&self) -> bool {
        self.auth_code.is_some()
    }
}

/// A consumer's trade intent, immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Instrument symbol, e.g. `au2406`.
    pub symbol: String,
    /// Requested price; ignored by the exchange for market orders.
    pub price: Decimal,
    /// Requested volume in lots.
    pub volume: i32,
    /// Price type (limit/market/FAK/FOK).
    pub price_type: PriceType,
    /// Trade action (buy/sell/short/cover).
    pub action: TradeAction,
    /// Trade date of the position being closed (`YYYYMMDD`); drives the
    /// close-today / close-yesterday split on position-aging exchanges.
    #[serde(default)]
    pub trade_date: Option<String>,
}

/// Session identity stamped on every outbound order.
///
/// The (front_id, session_id, order_ref) triple is the correlation key for
/// callbacks belonging to this connection incarnation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStamp {
    /// Front ID assigned by the exchange gateway at login.
    pub front_id: i32,
    /// Session ID assigned by the exchange gateway at login.
    pub session_id: i64,
    /// Investor account ID.
    pub investor_id: String,
    /// Broker ID.
    pub broker_id: String,
}

/// The fully-resolved, exchange-ready order.
///
/// Derived deterministically from an [`OrderIntent`] plus the session stamp
/// and an instrument-directory lookup. The offset flag is always computed by
/// the router, never passed through. Fixed request semantics not modeled as
/// fields: speculation hedging, immediate contingent condition, not a forced
/// close, no auto-suspend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Instrument symbol.
    pub symbol: String,
    /// Exchange-side direction.
    pub direction: Direction,
    /// Computed offset flag.
    pub offset: Offset,
    /// Resolved price kind.
    pub price_kind: PriceKind,
    /// Limit price (carried for market orders too; the exchange ignores it).
    pub price: Decimal,
    /// Total volume in lots.
    pub volume: i32,
    /// Time condition.
    pub time_condition: TimeCondition,
    /// Volume condition.
    pub volume_condition: VolumeCondition,
    /// Minimum volume per fill.
    pub min_volume: i32,
    /// Order reference token drawn from the allocator pool.
    pub order_ref: String,
    /// Investor account ID.
    pub investor_id: String,
    /// Broker ID.
    pub broker_id: String,
    /// Front ID of the submitting session.
    pub front_id: i32,
    /// Session ID of the submitting session.
    pub session_id: i64,
    /// Monotonic per-session request sequence number.
    pub request_id: u64,
}

/// A consumer's request to cancel a previously submitted order.
///
/// The order is identified by the (front, session, order_ref) triple it was
/// originally submitted under, which may belong to an earlier connection
/// incarnation than the session carrying the cancel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelIntent {
    /// Instrument symbol of the order being canceled.
    pub symbol: String,
    /// Exchange ID of the order being canceled.
    pub exchange_id: String,
    /// Order reference of the order being canceled.
    pub order_ref: String,
    /// Front ID the order was submitted under.
    pub front_id: i32,
    /// Session ID the order was submitted under.
    pub session_id: i64,
}

/// An exchange-ready cancel. Identity packaging only; no offset logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    /// Instrument symbol of the order being canceled.
    pub symbol: String,
    /// Exchange ID of the order being canceled.
    pub exchange_id: String,
    /// Order reference of the order being canceled.
    pub order_ref: String,
    /// Front ID the order was submitted under.
    pub front_id: i32,
    /// Session ID the order was submitted under.
    pub session_id: i64,
    /// Investor account ID.
    pub investor_id: String,
    /// Broker ID.
    pub broker_id: String,
}
