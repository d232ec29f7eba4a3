//! Callback facts and the consumer-facing event envelope.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::account::{AccountSnapshot, PositionRecord};
use super::enums::{Direction, Offset, OrderStatus};
use super::order::{CancelRequest, OrderRequest};

/// An error reported by the exchange inside a callback.
///
/// This is data, not a fault: it travels through the event relay to the
/// consumer that submitted the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeError {
    /// Exchange error code.
    pub code: i32,
    /// Exchange error message.
    pub message: String,
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// An order-status update reported by the exchange.
///
/// Carries the identity fields (exchange id, order-system id, front and
/// session ids, order reference) used to attribute it to exactly one
/// session incarnation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    /// Instrument symbol.
    pub symbol: String,
    /// Exchange the order was routed to.
    pub exchange_id: String,
    /// Order-system ID assigned by the exchange; may carry padding.
    pub order_sys_id: String,
    /// Order reference the order was submitted with.
    pub order_ref: String,
    /// Front ID the order was submitted under.
    pub front_id: i32,
    /// Session ID the order was submitted under.
    pub session_id: i64,
    /// Direction of the order.
    pub direction: Direction,
    /// Offset flag of the order.
    pub offset: Offset,
    /// Order price.
    pub price: Decimal,
    /// Total volume in lots.
    pub volume: i32,
    /// Volume traded so far.
    pub traded_volume: i32,
    /// Reported status.
    pub status: OrderStatus,
    /// Free-text status message from the exchange.
    pub status_msg: String,
    /// Time of insertion at the exchange.
    pub insert_time: String,
    /// Time of cancellation, when canceled.
    pub cancel_time: String,
}

/// A trade execution reported by the exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Instrument symbol.
    pub symbol: String,
    /// Exchange the trade executed on.
    pub exchange_id: String,
    /// Order-system ID of the filled order.
    pub order_sys_id: String,
    /// Order reference of the filled order.
    pub order_ref: String,
    /// Trade ID assigned by the exchange.
    pub trade_id: String,
    /// Direction of the fill.
    pub direction: Direction,
    /// Offset flag of the fill.
    pub offset: Offset,
    /// Fill price.
    pub price: Decimal,
    /// Fill volume in lots.
    pub volume: i32,
    /// Time of the fill.
    pub trade_time: String,
}

/// An order insertion rejected before reaching the book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRejection {
    /// The request that was rejected.
    #[serde(flatten)]
    pub order: OrderRequest,
    /// Exchange error code.
    pub error_id: i32,
    /// Exchange error message.
    pub error_msg: String,
}

impl OrderRejection {
    /// Package a rejected request with its error.
    #[must_use]
    pub fn new(order: OrderRequest, error: ExchangeError) -> Self {
        Self {
            order,
            error_id: error.code,
            error_msg: error.message,
        }
    }
}

/// A cancel request rejected by the counter or the exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRejection {
    /// The cancel that was rejected.
    #[serde(flatten)]
    pub cancel: CancelRequest,
    /// Exchange error code.
    pub error_id: i32,
    /// Exchange error message.
    pub error_msg: String,
}

impl CancelRejection {
    /// Package a rejected cancel with its error.
    #[must_use]
    pub fn new(cancel: CancelRequest, error: ExchangeError) -> Self {
        Self {
            cancel,
            error_id: error.code,
            error_msg: error.message,
        }
    }
}

/// The consumer-facing event envelope.
///
/// Serializes as `{"msg_type": <string>, "data": <object>}`. Transport
/// handlers forward these verbatim; the relay delivers them in production
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "msg_type", content = "data", rename_all = "camelCase")]
pub enum GatewayEvent {
    /// Account funds snapshot.
    Account(AccountSnapshot),
    /// Position record.
    Position(PositionRecord),
    /// Order insertion rejected by the counter.
    OnRspOrderInsert(OrderRejection),
    /// Order insertion rejected by the exchange.
    OnErrRtnOrderInsert(OrderRejection),
    /// Order status update; status CANCELED is terminal for the order.
    OnRtnOrder(OrderEvent),
    /// Trade execution.
    OnRtnTrade(TradeEvent),
    /// Cancel rejected by the counter.
    OnRspOrderAction(CancelRejection),
    /// Cancel rejected by the exchange.
    OnErrRtnOrderAction(CancelRejection),
}

impl GatewayEvent {
    /// Envelope tag, as serialized into `msg_type`.
    #[must_use]
    pub const fn msg_type(&self) -> &'static str {
        match self {
            Self::Account(_) => "account",
            Self::Position(_) => "position",
            Self::OnRspOrderInsert(_) => "onRspOrderInsert",
            Self::OnErrRtnOrderInsert(_) => "onErrRtnOrderInsert",
            Self::OnRtnOrder(_) => "onRtnOrder",
            Self::OnRtnTrade(_) => "onRtnTrade",
            Self::OnRspOrderAction(_) => "onRspOrderAction",
            Self::OnErrRtnOrderAction(_) => "onErrRtnOrderAction",
        }
    }

    /// Whether this event ends an order-submission request lifecycle:
    /// either rejection path, or a status update reporting cancellation.
    #[must_use]
    pub fn is_order_terminal(&self) -> bool {
        match self {
            Self::OnRspOrderInsert(_) | Self::OnErrRtnOrderInsert(_) => true,
            Self::OnRtnOrder(ev) => ev.status == OrderStatus::Canceled,
            _ => false,
        }
    }

    /// Whether this event ends a cancel-request lifecycle.
    #[must_use]
    pub fn is_cancel_terminal(&self) -> bool {
        matches!(
            self,
            Self::OnRspOrderAction(_) | Self::OnErrRtnOrderAction(_)
        ) || self.is_order_terminal()
    }
}
