//! Closed enums for order semantics.
//!
//! Direction, offset, price type and status values are tagged variants
//! validated at construction; free-form strings never cross a module
//! boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Order direction on the exchange side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Buying side.
    Long,
    /// Selling side.
    Short,
}

/// Whether an order opens a new position or closes an existing one.
///
/// Exchanges that age positions separately split the close into
/// close-today / close-yesterday; the router computes this, it is never
/// passed through uninterpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Offset {
    /// Open a new position.
    Open,
    /// Close an existing position (uniform close).
    Close,
    /// Close a position opened today (position-aging exchanges).
    CloseToday,
    /// Close a position carried from a prior day (position-aging exchanges).
    CloseYesterday,
}

/// Price type requested by the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceType {
    /// Resting limit order.
    Limit,
    /// Market order.
    Market,
    /// Fill-and-kill: limit-priced, immediate, cancel the remainder.
    Fak,
    /// Fill-or-kill: limit-priced, immediate, all-or-none.
    Fok,
}

impl FromStr for PriceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "limit" => Ok(Self::Limit),
            "market" => Ok(Self::Market),
            "FAK" => Ok(Self::Fak),
            "FOK" => Ok(Self::Fok),
            other => Err(format!(
                "price_type should be [limit|market|FAK|FOK], got '{other}'"
            )),
        }
    }
}

/// Resolved price kind stamped on an exchange-ready order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceKind {
    /// Execute at the given price or better.
    Limit,
    /// Execute at the best available price.
    Market,
}

/// Time condition stamped on an exchange-ready order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeCondition {
    /// Valid for the current trading day.
    GoodForDay,
    /// Fill immediately, cancel whatever remains.
    ImmediateOrCancel,
}

/// Volume condition stamped on an exchange-ready order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeCondition {
    /// Any traded volume is acceptable.
    Any,
    /// All-or-none.
    All,
}

/// Trade action requested by the consumer.
///
/// Buy/sell operate the long side of a position, short/cover the short
/// side; sell and cover are the closing actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    /// Open a long position.
    Buy,
    /// Close a long position.
    Sell,
    /// Open a short position.
    Short,
    /// Close a short position.
    Cover,
}

impl TradeAction {
    /// The exchange-side direction this action trades in.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Buy | Self::Cover => Direction::Long,
            Self::Sell | Self::Short => Direction::Short,
        }
    }

    /// Whether this action closes an existing position.
    #[must_use]
    pub const fn is_closing(self) -> bool {
        matches!(self, Self::Sell | Self::Cover)
    }
}

impl FromStr for TradeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            "short" => Ok(Self::Short),
            "cover" => Ok(Self::Cover),
            other => Err(format!(
                "order_type should be [buy|sell|short|cover], got '{other}'"
            )),
        }
    }
}

/// Exchange-reported status of a working order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Completely traded.
    AllTraded,
    /// Partially traded, remainder still queueing.
    PartTradedQueueing,
    /// Accepted by the exchange, nothing traded yet.
    NoTradeQueueing,
    /// Canceled.
    Canceled,
    /// Status not recognized by this gateway.
    Unknown,
}

impl OrderStatus {
    /// Returns true if no further updates will arrive for the order.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::AllTraded | Self::Canceled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllTraded => write!(f, "ALL_TRADED"),
            Self::PartTradedQueueing => write!(f, "PART_TRADED_QUEUEING"),
            Self::NoTradeQueueing => write!(f, "NO_TRADE_QUEUEING"),
            Self::Canceled => write!(f, "CANCELED"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}
