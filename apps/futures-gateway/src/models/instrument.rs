//! Instrument metadata.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Instrument metadata reported by the exchange.
///
/// Populated once per trading day; read-mostly; shared across sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentRecord {
    /// Instrument symbol, e.g. `au2406`.
    pub symbol: String,
    /// Instrument display name.
    pub name: String,
    /// Exchange the instrument trades on.
    pub exchange_id: String,
    /// Product the instrument belongs to.
    pub product_id: String,
    /// Minimum price movement.
    pub price_tick: Decimal,
    /// Contract multiplier.
    pub volume_multiple: i32,
    /// Minimum order volume.
    pub min_buy_volume: i32,
    /// Maximum volume for a single limit order.
    pub max_limit_order_volume: i32,
    /// Listing date (`YYYYMMDD`).
    pub open_date: String,
    /// Last delivery date (`YYYYMMDD`).
    pub end_deliv_date: String,
}
