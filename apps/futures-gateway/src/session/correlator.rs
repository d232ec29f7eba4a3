//! Callback-to-session correlation.

use crate::models::{OrderEvent, TradeEvent};

/// Correlation key of the session's active order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveOrderKey {
    /// Exchange the order was accepted on.
    pub exchange_id: String,
    /// Order-system ID, trimmed of front padding.
    pub order_sys_id: String,
}

/// Matches inbound order/trade callbacks to the session that caused them.
///
/// The connector is a shared channel: callbacks from a prior connection
/// incarnation, or cross-talk for other orders, arrive interleaved with
/// ours. An order update is accepted only when its front/session identity
/// equals the pair captured at login; acceptance records the
/// (exchange id, trimmed order-system id) key, and a trade is accepted
/// only when it matches that key. Everything else is dropped.
///
/// One in-flight order per session: tracking a single active key is a
/// documented limitation, not an oversight. Concurrent independent orders
/// need one session each.
#[derive(Debug, Default)]
pub struct RequestCorrelator {
    front_id: Option<i32>,
    session_id: Option<i64>,
    active_order: Option<ActiveOrderKey>,
}

impl RequestCorrelator {
    /// Create an unbound correlator; everything is dropped until
    /// [`Self::bind`] runs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to the identity captured at login. Resets any active-order key
    /// from a previous incarnation.
    pub fn bind(&mut self, front_id: i32, session_id: i64) {
        self.front_id = Some(front_id);
        self.session_id = Some(session_id);
        self.active_order = None;
    }

    /// The currently recorded active-order key, if any.
    #[must_use]
    pub const fn active_order(&self) -> Option<&ActiveOrderKey> {
        self.active_order.as_ref()
    }

    /// Decide whether an order update belongs to this session; on
    /// acceptance, record its correlation key as the active order.
    pub fn observe_order(&mut self, event: &OrderEvent) -> bool {
        let bound = self.front_id == Some(event.front_id)
            && self.session_id == Some(event.session_id);
        if !bound {
            tracing::debug!(
                order_ref = %event.order_ref,
                front_id = event.front_id,
                session_id = event.session_id,
                "dropping order update from another connection incarnation"
            );
            return false;
        }

        self.active_order = Some(ActiveOrderKey {
            exchange_id: event.exchange_id.clone(),
            order_sys_id: event.order_sys_id.trim().to_string(),
        });
        true
    }

    /// Decide whether a trade execution belongs to this session's active
    /// order.
    pub fn observe_trade(&self, event: &TradeEvent) -> bool {
        let Some(key) = &self.active_order else {
            tracing::debug!(trade_id = %event.trade_id, "dropping trade with no active order");
            return false;
        };

        let matches =
            key.exchange_id == event.exchange_id && key.order_sys_id == event.order_sys_id.trim();
        if !matches {
            tracing::debug!(
                trade_id = %event.trade_id,
                exchange_id = %event.exchange_id,
                order_sys_id = %event.order_sys_id,
                "dropping trade for a different order"
            );
        }
        matches
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::models::{Direction, Offset, OrderStatus};

    use super::*;

    fn order_event(front_id: i32, session_id: i64, exchange: &str, sys_id: &str) -> OrderEvent {
        OrderEvent {
            symbol: "au2406".to_string(),
            exchange_id: exchange.to_string(),
            order_sys_id: sys_id.to_string(),
            order_ref: "7".to_string(),
            front_id,
            session_id,
            direction: Direction::Long,
            offset: Offset::Open,
            price: Decimal::new(5000, 1),
            volume: 1,
            traded_volume: 0,
            status: OrderStatus::NoTradeQueueing,
            status_msg: String::new(),
            insert_time: "09:30:00".to_string(),
            cancel_time: String::new(),
        }
    }

    fn trade_event(exchange: &str, sys_id: &str) -> TradeEvent {
        TradeEvent {
            symbol: "au2406".to_string(),
            exchange_id: exchange.to_string(),
            order_sys_id: sys_id.to_string(),
            order_ref: "7".to_string(),
            trade_id: "T1".to_string(),
            direction: Direction::Long,
            offset: Offset::Open,
            price: Decimal::new(5000, 1),
            volume: 1,
            trade_time: "09:30:01".to_string(),
        }
    }

    #[test]
    fn unbound_correlator_drops_everything() {
        let mut correlator = RequestCorrelator::new();
        assert!(!correlator.observe_order(&order_event(1, 42, "SHFE", "1001")));
        assert!(!correlator.observe_trade(&trade_event("SHFE", "1001")));
    }

    #[test]
    fn matching_order_update_records_key() {
        let mut correlator = RequestCorrelator::new();
        correlator.bind(1, 42);

        assert!(correlator.observe_order(&order_event(1, 42, "SHFE", "    1001")));
        let key = correlator.active_order().unwrap();
        assert_eq!(key.exchange_id, "SHFE");
        assert_eq!(key.order_sys_id, "1001");
    }

    #[test]
    fn stale_incarnation_order_update_is_dropped() {
        let mut correlator = RequestCorrelator::new();
        correlator.bind(1, 42);

        assert!(!correlator.observe_order(&order_event(1, 41, "SHFE", "1001")));
        assert!(!correlator.observe_order(&order_event(2, 42, "SHFE", "1001")));
        assert!(correlator.active_order().is_none());
    }

    #[test]
    fn trade_must_match_recorded_key() {
        let mut correlator = RequestCorrelator::new();
        correlator.bind(1, 42);
        assert!(correlator.observe_order(&order_event(1, 42, "SHFE", "1001")));

        assert!(correlator.observe_trade(&trade_event("SHFE", " 1001 ")));
        assert!(!correlator.observe_trade(&trade_event("SHFE", "1002")));
        assert!(!correlator.observe_trade(&trade_event("DCE", "1001")));
    }

    #[test]
    fn rebinding_resets_active_order() {
        let mut correlator = RequestCorrelator::new();
        correlator.bind(1, 42);
        assert!(correlator.observe_order(&order_event(1, 42, "SHFE", "1001")));

        correlator.bind(1, 43);
        assert!(correlator.active_order().is_none());
        assert!(!correlator.observe_trade(&trade_event("SHFE", "1001")));
    }
}
