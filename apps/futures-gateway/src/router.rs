//! Order routing: trade intent → exchange-ready request.

use std::sync::Arc;

use crate::allocator::{AllocatorError, OrderIdAllocator};
use crate::instruments::InstrumentDirectory;
use crate::models::{
    CancelRequest, Offset, OrderIntent, OrderRequest, PriceKind, PriceType, SessionStamp,
    TimeCondition, TradeAction, VolumeCondition,
};

/// Exchange that ages positions, splitting close into today/yesterday.
const POSITION_AGING_EXCHANGE: &str = "SHFE";

/// Errors from building an order.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Could not draw an order reference token.
    #[error(transparent)]
    Allocator(#[from] AllocatorError),
}

/// Resolve the offset flag for a trade action.
///
/// Pure function of (exchange, action, trade date, today); dates are
/// `YYYYMMDD` strings, which order lexicographically. Opening actions
/// always yield OPEN. Closing actions yield CLOSE, except on the
/// position-aging exchange where a trade date equal to today means
/// CLOSE_TODAY and one strictly earlier means CLOSE_YESTERDAY. An
/// unresolved exchange or missing trade date leaves the generic CLOSE.
#[must_use]
pub fn resolve_offset(
    exchange: Option<&str>,
    action: TradeAction,
    trade_date: Option<&str>,
    today: &str,
) -> Offset {
    if !action.is_closing() {
        return Offset::Open;
    }

    if exchange == Some(POSITION_AGING_EXCHANGE) {
        if let Some(trade_date) = trade_date {
            if trade_date == today {
                return Offset::CloseToday;
            }
            if trade_date < today {
                return Offset::CloseYesterday;
            }
        }
    }

    Offset::Close
}

/// Builds exchange-ready orders from trade intents.
///
/// Consults the instrument directory for exchange-specific offset
/// semantics and draws one order reference token per order. Shared across
/// sessions; holds no per-session state.
pub struct OrderRouter {
    directory: Arc<InstrumentDirectory>,
    allocator: Arc<OrderIdAllocator>,
}

impl OrderRouter {
    /// Create a router over the shared directory and allocator.
    #[must_use]
    pub fn new(directory: Arc<InstrumentDirectory>, allocator: Arc<OrderIdAllocator>) -> Self {
        Self {
            directory,
            allocator,
        }
    }

    /// Build an exchange-ready order from a trade intent.
    ///
    /// Deterministic apart from consuming one order reference token. The
    /// request is stamped with the session's front/session identity; the
    /// request sequence number is stamped at submission.
    pub async fn build_order(
        &self,
        intent: &OrderIntent,
        stamp: &SessionStamp,
    ) -> Result<OrderRequest, RouterError> {
        let today = today_string();
        self.build_order_on(intent, stamp, &today).await
    }

    /// [`Self::build_order`] with an explicit current date.
    pub async fn build_order_on(
        &self,
        intent: &OrderIntent,
        stamp: &SessionStamp,
        today: &str,
    ) -> Result<OrderRequest, RouterError> {
        let exchange = self.directory.resolve_exchange(&intent.symbol).await;
        tracing::debug!(
            symbol = %intent.symbol,
            exchange = exchange.as_deref().unwrap_or("unresolved"),
            trade_date = intent.trade_date.as_deref().unwrap_or(""),
            "resolving order semantics"
        );

        let offset = resolve_offset(
            exchange.as_deref(),
            intent.action,
            intent.trade_date.as_deref(),
            today,
        );

        let price_kind = match intent.price_type {
            PriceType::Market => PriceKind::Market,
            PriceType::Limit | PriceType::Fak | PriceType::Fok => PriceKind::Limit,
        };

        let (time_condition, volume_condition) = match intent.price_type {
            PriceType::Fak => (TimeCondition::ImmediateOrCancel, VolumeCondition::Any),
            PriceType::Fok => (TimeCondition::ImmediateOrCancel, VolumeCondition::All),
            PriceType::Limit | PriceType::Market => {
                (TimeCondition::GoodForDay, VolumeCondition::Any)
            }
        };

        let order_ref = self.allocator.next().await?;

        Ok(OrderRequest {
            symbol: intent.symbol.clone(),
            direction: intent.action.direction(),
            offset,
            price_kind,
            price: intent.price,
            volume: intent.volume,
            time_condition,
            volume_condition,
            min_volume: 1,
            order_ref,
            investor_id: stamp.investor_id.clone(),
            broker_id: stamp.broker_id.clone(),
            front_id: stamp.front_id,
            session_id: stamp.session_id,
            request_id: 0,
        })
    }

    /// Package a cancel for a previously submitted order.
    ///
    /// The order is identified by the (front, session, order_ref) triple it
    /// was submitted under, which may belong to an earlier connection
    /// incarnation.
    #[must_use]
    pub fn build_cancel(
        &self,
        symbol: &str,
        exchange_id: &str,
        order_ref: &str,
        front_id: i32,
        session_id: i64,
        stamp: &SessionStamp,
    ) -> CancelRequest {
        CancelRequest {
            symbol: symbol.to_string(),
            exchange_id: exchange_id.to_string(),
            order_ref: order_ref.to_string(),
            front_id,
            session_id,
            investor_id: stamp.investor_id.clone(),
            broker_id: stamp.broker_id.clone(),
        }
    }
}

/// Today's trading date as `YYYYMMDD` in local time.
#[must_use]
pub fn today_string() -> String {
    chrono::Local::now().format("%Y%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use test_case::test_case;

    use crate::store::InMemoryKvStore;

    use super::*;

    #[test_case(Some("SHFE"), TradeAction::Sell, Some("20240101"), "20240101" => Offset::CloseToday; "aging exchange close on trade date")]
    #[test_case(Some("SHFE"), TradeAction::Cover, Some("20231231"), "20240101" => Offset::CloseYesterday; "aging exchange close of carried position")]
    #[test_case(Some("DCE"), TradeAction::Sell, Some("20240101"), "20240101" => Offset::Close; "uniform exchange ignores trade date")]
    #[test_case(Some("SHFE"), TradeAction::Buy, Some("20240101"), "20240101" => Offset::Open; "buy always opens")]
    #[test_case(Some("DCE"), TradeAction::Short, None, "20240101" => Offset::Open; "short always opens")]
    #[test_case(None, TradeAction::Sell, Some("20231231"), "20240101" => Offset::Close; "unresolved exchange keeps generic close")]
    #[test_case(Some("SHFE"), TradeAction::Sell, None, "20240101" => Offset::Close; "missing trade date keeps generic close")]
    #[test_case(Some("SHFE"), TradeAction::Cover, Some("20240102"), "20240101" => Offset::Close; "future trade date keeps generic close")]
    fn offset_resolution(
        exchange: Option<&str>,
        action: TradeAction,
        trade_date: Option<&str>,
        today: &str,
    ) -> Offset {
        resolve_offset(exchange, action, trade_date, today)
    }

    async fn make_router() -> OrderRouter {
        let store: Arc<dyn crate::store::KvStore> = Arc::new(InMemoryKvStore::new());
        let directory = Arc::new(InstrumentDirectory::new(Arc::clone(&store)));
        directory
            .upsert(
                &crate::connector::default_instruments()[0],
                "20240101",
            )
            .await
            .unwrap();
        let allocator = Arc::new(OrderIdAllocator::new(store));
        allocator.seed(10).await.unwrap();
        OrderRouter::new(directory, allocator)
    }

    fn stamp() -> SessionStamp {
        SessionStamp {
            front_id: 1,
            session_id: 20_001,
            investor_id: "126077".to_string(),
            broker_id: "9999".to_string(),
        }
    }

    #[tokio::test]
    async fn buy_limit_builds_long_open() {
        let router = make_router().await;
        let intent = OrderIntent {
            symbol: "au2406".to_string(),
            price: Decimal::new(5000, 1),
            volume: 1,
            price_type: PriceType::Limit,
            action: TradeAction::Buy,
            trade_date: None,
        };

        let order = router
            .build_order_on(&intent, &stamp(), "20240101")
            .await
            .unwrap();
        assert_eq!(order.direction, crate::models::Direction::Long);
        assert_eq!(order.offset, Offset::Open);
        assert_eq!(order.price_kind, PriceKind::Limit);
        assert_eq!(order.time_condition, TimeCondition::GoodForDay);
        assert!(!order.order_ref.is_empty());
        assert_eq!(order.front_id, 1);
        assert_eq!(order.session_id, 20_001);
    }

    #[tokio::test]
    async fn shfe_sell_today_closes_today() {
        let router = make_router().await;
        let intent = OrderIntent {
            symbol: "au2406".to_string(),
            price: Decimal::new(5000, 1),
            volume: 1,
            price_type: PriceType::Limit,
            action: TradeAction::Sell,
            trade_date: Some("20240101".to_string()),
        };

        let order = router
            .build_order_on(&intent, &stamp(), "20240101")
            .await
            .unwrap();
        assert_eq!(order.offset, Offset::CloseToday);
    }

    #[tokio::test]
    async fn fak_and_fok_set_conditions() {
        let router = make_router().await;
        let mut intent = OrderIntent {
            symbol: "au2406".to_string(),
            price: Decimal::new(5000, 1),
            volume: 3,
            price_type: PriceType::Fak,
            action: TradeAction::Buy,
            trade_date: None,
        };

        let fak = router
            .build_order_on(&intent, &stamp(), "20240101")
            .await
            .unwrap();
        assert_eq!(fak.price_kind, PriceKind::Limit);
        assert_eq!(fak.time_condition, TimeCondition::ImmediateOrCancel);
        assert_eq!(fak.volume_condition, VolumeCondition::Any);

        intent.price_type = PriceType::Fok;
        let fok = router
            .build_order_on(&intent, &stamp(), "20240101")
            .await
            .unwrap();
        assert_eq!(fok.time_condition, TimeCondition::ImmediateOrCancel);
        assert_eq!(fok.volume_condition, VolumeCondition::All);
    }

    #[tokio::test]
    async fn consecutive_orders_draw_distinct_refs() {
        let router = make_router().await;
        let intent = OrderIntent {
            symbol: "au2406".to_string(),
            price: Decimal::new(5000, 1),
            volume: 1,
            price_type: PriceType::Limit,
            action: TradeAction::Buy,
            trade_date: None,
        };

        let first = router
            .build_order_on(&intent, &stamp(), "20240101")
            .await
            .unwrap();
        let second = router
            .build_order_on(&intent, &stamp(), "20240101")
            .await
            .unwrap();
        assert_ne!(first.order_ref, second.order_ref);
    }

    #[tokio::test]
    async fn build_cancel_packages_identity() {
        let router = make_router().await;
        let cancel = router.build_cancel("au2406", "SHFE", "7", 2, 30_000, &stamp());
        assert_eq!(cancel.symbol, "au2406");
        assert_eq!(cancel.exchange_id, "SHFE");
        assert_eq!(cancel.order_ref, "7");
        assert_eq!(cancel.front_id, 2);
        assert_eq!(cancel.session_id, 30_000);
        assert_eq!(cancel.investor_id, "126077");
    }
}
