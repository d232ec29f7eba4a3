//! Scripted connector for tests and local runs.
//!
//! Returns simulated callbacks without any native connectivity. The login
//! flow, instrument refresh, order acceptance and fills follow a
//! configurable script; tests can also inject callbacks by hand.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::models::{
    AccountFunds, AccountSnapshot, CancelRequest, Credentials, Direction, ExchangeError,
    InstrumentRecord, OrderEvent, OrderRequest, OrderStatus, PositionRecord, TradeEvent,
};

use super::{ConnectorCallback, ConnectorError, ConnectorFactory, ExchangeConnector, LoginGrant};

/// Script controlling how the mock connector responds.
#[derive(Debug, Clone)]
pub struct MockBehavior {
    /// Front ID granted at login.
    pub front_id: i32,
    /// Session ID granted at login.
    pub session_id: i64,
    /// When set, authentication fails with this error.
    pub fail_auth: Option<ExchangeError>,
    /// When set, login fails with this error.
    pub fail_login: Option<ExchangeError>,
    /// When set, order insertion is rejected at the counter.
    pub reject_orders: Option<ExchangeError>,
    /// Emit a trade execution right after accepting an order.
    pub fill_orders: bool,
    /// Instrument records returned by the instrument query.
    pub instruments: Vec<InstrumentRecord>,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            front_id: 1,
            session_id: 20_001,
            fail_auth: None,
            fail_login: None,
            reject_orders: None,
            fill_orders: true,
            instruments: default_instruments(),
        }
    }
}

/// A small instrument universe covering both position-aging and uniform
/// exchanges.
#[must_use]
pub fn default_instruments() -> Vec<InstrumentRecord> {
    vec![
        instrument("au2406", "Gold 2406", "SHFE", "au", Decimal::new(2, 2), 1000),
        instrument("zn2409", "Zinc 2409", "SHFE", "zn", Decimal::new(5, 0), 5),
        instrument("m2409", "Soymeal 2409", "DCE", "m", Decimal::new(1, 0), 10),
    ]
}

fn instrument(
    symbol: &str,
    name: &str,
    exchange_id: &str,
    product_id: &str,
    price_tick: Decimal,
    volume_multiple: i32,
) -> InstrumentRecord {
    InstrumentRecord {
        symbol: symbol.to_string(),
        name: name.to_string(),
        exchange_id: exchange_id.to_string(),
        product_id: product_id.to_string(),
        price_tick,
        volume_multiple,
        min_buy_volume: 1,
        max_limit_order_volume: 500,
        open_date: "20230816".to_string(),
        end_deliv_date: "20240621".to_string(),
    }
}

/// Scripted implementation of [`ExchangeConnector`].
pub struct MockConnector {
    behavior: MockBehavior,
    exchange_by_symbol: HashMap<String, String>,
    sender: Mutex<Option<UnboundedSender<ConnectorCallback>>>,
    connect_calls: AtomicUsize,
    login_calls: AtomicUsize,
    order_sys_seq: AtomicU64,
}

impl MockConnector {
    /// Create a connector with the default script.
    #[must_use]
    pub fn new() -> (Arc<Self>, UnboundedReceiver<ConnectorCallback>) {
        Self::with_behavior(MockBehavior::default())
    }

    /// Create a connector with a custom script.
    #[must_use]
    pub fn with_behavior(
        behavior: MockBehavior,
    ) -> (Arc<Self>, UnboundedReceiver<ConnectorCallback>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let exchange_by_symbol = behavior
            .instruments
            .iter()
            .map(|i| (i.symbol.clone(), i.exchange_id.clone()))
            .collect();
        let connector = Arc::new(Self {
            behavior,
            exchange_by_symbol,
            sender: Mutex::new(Some(tx)),
            connect_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
            order_sys_seq: AtomicU64::new(1000),
        });
        (connector, rx)
    }

    /// How many times `connect` was invoked.
    #[must_use]
    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    /// How many times `login` was invoked.
    #[must_use]
    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    /// Inject a callback by hand, as if the exchange had emitted it.
    pub fn push(&self, callback: ConnectorCallback) {
        self.emit(callback);
    }

    fn emit(&self, callback: ConnectorCallback) {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = sender.as_ref() {
            // Receiver gone means the session is tearing down; nothing to do.
            let _ = tx.send(callback);
        }
    }

    fn ensure_open(&self) -> Result<(), ConnectorError> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if sender.is_some() {
            Ok(())
        } else {
            Err(ConnectorError::Closed)
        }
    }

    fn exchange_for(&self, symbol: &str) -> String {
        self.exchange_by_symbol
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| "UNKNOWN".to_string())
    }
}

#[async_trait]
impl ExchangeConnector for MockConnector {
    async fn connect(&self) -> Result<(), ConnectorError> {
        self.ensure_open()?;
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.emit(ConnectorCallback::Connected);
        Ok(())
    }

    async fn authenticate(&self, _credentials: &Credentials) -> Result<(), ConnectorError> {
        self.ensure_open()?;
        let result = match &self.behavior.fail_auth {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        };
        self.emit(ConnectorCallback::Authenticated(result));
        Ok(())
    }

    async fn login(&self, _credentials: &Credentials) -> Result<(), ConnectorError> {
        self.ensure_open()?;
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        let result = match &self.behavior.fail_login {
            Some(error) => Err(error.clone()),
            None => Ok(LoginGrant {
                front_id: self.behavior.front_id,
                session_id: self.behavior.session_id,
            }),
        };
        self.emit(ConnectorCallback::LoggedIn(result));
        Ok(())
    }

    async fn confirm_settlement(&self, _credentials: &Credentials) -> Result<(), ConnectorError> {
        self.ensure_open()?;
        self.emit(ConnectorCallback::SettlementConfirmed);
        Ok(())
    }

    async fn query_instruments(&self) -> Result<(), ConnectorError> {
        self.ensure_open()?;
        for record in &self.behavior.instruments {
            self.emit(ConnectorCallback::Instrument(record.clone()));
        }
        Ok(())
    }

    async fn query_account(&self) -> Result<(), ConnectorError> {
        self.ensure_open()?;
        let funds = AccountFunds {
            account_id: "126077".to_string(),
            pre_balance: Decimal::new(1_000_000, 0),
            available: Decimal::new(950_000, 0),
            curr_margin: Decimal::new(50_000, 0),
            commission: Decimal::new(120, 0),
            ..AccountFunds::default()
        };
        self.emit(ConnectorCallback::Account(AccountSnapshot::from_funds(
            funds,
        )));
        Ok(())
    }

    async fn query_position(&self) -> Result<(), ConnectorError> {
        self.ensure_open()?;
        self.emit(ConnectorCallback::Position(PositionRecord {
            symbol: "au2406".to_string(),
            direction: Direction::Long,
            position: 2,
            yd_position: 1,
            today_position: 1,
            position_cost: Decimal::new(998_000, 0),
            position_profit: Decimal::new(1_200, 0),
            frozen: 0,
            trade_date: "20240101".to_string(),
        }));
        Ok(())
    }

    async fn insert_order(&self, order: &OrderRequest) -> Result<(), ConnectorError> {
        self.ensure_open()?;
        if let Some(error) = &self.behavior.reject_orders {
            self.emit(ConnectorCallback::InsertRejected {
                order: order.clone(),
                error: error.clone(),
            });
            return Ok(());
        }

        let sys_id = self.order_sys_seq.fetch_add(1, Ordering::SeqCst);
        let exchange_id = self.exchange_for(&order.symbol);
        // Real fronts pad the order-system ID; keep that texture so the
        // trim rule in correlation stays exercised.
        let padded_sys_id = format!("{sys_id:>12}");

        self.emit(ConnectorCallback::OrderUpdate(OrderEvent {
            symbol: order.symbol.clone(),
            exchange_id: exchange_id.clone(),
            order_sys_id: padded_sys_id,
            order_ref: order.order_ref.clone(),
            front_id: order.front_id,
            session_id: order.session_id,
            direction: order.direction,
            offset: order.offset,
            price: order.price,
            volume: order.volume,
            traded_volume: 0,
            status: OrderStatus::NoTradeQueueing,
            status_msg: "queueing".to_string(),
            insert_time: "09:30:00".to_string(),
            cancel_time: String::new(),
        }));

        if self.behavior.fill_orders {
            self.emit(ConnectorCallback::TradeExecuted(TradeEvent {
                symbol: order.symbol.clone(),
                exchange_id,
                order_sys_id: sys_id.to_string(),
                order_ref: order.order_ref.clone(),
                trade_id: format!("T{sys_id}"),
                direction: order.direction,
                offset: order.offset,
                price: order.price,
                volume: order.volume,
                trade_time: "09:30:01".to_string(),
            }));
        }
        Ok(())
    }

    async fn cancel_order(&self, cancel: &CancelRequest) -> Result<(), ConnectorError> {
        self.ensure_open()?;
        let sys_id = self.order_sys_seq.load(Ordering::SeqCst).saturating_sub(1);
        self.emit(ConnectorCallback::OrderUpdate(OrderEvent {
            symbol: cancel.symbol.clone(),
            exchange_id: cancel.exchange_id.clone(),
            order_sys_id: format!("{sys_id:>12}"),
            order_ref: cancel.order_ref.clone(),
            front_id: cancel.front_id,
            session_id: cancel.session_id,
            direction: Direction::Long,
            offset: crate::models::Offset::Open,
            price: Decimal::ZERO,
            volume: 0,
            traded_volume: 0,
            status: OrderStatus::Canceled,
            status_msg: "canceled by client".to_string(),
            insert_time: "09:30:00".to_string(),
            cancel_time: "09:31:00".to_string(),
        }));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ConnectorError> {
        let mut sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = sender.take() {
            let _ = tx.send(ConnectorCallback::Disconnected);
        }
        Ok(())
    }
}

/// Factory producing scripted connectors, one per session.
pub struct MockConnectorFactory {
    behavior: MockBehavior,
}

impl MockConnectorFactory {
    /// Factory with the default script.
    #[must_use]
    pub fn new() -> Self {
        Self {
            behavior: MockBehavior::default(),
        }
    }

    /// Factory with a custom script applied to every connector it opens.
    #[must_use]
    pub fn with_behavior(behavior: MockBehavior) -> Self {
        Self { behavior }
    }
}

impl Default for MockConnectorFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectorFactory for MockConnectorFactory {
    fn open(
        &self,
        _address: &str,
    ) -> (
        Arc<dyn ExchangeConnector>,
        UnboundedReceiver<ConnectorCallback>,
    ) {
        let (connector, rx) = MockConnector::with_behavior(self.behavior.clone());
        (connector, rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            user_id: "126077".to_string(),
            password: "secret".to_string(),
            broker_id: "9999".to_string(),
            address: "tcp://127.0.0.1:10003".to_string(),
            auth_code: None,
            user_product_info: None,
        }
    }

    #[tokio::test]
    async fn connect_emits_connected() {
        let (connector, mut rx) = MockConnector::new();
        connector.connect().await.unwrap();
        assert!(matches!(rx.recv().await, Some(ConnectorCallback::Connected)));
        assert_eq!(connector.connect_calls(), 1);
    }

    #[tokio::test]
    async fn login_failure_follows_script() {
        let behavior = MockBehavior {
            fail_login: Some(ExchangeError {
                code: 3,
                message: "invalid password".to_string(),
            }),
            ..MockBehavior::default()
        };
        let (connector, mut rx) = MockConnector::with_behavior(behavior);
        connector.login(&credentials()).await.unwrap();
        match rx.recv().await {
            Some(ConnectorCallback::LoggedIn(Err(error))) => assert_eq!(error.code, 3),
            other => panic!("unexpected callback: {other:?}"),
        }
    }

    #[tokio::test]
    async fn requests_after_disconnect_are_rejected() {
        let (connector, _rx) = MockConnector::new();
        connector.disconnect().await.unwrap();
        assert!(matches!(
            connector.connect().await,
            Err(ConnectorError::Closed)
        ));
    }

    #[tokio::test]
    async fn order_sys_id_is_padded_on_updates() {
        let (connector, mut rx) = MockConnector::new();
        let order = OrderRequest {
            symbol: "au2406".to_string(),
            direction: Direction::Long,
            offset: crate::models::Offset::Open,
            price_kind: crate::models::PriceKind::Limit,
            price: Decimal::new(5000, 1),
            volume: 1,
            time_condition: crate::models::TimeCondition::GoodForDay,
            volume_condition: crate::models::VolumeCondition::Any,
            min_volume: 1,
            order_ref: "1".to_string(),
            investor_id: "126077".to_string(),
            broker_id: "9999".to_string(),
            front_id: 1,
            session_id: 20_001,
            request_id: 1,
        };
        connector.insert_order(&order).await.unwrap();
        match rx.recv().await {
            Some(ConnectorCallback::OrderUpdate(ev)) => {
                assert_ne!(ev.order_sys_id, ev.order_sys_id.trim());
                assert_eq!(ev.exchange_id, "SHFE");
            }
            other => panic!("unexpected callback: {other:?}"),
        }
    }
}
