//! Session: one consumer's logical connection to the exchange.
//!
//! A session ties together the connector, the login state machine, the
//! request correlator and the event relay. The connector's callbacks are
//! drained by a single dispatch task which owns every state mutation; the
//! consumer polls the relay cooperatively and reads state through
//! snapshots.

mod correlator;
mod manager;
mod relay;

pub use correlator::{ActiveOrderKey, RequestCorrelator};
pub use manager::{SessionManager, SessionState, SessionStatus};
pub use relay::EventRelay;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::connector::{ConnectorCallback, ConnectorError, ExchangeConnector};
use crate::instruments::InstrumentDirectory;
use crate::models::{
    CancelIntent, CancelRejection, CancelRequest, Credentials, ExchangeError, GatewayEvent,
    OrderIntent, OrderRejection, OrderRequest, SessionStamp,
};
use crate::router::{OrderRouter, RouterError, today_string};
use crate::store::{KvStore, order_audit_key, trade_audit_key};

/// Poll interval used while waiting for readiness.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Errors from session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session has been closed.
    #[error("session is closed")]
    Closed,

    /// The session is not yet ready for trading or query operations.
    #[error("session not ready for trading (state: {0})")]
    NotReady(SessionState),

    /// Login or authentication failed; the session must be recreated.
    #[error("login failed: {0}")]
    LoginFailed(ExchangeError),

    /// The caller's readiness budget ran out.
    #[error("timed out waiting for session readiness")]
    ReadyTimeout,

    /// Order building failed.
    #[error(transparent)]
    Router(#[from] RouterError),

    /// The connector refused the request.
    #[error(transparent)]
    Connector(#[from] ConnectorError),
}

/// One logical exchange connection, owned by exactly one consumer.
pub struct Session {
    id: Uuid,
    connector: Arc<dyn ExchangeConnector>,
    manager: Arc<Mutex<SessionManager>>,
    relay: Arc<EventRelay>,
    router: Arc<OrderRouter>,
    request_seq: Arc<AtomicU64>,
    investor_id: String,
    broker_id: String,
    closed: Arc<AtomicBool>,
    dispatch: JoinHandle<()>,
}

impl Session {
    /// Open a session: start the dispatch task and initiate the
    /// connection. Fails synchronously only when the connector cannot be
    /// opened; everything after that arrives as events.
    pub async fn open(
        connector: Arc<dyn ExchangeConnector>,
        callbacks: UnboundedReceiver<ConnectorCallback>,
        credentials: Credentials,
        router: Arc<OrderRouter>,
        directory: Arc<InstrumentDirectory>,
        store: Arc<dyn KvStore>,
    ) -> Result<Self, ConnectorError> {
        let id = Uuid::new_v4();
        let request_seq = Arc::new(AtomicU64::new(0));
        let relay = Arc::new(EventRelay::new());
        let manager = Arc::new(Mutex::new(SessionManager::new(
            Arc::clone(&connector),
            credentials.clone(),
            Arc::clone(&request_seq),
        )));

        if let Err(error) = manager.lock().await.connect().await {
            // The connector must be released even when opening fails.
            let _ = connector.disconnect().await;
            return Err(error);
        }

        let dispatch = tokio::spawn(run_dispatch(
            id,
            callbacks,
            Arc::clone(&manager),
            Arc::clone(&relay),
            directory,
            store,
        ));

        tracing::info!(session = %id, user_id = %credentials.user_id, "session opened");
        Ok(Self {
            id,
            connector,
            manager,
            relay,
            router,
            request_seq,
            investor_id: credentials.user_id,
            broker_id: credentials.broker_id,
            closed: Arc::new(AtomicBool::new(false)),
            dispatch,
        })
    }

    /// Session instance identifier, for logs.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Re-drive the connection. Idempotent; a latched login failure is
    /// never retried.
    pub async fn connect(&self) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.manager.lock().await.connect().await?;
        Ok(())
    }

    /// Current status snapshot.
    pub async fn status(&self) -> SessionStatus {
        self.manager.lock().await.status()
    }

    /// Poll the next consumer-visible event. `None` means no event yet.
    #[must_use]
    pub fn poll_event(&self) -> Option<GatewayEvent> {
        self.relay.poll()
    }

    /// The session's event relay.
    #[must_use]
    pub fn relay(&self) -> &Arc<EventRelay> {
        &self.relay
    }

    /// Wait until the session is ready for trading, within the caller's
    /// own budget. Fails fast once a login failure is latched.
    pub async fn wait_until_ready(&self, budget: Duration) -> Result<(), SessionError> {
        let deadline = Instant::now() + budget;
        loop {
            self.ensure_open()?;
            let status = self.status().await;
            if let Some(error) = status.login_error {
                return Err(SessionError::LoginFailed(error));
            }
            if status.state.is_trading_ready() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SessionError::ReadyTimeout);
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    /// Build and submit an order from a trade intent.
    ///
    /// Returns the exchange-ready request so the consumer can keep its
    /// correlation identity (order_ref, front/session ids) for a later
    /// cancel. The outcome arrives through the relay.
    pub async fn submit_order(&self, intent: &OrderIntent) -> Result<OrderRequest, SessionError> {
        self.ensure_open()?;
        let stamp = self.trading_stamp().await?;

        let mut order = self.router.build_order(intent, &stamp).await?;
        order.request_id = self.request_seq.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::info!(
            session = %self.id,
            symbol = %order.symbol,
            order_ref = %order.order_ref,
            direction = ?order.direction,
            offset = ?order.offset,
            volume = order.volume,
            "submitting order"
        );
        self.connector.insert_order(&order).await?;
        Ok(order)
    }

    /// Submit a cancel for a previously submitted order.
    pub async fn cancel_order(&self, intent: &CancelIntent) -> Result<CancelRequest, SessionError> {
        self.ensure_open()?;
        let stamp = self.trading_stamp().await?;

        let cancel = self.router.build_cancel(
            &intent.symbol,
            &intent.exchange_id,
            &intent.order_ref,
            intent.front_id,
            intent.session_id,
            &stamp,
        );
        self.request_seq.fetch_add(1, Ordering::SeqCst);

        tracing::info!(
            session = %self.id,
            symbol = %cancel.symbol,
            order_ref = %cancel.order_ref,
            "submitting cancel"
        );
        self.connector.cancel_order(&cancel).await?;
        Ok(cancel)
    }

    /// Request an account funds snapshot; the result arrives through the
    /// relay as an `account` envelope.
    pub async fn query_account(&self) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.request_seq.fetch_add(1, Ordering::SeqCst);
        self.connector.query_account().await?;
        Ok(())
    }

    /// Request position records; results arrive as `position` envelopes.
    pub async fn query_position(&self) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.request_seq.fetch_add(1, Ordering::SeqCst);
        self.connector.query_position().await?;
        Ok(())
    }

    /// Close the session: discard outstanding events and release the
    /// connector. Idempotent; the connector is released exactly once no
    /// matter how many paths reach here.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!(session = %self.id, "closing session");
        self.relay.close();
        if let Err(error) = self.connector.disconnect().await {
            tracing::debug!(session = %self.id, %error, "connector already released");
        }
        self.dispatch.abort();
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SessionError::Closed);
        }
        Ok(())
    }

    async fn trading_stamp(&self) -> Result<SessionStamp, SessionError> {
        let status = self.status().await;
        if let Some(error) = status.login_error {
            return Err(SessionError::LoginFailed(error));
        }
        if !status.state.is_trading_ready() {
            return Err(SessionError::NotReady(status.state));
        }
        Ok(SessionStamp {
            front_id: status.front_id,
            session_id: status.session_id,
            investor_id: self.investor_id.clone(),
            broker_id: self.broker_id.clone(),
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // Backstop for exit paths that skipped close(); the connector must
        // still be released exactly once.
        tracing::warn!(session = %self.id, "session dropped without close; releasing connector");
        self.relay.close();
        self.dispatch.abort();
        let connector = Arc::clone(&self.connector);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = connector.disconnect().await;
            });
        }
    }
}

/// Drain connector callbacks: drive the state machine, correlate order and
/// trade facts, refresh the instrument directory and feed the relay.
async fn run_dispatch(
    session: Uuid,
    mut callbacks: UnboundedReceiver<ConnectorCallback>,
    manager: Arc<Mutex<SessionManager>>,
    relay: Arc<EventRelay>,
    directory: Arc<InstrumentDirectory>,
    store: Arc<dyn KvStore>,
) {
    let mut correlator = RequestCorrelator::new();

    while let Some(callback) = callbacks.recv().await {
        match callback {
            flow @ (ConnectorCallback::Connected
            | ConnectorCallback::Disconnected
            | ConnectorCallback::Authenticated(_)
            | ConnectorCallback::LoggedIn(_)
            | ConnectorCallback::SettlementConfirmed) => {
                if let ConnectorCallback::LoggedIn(Ok(grant)) = &flow {
                    correlator.bind(grant.front_id, grant.session_id);
                }
                manager.lock().await.handle(&flow).await;
            }
            ConnectorCallback::Instrument(record) => {
                let day = today_string();
                if let Err(error) = directory.upsert(&record, &day).await {
                    tracing::warn!(session = %session, symbol = %record.symbol, %error,
                        "instrument upsert failed");
                }
            }
            ConnectorCallback::Account(snapshot) => {
                relay.push(GatewayEvent::Account(snapshot));
            }
            ConnectorCallback::Position(record) => {
                relay.push(GatewayEvent::Position(record));
            }
            ConnectorCallback::InsertRejected { order, error } => {
                relay.push(GatewayEvent::OnRspOrderInsert(OrderRejection::new(
                    order, error,
                )));
            }
            ConnectorCallback::InsertFailed { order, error } => {
                relay.push(GatewayEvent::OnErrRtnOrderInsert(OrderRejection::new(
                    order, error,
                )));
            }
            ConnectorCallback::OrderUpdate(event) => {
                if correlator.observe_order(&event) {
                    audit(&store, &order_audit_key(&today_string()), &event).await;
                    relay.push(GatewayEvent::OnRtnOrder(event));
                }
            }
            ConnectorCallback::TradeExecuted(event) => {
                if correlator.observe_trade(&event) {
                    audit(&store, &trade_audit_key(&today_string()), &event).await;
                    relay.push(GatewayEvent::OnRtnTrade(event));
                }
            }
            ConnectorCallback::CancelRejected { cancel, error } => {
                relay.push(GatewayEvent::OnRspOrderAction(CancelRejection::new(
                    cancel, error,
                )));
            }
            ConnectorCallback::CancelFailed { cancel, error } => {
                relay.push(GatewayEvent::OnErrRtnOrderAction(CancelRejection::new(
                    cancel, error,
                )));
            }
        }
    }

    tracing::debug!(session = %session, "callback channel closed; dispatch ending");
}

/// Write-behind audit trail; never read by the core, failures only warn.
async fn audit<T: Serialize>(store: &Arc<dyn KvStore>, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => {
            if let Err(error) = store.list_push_back(key, &json).await {
                tracing::warn!(key, %error, "audit write failed");
            }
        }
        Err(error) => tracing::warn!(key, %error, "audit serialization failed"),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::allocator::OrderIdAllocator;
    use crate::connector::{MockBehavior, MockConnector};
    use crate::models::{Direction, Offset, OrderStatus, PriceKind, PriceType, TradeAction};
    use crate::store::InMemoryKvStore;

    use super::*;

    struct Fixture {
        session: Session,
        connector: Arc<MockConnector>,
        store: Arc<dyn KvStore>,
    }

    async fn open_session(behavior: MockBehavior) -> Fixture {
        let (connector, callbacks) = MockConnector::with_behavior(behavior);
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let directory = Arc::new(InstrumentDirectory::new(Arc::clone(&store)));
        let allocator = Arc::new(OrderIdAllocator::new(Arc::clone(&store)));
        allocator.seed(100).await.unwrap();
        let router = Arc::new(OrderRouter::new(Arc::clone(&directory), allocator));

        let session = Session::open(
            Arc::clone(&connector) as Arc<dyn ExchangeConnector>,
            callbacks,
            credentials(),
            router,
            directory,
            Arc::clone(&store),
        )
        .await
        .unwrap();

        Fixture {
            session,
            connector,
            store,
        }
    }

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

    fn buy_intent() -> OrderIntent {
        OrderIntent {
            symbol: "au2406".to_string(),
            price: Decimal::new(5000, 1),
            volume: 1,
            price_type: PriceType::Limit,
            action: TradeAction::Buy,
            trade_date: None,
        }
    }

    async fn next_event(session: &Session) -> GatewayEvent {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Some(event) = session.poll_event() {
                    return event;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("no event within budget")
    }

    #[tokio::test]
    async fn submit_before_ready_is_rejected() {
        let behavior = MockBehavior {
            fail_login: Some(ExchangeError {
                code: 3,
                message: "invalid password".to_string(),
            }),
            ..MockBehavior::default()
        };
        let fixture = open_session(behavior).await;

        let result = fixture
            .session
            .wait_until_ready(Duration::from_millis(400))
            .await;
        assert!(matches!(result, Err(SessionError::LoginFailed(_))));

        let result = fixture.session.submit_order(&buy_intent()).await;
        assert!(matches!(result, Err(SessionError::LoginFailed(_))));
        fixture.session.close().await;
    }

    #[tokio::test]
    async fn order_lifecycle_flows_through_relay_in_order() {
        let fixture = open_session(MockBehavior::default()).await;
        fixture
            .session
            .wait_until_ready(Duration::from_secs(2))
            .await
            .unwrap();

        let status = fixture.session.status().await;
        let order = fixture.session.submit_order(&buy_intent()).await.unwrap();
        assert_eq!(order.direction, Direction::Long);
        assert_eq!(order.offset, Offset::Open);
        assert_eq!(order.price_kind, PriceKind::Limit);
        assert!(!order.order_ref.is_empty());
        assert_eq!(order.front_id, status.front_id);
        assert_eq!(order.session_id, status.session_id);

        // Acceptance first, fill second; exactly the production order.
        match next_event(&fixture.session).await {
            GatewayEvent::OnRtnOrder(event) => {
                assert_eq!(event.order_ref, order.order_ref);
                assert_eq!(event.status, OrderStatus::NoTradeQueueing);
            }
            other => panic!("expected order update, got {other:?}"),
        }
        match next_event(&fixture.session).await {
            GatewayEvent::OnRtnTrade(event) => {
                assert_eq!(event.order_ref, order.order_ref);
                assert_eq!(event.volume, order.volume);
            }
            other => panic!("expected trade, got {other:?}"),
        }

        fixture.session.close().await;
    }

    #[tokio::test]
    async fn stale_callbacks_never_reach_the_relay() {
        let fixture = open_session(MockBehavior {
            fill_orders: false,
            ..MockBehavior::default()
        })
        .await;
        fixture
            .session
            .wait_until_ready(Duration::from_secs(2))
            .await
            .unwrap();

        let order = fixture.session.submit_order(&buy_intent()).await.unwrap();
        // Consume the acceptance so the active-order key is recorded.
        match next_event(&fixture.session).await {
            GatewayEvent::OnRtnOrder(_) => {}
            other => panic!("expected order update, got {other:?}"),
        }

        // An update from a previous incarnation and a fill for some other
        // order must both be dropped silently.
        fixture
            .connector
            .push(ConnectorCallback::OrderUpdate(crate::models::OrderEvent {
                symbol: "au2406".to_string(),
                exchange_id: "SHFE".to_string(),
                order_sys_id: "9999".to_string(),
                order_ref: order.order_ref.clone(),
                front_id: order.front_id + 1,
                session_id: order.session_id,
                direction: Direction::Long,
                offset: Offset::Open,
                price: order.price,
                volume: 1,
                traded_volume: 0,
                status: OrderStatus::NoTradeQueueing,
                status_msg: String::new(),
                insert_time: "09:30:00".to_string(),
                cancel_time: String::new(),
            }));
        fixture
            .connector
            .push(ConnectorCallback::TradeExecuted(crate::models::TradeEvent {
                symbol: "au2406".to_string(),
                exchange_id: "DCE".to_string(),
                order_sys_id: "1000".to_string(),
                order_ref: order.order_ref.clone(),
                trade_id: "T9".to_string(),
                direction: Direction::Long,
                offset: Offset::Open,
                price: order.price,
                volume: 1,
                trade_time: "09:30:01".to_string(),
            }));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(fixture.session.poll_event().is_none());

        fixture.session.close().await;
    }

    #[tokio::test]
    async fn accepted_lifecycle_lands_in_audit_lists() {
        let fixture = open_session(MockBehavior::default()).await;
        fixture
            .session
            .wait_until_ready(Duration::from_secs(2))
            .await
            .unwrap();

        fixture.session.submit_order(&buy_intent()).await.unwrap();
        next_event(&fixture.session).await;
        next_event(&fixture.session).await;

        let day = today_string();
        assert_eq!(fixture.store.list_len(&order_audit_key(&day)).await.unwrap(), 1);
        assert_eq!(fixture.store.list_len(&trade_audit_key(&day)).await.unwrap(), 1);

        fixture.session.close().await;
    }

    #[tokio::test]
    async fn close_is_idempotent_and_releases_once() {
        let fixture = open_session(MockBehavior::default()).await;
        fixture
            .session
            .wait_until_ready(Duration::from_secs(2))
            .await
            .unwrap();

        fixture.session.close().await;
        fixture.session.close().await;

        assert!(matches!(
            fixture.session.submit_order(&buy_intent()).await,
            Err(SessionError::Closed)
        ));
        assert!(fixture.session.poll_event().is_none());

        // The connector was released: its requests now fail.
        assert!(fixture.connector.connect().await.is_err());
    }

    #[tokio::test]
    async fn rejected_insert_surfaces_as_counter_rejection() {
        let fixture = open_session(MockBehavior {
            reject_orders: Some(ExchangeError {
                code: 22,
                message: "insufficient margin".to_string(),
            }),
            ..MockBehavior::default()
        })
        .await;
        fixture
            .session
            .wait_until_ready(Duration::from_secs(2))
            .await
            .unwrap();

        fixture.session.submit_order(&buy_intent()).await.unwrap();
        match next_event(&fixture.session).await {
            GatewayEvent::OnRspOrderInsert(rejection) => {
                assert_eq!(rejection.error_id, 22);
            }
            other => panic!("expected rejection, got {other:?}"),
        }

        fixture.session.close().await;
    }

    #[tokio::test]
    async fn account_query_round_trips_through_relay() {
        let fixture = open_session(MockBehavior::default()).await;
        fixture
            .session
            .wait_until_ready(Duration::from_secs(2))
            .await
            .unwrap();

        fixture.session.query_account().await.unwrap();
        match next_event(&fixture.session).await {
            GatewayEvent::Account(snapshot) => {
                assert_eq!(snapshot.account_id, "126077");
            }
            other => panic!("expected account snapshot, got {other:?}"),
        }

        fixture.session.close().await;
    }
}
