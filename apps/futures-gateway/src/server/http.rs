//! HTTP handlers: SSE streaming for orders, cancels and queries.

use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;

use crate::models::{CancelIntent, Credentials, GatewayEvent, OrderIntent, PriceType, TradeAction};
use crate::router::today_string;
use crate::session::Session;

use super::request::{CancelOrderBody, CredentialsParams, SendOrderBody};
use super::AppState;

/// Handler-owned budget for reaching trading readiness.
const READY_BUDGET: Duration = Duration::from_secs(10);

/// Bounded backoff between relay polls.
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Interval between periodic account/position queries.
const QUERY_INTERVAL: Duration = Duration::from_secs(1);

type EventSender = mpsc::Sender<Result<Event, Infallible>>;

/// Liveness endpoint.
pub(super) async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `POST /v1/send_order`: submit an order and stream its lifecycle events
/// until a terminal event or client disconnect.
pub(super) async fn send_order(
    State(state): State<AppState>,
    Json(body): Json<SendOrderBody>,
) -> Response {
    let price_type = match body.price_type.parse::<PriceType>() {
        Ok(price_type) => price_type,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, 4000, &msg),
    };
    let action = match body.order_type.parse::<TradeAction>() {
        Ok(action) => action,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, 4000, &msg),
    };
    let Ok(price) = Decimal::try_from(body.price) else {
        return error_response(StatusCode::BAD_REQUEST, 4000, "price is not a valid number");
    };

    let intent = OrderIntent {
        symbol: body.symbol,
        price,
        volume: body.volume,
        price_type,
        action,
        trade_date: body.trade_date.filter(|date| !date.is_empty()),
    };
    let credentials = state.credentials(body.credentials);

    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(run_order_stream(state, credentials, intent, tx));
    sse_response(rx)
}

/// `POST /v1/cancel_order`: submit a cancel and stream until the cancel is
/// acknowledged or rejected.
pub(super) async fn cancel_order(
    State(state): State<AppState>,
    Json(body): Json<CancelOrderBody>,
) -> Response {
    let intent = CancelIntent {
        symbol: body.symbol,
        exchange_id: body.exchange,
        order_ref: body.order_id,
        front_id: body.front_id,
        session_id: body.session_id,
    };
    let credentials = state.credentials(body.credentials);

    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(run_cancel_stream(state, credentials, intent, tx));
    sse_response(rx)
}

/// `GET /v1/account`: stream periodic account snapshots.
pub(super) async fn account(
    State(state): State<AppState>,
    Query(params): Query<CredentialsParams>,
) -> Response {
    let credentials = state.credentials(params);
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(run_query_stream(state, credentials, QueryKind::Account, tx));
    sse_response(rx)
}

/// `GET /v1/position`: stream periodic position records.
pub(super) async fn position(
    State(state): State<AppState>,
    Query(params): Query<CredentialsParams>,
) -> Response {
    let credentials = state.credentials(params);
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(run_query_stream(state, credentials, QueryKind::Position, tx));
    sse_response(rx)
}

/// `GET /v1/instrument_list`: today's instrument records.
pub(super) async fn instrument_list(State(state): State<AppState>) -> Response {
    match state.directory.records_for_day(&today_string()).await {
        Ok(records) => Json(records).into_response(),
        Err(error) => error_response(StatusCode::INTERNAL_SERVER_ERROR, 5000, &error.to_string()),
    }
}

async fn run_order_stream(
    state: AppState,
    credentials: Credentials,
    intent: OrderIntent,
    tx: EventSender,
) {
    let Some(session) = open_ready_session(&state, credentials, &tx).await else {
        return;
    };

    match session.submit_order(&intent).await {
        Ok(order) => {
            tracing::info!(order_ref = %order.order_ref, "order submitted; streaming lifecycle");
        }
        Err(error) => {
            send_error(&tx, 5000, &error.to_string()).await;
            session.close().await;
            return;
        }
    }

    stream_until(&session, &tx, GatewayEvent::is_order_terminal).await;
    session.close().await;
}

async fn run_cancel_stream(
    state: AppState,
    credentials: Credentials,
    intent: CancelIntent,
    tx: EventSender,
) {
    let Some(session) = open_ready_session(&state, credentials, &tx).await else {
        return;
    };

    if let Err(error) = session.cancel_order(&intent).await {
        send_error(&tx, 5000, &error.to_string()).await;
        session.close().await;
        return;
    }

    stream_until(&session, &tx, GatewayEvent::is_cancel_terminal).await;
    session.close().await;
}

/// Which periodic query a streaming consumer asked for.
enum QueryKind {
    Account,
    Position,
}

async fn run_query_stream(
    state: AppState,
    credentials: Credentials,
    kind: QueryKind,
    tx: EventSender,
) {
    let Some(session) = open_ready_session(&state, credentials, &tx).await else {
        return;
    };

    'stream: while !tx.is_closed() {
        let issued = match kind {
            QueryKind::Account => session.query_account().await,
            QueryKind::Position => session.query_position().await,
        };
        if let Err(error) = issued {
            send_error(&tx, 5000, &error.to_string()).await;
            break;
        }

        let deadline = Instant::now() + QUERY_INTERVAL;
        while Instant::now() < deadline {
            match session.poll_event() {
                Some(event) => {
                    let wanted = matches!(
                        (&kind, &event),
                        (QueryKind::Account, GatewayEvent::Account(_))
                            | (QueryKind::Position, GatewayEvent::Position(_))
                    );
                    if wanted && send_event(&tx, &event).await.is_err() {
                        break 'stream;
                    }
                }
                None => tokio::time::sleep(EVENT_POLL_INTERVAL).await,
            }
        }
    }

    session.close().await;
}

/// Open a session and wait for trading readiness, reporting failures to
/// the consumer. Returns `None` when the stream is already finished.
async fn open_ready_session(
    state: &AppState,
    credentials: Credentials,
    tx: &EventSender,
) -> Option<Session> {
    let session = match state.open_session(credentials).await {
        Ok(session) => session,
        Err(error) => {
            send_error(tx, 5000, &format!("cannot open connector: {error}")).await;
            return None;
        }
    };

    if let Err(error) = session.wait_until_ready(READY_BUDGET).await {
        send_error(tx, 5000, &error.to_string()).await;
        session.close().await;
        return None;
    }
    Some(session)
}

/// Forward relay events until the given terminal condition, the client
/// disconnects, or the relay goes quiet forever (client owns the budget).
async fn stream_until(session: &Session, tx: &EventSender, terminal: fn(&GatewayEvent) -> bool) {
    loop {
        match session.poll_event() {
            Some(event) => {
                let is_terminal = terminal(&event);
                if send_event(tx, &event).await.is_err() {
                    return;
                }
                if is_terminal {
                    return;
                }
            }
            None => {
                if tx.is_closed() {
                    return;
                }
                tokio::time::sleep(EVENT_POLL_INTERVAL).await;
            }
        }
    }
}

async fn send_event(tx: &EventSender, event: &GatewayEvent) -> Result<(), ()> {
    match Event::default().json_data(event) {
        Ok(sse_event) => tx.send(Ok(sse_event)).await.map_err(|_| ()),
        Err(error) => {
            tracing::warn!(%error, "event serialization failed");
            Ok(())
        }
    }
}

async fn send_error(tx: &EventSender, code: u16, msg: &str) {
    let body = serde_json::json!({ "code": code, "msg": msg });
    if let Ok(sse_event) = Event::default().json_data(&body) {
        let _ = tx.send(Ok(sse_event)).await;
    }
}

fn sse_response(rx: mpsc::Receiver<Result<Event, Infallible>>) -> Response {
    Sse::new(ReceiverStream::new(rx))
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn error_response(status: StatusCode, code: u16, msg: &str) -> Response {
    (status, Json(serde_json::json!({ "code": code, "msg": msg }))).into_response()
}
