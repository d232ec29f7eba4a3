//! WebSocket broker: one socket drives one session interactively.

use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use rust_decimal::Decimal;

use crate::models::{GatewayEvent, OrderIntent, PriceType, TradeAction};
use crate::session::Session;

use super::AppState;
use super::request::{BrokerCommand, WsOrderData};

/// Interval between relay sweeps toward the socket.
const RELAY_SWEEP_INTERVAL: Duration = Duration::from_millis(50);

type WsSink = SplitSink<WebSocket, Message>;

/// `GET /v1/broker`: upgrade to a WebSocket and serve broker commands.
pub(super) async fn broker(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| serve(socket, state))
}

async fn serve(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let mut session: Option<Session> = None;
    let mut sweep = tokio::time::interval(RELAY_SWEEP_INTERVAL);

    'socket: loop {
        tokio::select! {
            incoming = next_text(&mut stream) => {
                match incoming {
                    Some(text) => {
                        if handle_command(&text, &state, &mut session, &mut sink)
                            .await
                            .is_err()
                        {
                            break 'socket;
                        }
                    }
                    None => break 'socket,
                }
            }
            _ = sweep.tick() => {
                if let Some(active) = &session {
                    while let Some(event) = active.poll_event() {
                        if push_event(&mut sink, &event).await.is_err() {
                            break 'socket;
                        }
                    }
                }
            }
        }
    }

    if let Some(active) = session {
        active.close().await;
    }
}

/// Next text frame, or `None` once the socket is done.
async fn next_text(stream: &mut SplitStream<WebSocket>) -> Option<String> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return Some(text.to_string()),
            Some(Ok(Message::Close(_))) | None => return None,
            Some(Ok(_)) => {}
            Some(Err(error)) => {
                tracing::debug!(%error, "websocket receive failed");
                return None;
            }
        }
    }
}

/// Apply one broker command. `Err` means the socket is gone.
async fn handle_command(
    text: &str,
    state: &AppState,
    session: &mut Option<Session>,
    sink: &mut WsSink,
) -> Result<(), ()> {
    let command: BrokerCommand = match serde_json::from_str(text) {
        Ok(command) => command,
        Err(error) => {
            return push_error(sink, 4000, &format!("unreadable command: {error}")).await;
        }
    };

    match command {
        BrokerCommand::Connect(params) => {
            if session.is_some() {
                // Already connecting; connect is idempotent.
                return Ok(());
            }
            let credentials = state.credentials(params);
            match state.open_session(credentials).await {
                Ok(opened) => {
                    *session = Some(opened);
                    Ok(())
                }
                Err(error) => {
                    push_error(sink, 5000, &format!("cannot open connector: {error}")).await
                }
            }
        }
        BrokerCommand::QueryAccount => match session {
            Some(active) => match active.query_account().await {
                Ok(()) => Ok(()),
                Err(error) => push_error(sink, 5000, &error.to_string()).await,
            },
            None => push_error(sink, 4000, "connect first").await,
        },
        BrokerCommand::QueryPosition => match session {
            Some(active) => match active.query_position().await {
                Ok(()) => Ok(()),
                Err(error) => push_error(sink, 5000, &error.to_string()).await,
            },
            None => push_error(sink, 4000, "connect first").await,
        },
        BrokerCommand::SendOrder(data) => match session {
            Some(active) => send_order(active, data, sink).await,
            None => push_error(sink, 4000, "connect first").await,
        },
    }
}

async fn send_order(session: &Session, data: WsOrderData, sink: &mut WsSink) -> Result<(), ()> {
    let price_type = match data.price_type.parse::<PriceType>() {
        Ok(price_type) => price_type,
        Err(msg) => return push_error(sink, 4000, &msg).await,
    };
    let action = match data.order_type.parse::<TradeAction>() {
        Ok(action) => action,
        Err(msg) => return push_error(sink, 4000, &msg).await,
    };
    let Ok(price) = Decimal::try_from(data.price) else {
        return push_error(sink, 4000, "price is not a valid number").await;
    };

    let intent = OrderIntent {
        symbol: data.symbol,
        price,
        volume: data.volume,
        price_type,
        action,
        trade_date: data.trade_date.filter(|date| !date.is_empty()),
    };

    match session.submit_order(&intent).await {
        Ok(order) => {
            tracing::info!(order_ref = %order.order_ref, "order submitted over websocket");
            Ok(())
        }
        Err(error) => push_error(sink, 5000, &error.to_string()).await,
    }
}

async fn push_event(sink: &mut WsSink, event: &GatewayEvent) -> Result<(), ()> {
    match serde_json::to_string(event) {
        Ok(json) => sink.send(Message::Text(json.into())).await.map_err(|_| ()),
        Err(error) => {
            tracing::warn!(%error, "event serialization failed");
            Ok(())
        }
    }
}

async fn push_error(sink: &mut WsSink, code: u16, msg: &str) -> Result<(), ()> {
    let body = serde_json::json!({ "code": code, "msg": msg }).to_string();
    sink.send(Message::Text(body.into())).await.map_err(|_| ())
}
