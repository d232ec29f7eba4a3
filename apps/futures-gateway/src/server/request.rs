//! Request payloads for the HTTP and WebSocket transports.

use serde::Deserialize;

/// Credentials as supplied by a consumer; broker and address fall back to
/// the gateway defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsParams {
    /// Investor account ID.
    pub user_id: String,
    /// Account password.
    pub password: String,
    /// Broker ID; gateway default when omitted.
    #[serde(default)]
    pub broker_id: Option<String>,
    /// Front address; gateway default when omitted.
    #[serde(default)]
    pub address: Option<String>,
}

/// Body of `POST /v1/send_order`.
#[derive(Debug, Deserialize)]
pub struct SendOrderBody {
    /// Credentials for the session carrying the order.
    #[serde(flatten)]
    pub credentials: CredentialsParams,
    /// Instrument symbol.
    pub symbol: String,
    /// Requested price.
    pub price: f64,
    /// Requested volume in lots.
    pub volume: i32,
    /// Price type: limit | market | FAK | FOK.
    pub price_type: String,
    /// Trade action: buy | sell | short | cover.
    pub order_type: String,
    /// Trade date of the position being closed (`YYYYMMDD`); empty means
    /// unknown.
    #[serde(default)]
    pub trade_date: Option<String>,
}

/// Body of `POST /v1/cancel_order`.
#[derive(Debug, Deserialize)]
pub struct CancelOrderBody {
    /// Credentials for the session carrying the cancel.
    #[serde(flatten)]
    pub credentials: CredentialsParams,
    /// Instrument symbol of the order being canceled.
    pub symbol: String,
    /// Exchange the order was accepted on.
    pub exchange: String,
    /// Order reference of the order being canceled.
    pub order_id: String,
    /// Front ID the order was submitted under.
    pub front_id: i32,
    /// Session ID the order was submitted under.
    pub session_id: i64,
}

/// One WebSocket broker command: `{"method": ..., "data": ...}`.
#[derive(Debug, Deserialize)]
#[serde(tag = "method", content = "data", rename_all = "snake_case")]
pub enum BrokerCommand {
    /// Open the exchange connection.
    Connect(CredentialsParams),
    /// Request an account snapshot.
    QueryAccount,
    /// Request position records.
    QueryPosition,
    /// Submit an order.
    SendOrder(WsOrderData),
}

/// Order payload of the WebSocket `send_order` method.
#[derive(Debug, Deserialize)]
pub struct WsOrderData {
    /// Instrument symbol.
    pub symbol: String,
    /// Requested price.
    pub price: f64,
    /// Requested volume in lots.
    pub volume: i32,
    /// Price type: limit | market | FAK | FOK.
    pub price_type: String,
    /// Trade action: buy | sell | short | cover.
    pub order_type: String,
    /// Trade date of the position being closed (`YYYYMMDD`).
    #[serde(default)]
    pub trade_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_command_parses_with_and_without_data() {
        let connect: BrokerCommand = serde_json::from_str(
            r#"{"method":"connect","data":{"user_id":"126077","password":"secret"}}"#,
        )
        .unwrap();
        assert!(matches!(connect, BrokerCommand::Connect(_)));

        let query: BrokerCommand = serde_json::from_str(r#"{"method":"query_account"}"#).unwrap();
        assert!(matches!(query, BrokerCommand::QueryAccount));
    }

    #[test]
    fn send_order_body_accepts_flat_credentials() {
        let body: SendOrderBody = serde_json::from_str(
            r#"{
                "user_id": "126077",
                "password": "secret",
                "symbol": "au2406",
                "price": 500.0,
                "volume": 1,
                "price_type": "limit",
                "order_type": "buy"
            }"#,
        )
        .unwrap();
        assert_eq!(body.symbol, "au2406");
        assert!(body.credentials.broker_id.is_none());
        assert!(body.trade_date.is_none());
    }
}
