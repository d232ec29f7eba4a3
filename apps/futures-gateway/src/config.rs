//! Gateway configuration from environment variables.

/// Default HTTP port.
const DEFAULT_HTTP_PORT: u16 = 10080;

/// Default broker ID applied when a consumer omits one.
const DEFAULT_BROKER_ID: &str = "9999";

/// Default front address applied when a consumer omits one.
const DEFAULT_FRONT_ADDRESS: &str = "tcp://180.168.146.187:10003";

/// Default order-id pool size seeded at startup when the pool is empty.
const DEFAULT_POOL_SEED: u32 = 10_000;

/// Parsed gateway configuration.
///
/// Environment variables:
/// - `HTTP_PORT`: HTTP server port (default: 10080)
/// - `GATEWAY_BROKER_ID`: default broker ID (default: 9999)
/// - `GATEWAY_FRONT_ADDRESS`: default front address
/// - `ORDER_ID_POOL_SEED`: tokens seeded into an empty pool at startup;
///   0 disables seeding (default: 10000)
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// HTTP server port.
    pub http_port: u16,
    /// Broker ID applied when a consumer omits one.
    pub default_broker_id: String,
    /// Front address applied when a consumer omits one.
    pub default_front_address: String,
    /// Tokens seeded into an empty order-id pool at startup.
    pub order_id_pool_seed: u32,
}

impl GatewayConfig {
    /// Read configuration from the environment, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            http_port: env_parsed("HTTP_PORT", DEFAULT_HTTP_PORT),
            default_broker_id: env_or("GATEWAY_BROKER_ID", DEFAULT_BROKER_ID),
            default_front_address: env_or("GATEWAY_FRONT_ADDRESS", DEFAULT_FRONT_ADDRESS),
            order_id_pool_seed: env_parsed("ORDER_ID_POOL_SEED", DEFAULT_POOL_SEED),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            default_broker_id: DEFAULT_BROKER_ID.to_string(),
            default_front_address: DEFAULT_FRONT_ADDRESS.to_string(),
            order_id_pool_seed: DEFAULT_POOL_SEED,
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = GatewayConfig::default();
        assert_eq!(config.http_port, 10080);
        assert_eq!(config.default_broker_id, "9999");
        assert_eq!(config.order_id_pool_seed, 10_000);
    }
}
