//! Key-value store capability.
//!
//! Backs the symbol→exchange map, the per-day instrument records, the
//! order-id token pool and the day-scoped audit lists. The core depends
//! only on this trait, not on any specific store.

mod in_memory;

pub use in_memory::InMemoryKvStore;

use async_trait::async_trait;

/// Key for the symbol → exchange-id hash.
pub const SYMBOL_EXCHANGE_KEY: &str = "SymbolExchangeMap";

/// Key for the order reference token pool.
pub const ORDER_ID_POOL_KEY: &str = "UNIQUE_ORDER_ID";

/// Key for the day's serialized instrument records.
#[must_use]
pub fn instrument_day_key(day: &str) -> String {
    format!("Instrument-{day}")
}

/// Key for the day's accepted-order audit list.
#[must_use]
pub fn order_audit_key(day: &str) -> String {
    format!("ORDER_QUEUE_{day}")
}

/// Key for the day's trade audit list.
#[must_use]
pub fn trade_audit_key(day: &str) -> String {
    format!("TRADE_QUEUE_{day}")
}

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store is unreachable or the operation failed in transit.
    #[error("key-value store unavailable: {0}")]
    Unavailable(String),
}

/// Capability trait for the external key-value store.
///
/// Implementations must support concurrent readers; list pops must be
/// mutually exclusive (pop-one-atomically).
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get a plain value.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set a plain value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Get one field of a hash.
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;

    /// Set one field of a hash.
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError>;

    /// All values of a hash.
    async fn hash_values(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Append to the tail of a list.
    async fn list_push_back(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Pop one element from the head of a list, atomically.
    async fn list_pop_front(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Length of a list.
    async fn list_len(&self, key: &str) -> Result<usize, StoreError>;
}
