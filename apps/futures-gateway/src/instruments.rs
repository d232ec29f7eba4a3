//! Instrument directory: symbol → exchange resolution and per-day records.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::models::InstrumentRecord;
use crate::store::{KvStore, SYMBOL_EXCHANGE_KEY, StoreError, instrument_day_key};

/// Maps instrument symbols to exchange identifiers.
///
/// Populated from connector instrument-query callbacks, once per trading
/// day per symbol; read by the order router to decide exchange-specific
/// offset semantics. Reads hit an in-memory map first and fall back to the
/// shared store, so a fresh process can resolve symbols recorded by an
/// earlier one.
pub struct InstrumentDirectory {
    store: Arc<dyn KvStore>,
    exchange_by_symbol: RwLock<HashMap<String, String>>,
}

impl InstrumentDirectory {
    /// Create a directory over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            exchange_by_symbol: RwLock::new(HashMap::new()),
        }
    }

    /// Upsert one instrument record for the given trading day.
    ///
    /// Writes the in-memory map, the symbol→exchange hash and the day's
    /// serialized record.
    pub async fn upsert(&self, record: &InstrumentRecord, day: &str) -> Result<(), StoreError> {
        {
            let mut map = self
                .exchange_by_symbol
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            map.insert(record.symbol.clone(), record.exchange_id.clone());
        }

        self.store
            .hash_set(SYMBOL_EXCHANGE_KEY, &record.symbol, &record.exchange_id)
            .await?;

        let serialized = serde_json::to_string(record)
            .map_err(|e| StoreError::Unavailable(format!("serialize instrument: {e}")))?;
        self.store
            .hash_set(&instrument_day_key(day), &record.symbol, &serialized)
            .await
    }

    /// Resolve the exchange a symbol trades on. `None` when unknown.
    pub async fn resolve_exchange(&self, symbol: &str) -> Option<String> {
        {
            let map = self
                .exchange_by_symbol
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(exchange) = map.get(symbol) {
                return Some(exchange.clone());
            }
        }

        match self.store.hash_get(SYMBOL_EXCHANGE_KEY, symbol).await {
            Ok(Some(exchange)) => {
                let mut map = self
                    .exchange_by_symbol
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                map.insert(symbol.to_string(), exchange.clone());
                Some(exchange)
            }
            Ok(None) => None,
            Err(error) => {
                tracing::warn!(symbol, %error, "exchange lookup failed");
                None
            }
        }
    }

    /// All instrument records stored for the given trading day.
    pub async fn records_for_day(&self, day: &str) -> Result<Vec<InstrumentRecord>, StoreError> {
        let values = self.store.hash_values(&instrument_day_key(day)).await?;
        let mut records = Vec::with_capacity(values.len());
        for value in values {
            match serde_json::from_str(&value) {
                Ok(record) => records.push(record),
                Err(error) => tracing::warn!(%error, "skipping unreadable instrument record"),
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::store::InMemoryKvStore;

    use super::*;

    fn record(symbol: &str, exchange: &str) -> InstrumentRecord {
        InstrumentRecord {
            symbol: symbol.to_string(),
            name: symbol.to_uppercase(),
            exchange_id: exchange.to_string(),
            product_id: symbol.chars().take(2).collect(),
            price_tick: Decimal::new(1, 0),
            volume_multiple: 10,
            min_buy_volume: 1,
            max_limit_order_volume: 500,
            open_date: "20230816".to_string(),
            end_deliv_date: "20240621".to_string(),
        }
    }

    #[tokio::test]
    async fn resolve_unknown_symbol_is_none() {
        let directory = InstrumentDirectory::new(Arc::new(InMemoryKvStore::new()));
        assert!(directory.resolve_exchange("xx9999").await.is_none());
    }

    #[tokio::test]
    async fn upsert_then_resolve() {
        let directory = InstrumentDirectory::new(Arc::new(InMemoryKvStore::new()));
        directory
            .upsert(&record("au2406", "SHFE"), "20240101")
            .await
            .unwrap();
        assert_eq!(
            directory.resolve_exchange("au2406").await.as_deref(),
            Some("SHFE")
        );
    }

    #[tokio::test]
    async fn resolve_falls_back_to_store() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let writer = InstrumentDirectory::new(Arc::clone(&store));
        writer
            .upsert(&record("m2409", "DCE"), "20240101")
            .await
            .unwrap();

        // A second directory over the same store starts with a cold cache.
        let reader = InstrumentDirectory::new(store);
        assert_eq!(
            reader.resolve_exchange("m2409").await.as_deref(),
            Some("DCE")
        );
    }

    #[tokio::test]
    async fn records_for_day_returns_upserts() {
        let directory = InstrumentDirectory::new(Arc::new(InMemoryKvStore::new()));
        directory
            .upsert(&record("au2406", "SHFE"), "20240101")
            .await
            .unwrap();
        directory
            .upsert(&record("m2409", "DCE"), "20240101")
            .await
            .unwrap();

        let records = directory.records_for_day("20240101").await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(directory.records_for_day("20240102").await.unwrap().is_empty());
    }
}
