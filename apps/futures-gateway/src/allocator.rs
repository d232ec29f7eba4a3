//! Order reference token allocation.

use std::sync::Arc;

use crate::store::{KvStore, ORDER_ID_POOL_KEY, StoreError};

/// Errors from token allocation.
#[derive(Debug, thiserror::Error)]
pub enum AllocatorError {
    /// The pre-seeded pool has run dry. Fatal for the operation that
    /// needed a token; the pool must be re-seeded out of band.
    #[error("order-id pool exhausted")]
    Exhausted,

    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Issues globally unique order reference tokens from a shared pool.
///
/// Tokens are popped atomically from a pre-seeded list in the key-value
/// store, so concurrent callers can never receive the same token. An empty
/// pool fails loudly instead of wrapping around.
pub struct OrderIdAllocator {
    store: Arc<dyn KvStore>,
}

impl OrderIdAllocator {
    /// Create an allocator over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Draw the next token.
    pub async fn next(&self) -> Result<String, AllocatorError> {
        match self.store.list_pop_front(ORDER_ID_POOL_KEY).await? {
            Some(token) => Ok(token),
            None => Err(AllocatorError::Exhausted),
        }
    }

    /// Number of tokens remaining in the pool.
    pub async fn remaining(&self) -> Result<usize, AllocatorError> {
        Ok(self.store.list_len(ORDER_ID_POOL_KEY).await?)
    }

    /// Seed the pool with tokens `1..=count`. Ops path, run before the
    /// trading day starts.
    pub async fn seed(&self, count: u32) -> Result<(), AllocatorError> {
        for id in 1..=count {
            self.store
                .list_push_back(ORDER_ID_POOL_KEY, &id.to_string())
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::store::InMemoryKvStore;

    use super::*;

    #[tokio::test]
    async fn exhausted_pool_fails_loudly() {
        let allocator = OrderIdAllocator::new(Arc::new(InMemoryKvStore::new()));
        assert!(matches!(
            allocator.next().await,
            Err(AllocatorError::Exhausted)
        ));
    }

    #[tokio::test]
    async fn seeded_tokens_come_out_in_order() {
        let allocator = OrderIdAllocator::new(Arc::new(InMemoryKvStore::new()));
        allocator.seed(3).await.unwrap();
        assert_eq!(allocator.remaining().await.unwrap(), 3);
        assert_eq!(allocator.next().await.unwrap(), "1");
        assert_eq!(allocator.next().await.unwrap(), "2");
        assert_eq!(allocator.next().await.unwrap(), "3");
        assert!(matches!(
            allocator.next().await,
            Err(AllocatorError::Exhausted)
        ));
    }

    #[tokio::test]
    async fn concurrent_callers_never_share_a_token() {
        let allocator = Arc::new(OrderIdAllocator::new(Arc::new(InMemoryKvStore::new())));
        allocator.seed(64).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let allocator = Arc::clone(&allocator);
            handles.push(tokio::spawn(async move {
                let mut drawn = Vec::new();
                for _ in 0..8 {
                    drawn.push(allocator.next().await.unwrap());
                }
                drawn
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for token in handle.await.unwrap() {
                assert!(seen.insert(token), "token issued twice");
            }
        }
        assert_eq!(seen.len(), 64);
        assert!(matches!(
            allocator.next().await,
            Err(AllocatorError::Exhausted)
        ));
    }
}
