//! Ordered event relay between the dispatch task and a consumer loop.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::models::GatewayEvent;

/// FIFO queue moving connector callbacks into consumer-visible events.
///
/// Single producer (the session's dispatch task), one active consumer at a
/// time. Every pushed event is polled exactly once, in production order.
/// An empty queue is not an error; it signals "no event yet" and the
/// consumer is expected to back off with a bounded sleep and retry.
/// Closing discards outstanding events and turns further pushes into
/// no-ops.
#[derive(Debug, Default)]
pub struct EventRelay {
    queue: Mutex<VecDeque<GatewayEvent>>,
    closed: AtomicBool,
}

impl EventRelay {
    /// Create an open, empty relay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an event. Returns false when the relay is closed and the
    /// event was discarded.
    pub fn push(&self, event: GatewayEvent) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.push_back(event);
        true
    }

    /// Dequeue the oldest event, or `None` when nothing is pending yet.
    pub fn poll(&self) -> Option<GatewayEvent> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.pop_front()
    }

    /// Number of events waiting to be polled.
    pub fn pending(&self) -> usize {
        let queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.len()
    }

    /// Discard outstanding events and stop accepting new ones. Idempotent.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.clear();
    }

    /// Whether the relay has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::models::{AccountFunds, AccountSnapshot};

    use super::*;

    fn event(tag: i64) -> GatewayEvent {
        GatewayEvent::Account(AccountSnapshot::from_funds(AccountFunds {
            account_id: tag.to_string(),
            pre_balance: Decimal::new(tag, 0),
            ..AccountFunds::default()
        }))
    }

    fn tag_of(event: &GatewayEvent) -> String {
        match event {
            GatewayEvent::Account(snapshot) => snapshot.account_id.clone(),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn empty_relay_polls_none() {
        let relay = EventRelay::new();
        assert!(relay.poll().is_none());
        assert_eq!(relay.pending(), 0);
    }

    #[test]
    fn events_come_out_in_production_order() {
        let relay = EventRelay::new();
        for tag in 1..=3 {
            assert!(relay.push(event(tag)));
        }

        assert_eq!(tag_of(&relay.poll().unwrap()), "1");
        assert_eq!(tag_of(&relay.poll().unwrap()), "2");
        assert_eq!(tag_of(&relay.poll().unwrap()), "3");
        assert!(relay.poll().is_none());
    }

    #[test]
    fn order_survives_interleaved_polls() {
        let relay = EventRelay::new();
        relay.push(event(1));
        assert_eq!(tag_of(&relay.poll().unwrap()), "1");
        assert!(relay.poll().is_none());

        relay.push(event(2));
        relay.push(event(3));
        assert_eq!(tag_of(&relay.poll().unwrap()), "2");
        relay.push(event(4));
        assert_eq!(tag_of(&relay.poll().unwrap()), "3");
        assert_eq!(tag_of(&relay.poll().unwrap()), "4");
    }

    #[test]
    fn close_discards_and_stops_production() {
        let relay = EventRelay::new();
        relay.push(event(1));
        relay.close();

        assert!(relay.is_closed());
        assert!(relay.poll().is_none());
        assert!(!relay.push(event(2)));
        assert!(relay.poll().is_none());

        // Closing again is harmless.
        relay.close();
    }

    #[tokio::test]
    async fn producer_order_holds_across_tasks() {
        use std::sync::Arc;

        let relay = Arc::new(EventRelay::new());
        let producer = {
            let relay = Arc::clone(&relay);
            tokio::spawn(async move {
                for tag in 1..=100 {
                    relay.push(event(tag));
                    if tag % 10 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            })
        };

        let mut seen = Vec::new();
        while seen.len() < 100 {
            match relay.poll() {
                Some(ev) => seen.push(tag_of(&ev).parse::<i64>().unwrap()),
                None => tokio::time::sleep(std::time::Duration::from_millis(1)).await,
            }
        }
        producer.await.unwrap();

        let expected: Vec<i64> = (1..=100).collect();
        assert_eq!(seen, expected);
    }
}
