//! In-process fan-out of realtime events and the relay feeding it from the outbox.
//!
//! ```text
//! state change ──(same tx)──▶ realtime_outbox
//!                                  │ OutboxRelay (interval)
//!                                  ▼
//!                             RealtimeHub ──▶ broadcast per channel ──▶ SSE subscribers
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::application::blocking;
use crate::domain::errors::DomainError;
use crate::domain::ports::OutboxRepository;
use crate::domain::realtime::{Channel, RealtimeEvent};

/// Enough to absorb a burst while a subscriber is busy writing.
const BROADCAST_CAPACITY: usize = 256;
const RELAY_BATCH: i64 = 100;

#[derive(Clone)]
pub struct RealtimeHub {
    orders: broadcast::Sender<RealtimeEvent>,
    products: broadcast::Sender<RealtimeEvent>,
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeHub {
    pub fn new() -> Self {
        let (orders, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (products, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { orders, products }
    }

    fn sender(&self, channel: Channel) -> &broadcast::Sender<RealtimeEvent> {
        match channel {
            Channel::Orders => &self.orders,
            Channel::Products => &self.products,
        }
    }

    pub fn subscribe(&self, channel: Channel) -> broadcast::Receiver<RealtimeEvent> {
        self.sender(channel).subscribe()
    }

    /// Returns the number of subscribers reached. Delivery is best-effort.
    pub fn publish(&self, event: RealtimeEvent) -> usize {
        self.sender(event.channel()).send(event).unwrap_or(0)
    }
}

/// Drains unpublished outbox rows into the hub.
pub struct OutboxRelay {
    outbox: Arc<dyn OutboxRepository>,
    hub: RealtimeHub,
    interval: Duration,
}

impl OutboxRelay {
    pub fn new(outbox: Arc<dyn OutboxRepository>, hub: RealtimeHub, interval: Duration) -> Self {
        Self {
            outbox,
            hub,
            interval,
        }
    }

    /// Publish one batch and mark it. Returns how many entries were relayed.
    pub async fn relay_once(&self) -> Result<usize, DomainError> {
        let entries = blocking(&self.outbox, |repo| repo.fetch_unpublished(RELAY_BATCH)).await?;
        if entries.is_empty() {
            return Ok(0);
        }

        let ids: Vec<_> = entries.iter().map(|entry| entry.id).collect();
        for entry in entries {
            let kind = entry.event.kind;
            let reached = self.hub.publish(entry.event);
            log::debug!("Relayed {} to {} subscriber(s)", kind, reached);
        }

        let count = ids.len();
        blocking(&self.outbox, move |repo| repo.mark_published(&ids)).await?;
        Ok(count)
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        log::info!("Outbox relay started (every {:?})", self.interval);
        loop {
            ticker.tick().await;
            loop {
                match self.relay_once().await {
                    Ok(n) if n as i64 == RELAY_BATCH => continue,
                    Ok(_) => break,
                    Err(e) => {
                        log::error!("Outbox relay failed: {}", e);
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::memory::MemoryStore;
    use crate::domain::order::OrderStatus;
    use crate::domain::ports::OrderRepository;
    use crate::domain::realtime::EventKind;
    use uuid::Uuid;

    #[tokio::test]
    async fn events_reach_only_their_channel() {
        let hub = RealtimeHub::new();
        let mut orders = hub.subscribe(Channel::Orders);
        let mut products = hub.subscribe(Channel::Products);

        hub.publish(RealtimeEvent::stock_updated(Uuid::new_v4(), 2));

        assert_eq!(products.recv().await.unwrap().kind, EventKind::StockUpdated);
        assert!(orders.try_recv().is_err());
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let hub = RealtimeHub::new();
        assert_eq!(hub.publish(RealtimeEvent::stock_updated(Uuid::new_v4(), 0)), 0);
    }

    #[tokio::test]
    async fn relay_publishes_once_and_marks_entries() {
        let store = MemoryStore::new();
        let hub = RealtimeHub::new();
        let mut rx = hub.subscribe(Channel::Orders);
        let relay = OutboxRelay::new(store.clone(), hub, Duration::from_millis(10));

        let id = store.insert_order(Uuid::new_v4(), OrderStatus::Pending, 1_000);
        store
            .transition(id, OrderStatus::Pending, OrderStatus::Paid, None)
            .unwrap();

        assert_eq!(relay.relay_once().await.unwrap(), 1);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::OrderPaid);
        assert_eq!(event.order_id(), Some(id));

        assert_eq!(relay.relay_once().await.unwrap(), 0);
    }
}
