//! Push + poll loops that keep a client view in step with the server.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::watch;
use uuid::Uuid;

use super::api::ClientError;
use super::reconcile::{Outcome, Reconciler};
use crate::domain::order::OrderStatus;

/// How often the payment page polls while waiting.
pub const PAYMENT_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// How often order lists poll while the push transport is down.
pub const DEGRADED_LIST_POLL_INTERVAL: Duration = Duration::from_secs(15);

#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, order_id: Uuid) -> Result<OrderStatus, ClientError>;
}

/// Wait for a payment to settle one way or the other.
///
/// Push updates and polls feed the same [`Reconciler`], so whichever reports a
/// deciding status first wins. The first poll fires immediately. When the
/// push stream ends, polling carries on alone.
pub async fn watch_payment<S>(
    order_id: Uuid,
    push: S,
    source: &dyn StatusSource,
    poll_every: Duration,
) -> Outcome
where
    S: Stream<Item = OrderStatus> + Unpin,
{
    let mut reconciler = Reconciler::new();
    let mut push = push.fuse();
    let mut push_open = true;
    let mut ticker = tokio::time::interval(poll_every);

    loop {
        let status = tokio::select! {
            next = push.next(), if push_open => match next {
                Some(status) => status,
                None => {
                    log::debug!("Push channel for order {} closed; polling only", order_id);
                    push_open = false;
                    continue;
                }
            },
            _ = ticker.tick() => match source.fetch_status(order_id).await {
                Ok(status) => status,
                Err(e) => {
                    log::warn!("Status poll for order {} failed: {}", order_id, e);
                    continue;
                }
            },
        };

        if let Some(outcome) = reconciler.observe(status) {
            return outcome;
        }
    }
}

/// Whether the push transport is currently usable.
#[derive(Clone)]
pub struct ChannelHealth {
    degraded: Arc<watch::Sender<bool>>,
}

impl Default for ChannelHealth {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelHealth {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            degraded: Arc::new(tx),
        }
    }

    pub fn mark_degraded(&self) {
        self.degraded.send_replace(true);
    }

    pub fn mark_healthy(&self) {
        self.degraded.send_replace(false);
    }

    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }
}

/// Keep an order list fresh: refetch on every push event, and on a fixed
/// interval while the push transport is degraded. Returns once every
/// [`ChannelHealth`] handle has been dropped.
pub async fn refresh_list<S, F, Fut>(
    push: S,
    mut health: watch::Receiver<bool>,
    poll_every: Duration,
    mut refetch: F,
) where
    S: Stream + Unpin,
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut push = push.fuse();
    let mut push_open = true;
    let mut ticker = tokio::time::interval(poll_every);

    loop {
        tokio::select! {
            next = push.next(), if push_open => match next {
                Some(_) => refetch().await,
                None => push_open = false,
            },
            _ = ticker.tick() => {
                if *health.borrow() {
                    refetch().await;
                }
            }
            changed = health.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}
