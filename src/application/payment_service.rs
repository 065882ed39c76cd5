use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use super::blocking;
use crate::domain::errors::DomainError;
use crate::domain::order::{OrderStatus, PaymentRef};
use crate::domain::payment::{gateway_event, PaymentNotification};
use crate::domain::ports::{NewPaymentLog, OrderRepository};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookOutcome {
    pub order_id: String,
    /// Status the gateway report mapped to, if any.
    pub order_status: Option<OrderStatus>,
}

/// Applies gateway notifications to orders.
///
/// Nothing is written until the signature checks out. The notification is
/// logged before the order is touched, and the order only ever moves
/// forward: re-deliveries are no-ops and late reports for an order that has
/// already progressed are ignored.
#[derive(Clone)]
pub struct PaymentReconciler {
    orders: Arc<dyn OrderRepository>,
    server_key: Arc<str>,
}

impl PaymentReconciler {
    pub fn new(orders: Arc<dyn OrderRepository>, server_key: impl Into<Arc<str>>) -> Self {
        Self {
            orders,
            server_key: server_key.into(),
        }
    }

    pub async fn handle(&self, body: Value) -> Result<WebhookOutcome, DomainError> {
        let notification = PaymentNotification::from_json(&body);
        let Some(order_id) = notification.order_id.clone() else {
            return Err(DomainError::Validation("order_id is required".to_string()));
        };

        if let Err(e) = notification.verify_signature(&self.server_key) {
            log::warn!("Rejected payment notification for order {}: {}", order_id, e);
            return Err(e);
        }

        let entry = NewPaymentLog {
            order_id: order_id.clone(),
            external_id: notification.transaction_id.clone(),
            status: notification.transaction_status.clone(),
            raw_payload: body,
        };
        blocking(&self.orders, move |repo| repo.append_payment_log(&entry)).await?;

        let Some(target) = notification.mapped_status() else {
            log::info!(
                "Payment notification for order {} has unmapped status {:?}; order left unchanged",
                order_id,
                notification.transaction_status
            );
            return Ok(WebhookOutcome {
                order_id,
                order_status: None,
            });
        };

        let id: Uuid = order_id
            .parse()
            .map_err(|_| DomainError::not_found("Order"))?;
        let order = blocking(&self.orders, move |repo| repo.find(id))
            .await?
            .ok_or_else(|| DomainError::not_found("Order"))?;

        if order.status == target {
            log::debug!("Order {} already {}; notification is a no-op", id, target);
            return Ok(WebhookOutcome {
                order_id,
                order_status: Some(target),
            });
        }

        let next = match gateway_event(target)
            .ok_or(DomainError::Validation(format!("{target} is not a payment status")))
            .and_then(|event| order.status.apply(event))
        {
            Ok(next) => next,
            Err(e) => {
                log::warn!("Ignoring payment notification for order {}: {}", id, e);
                return Ok(WebhookOutcome {
                    order_id,
                    order_status: Some(target),
                });
            }
        };

        let payment = PaymentRef {
            payment_id: notification.transaction_id.clone(),
            payment_type: notification.payment_type.clone(),
        };
        let from = order.status;
        let applied = blocking(&self.orders, move |repo| {
            repo.transition(id, from, next, Some(&payment))
        })
        .await?;
        if !applied {
            // Lost the race, usually to a re-delivery of this same report.
            let current = blocking(&self.orders, move |repo| repo.find(id))
                .await?
                .ok_or_else(|| DomainError::not_found("Order"))?;
            let superseded = current.status == next
                || gateway_event(target)
                    .map_or(true, |event| current.status.apply(event).is_err());
            if !superseded {
                return Err(DomainError::Conflict(format!(
                    "order {id} changed while applying payment notification"
                )));
            }
            log::debug!(
                "Order {} moved to {} concurrently; notification is a no-op",
                id,
                current.status
            );
            return Ok(WebhookOutcome {
                order_id,
                order_status: Some(target),
            });
        }
        log::info!("Order {} moved from {} to {} by payment gateway", id, from, next);

        Ok(WebhookOutcome {
            order_id,
            order_status: Some(target),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::application::memory::MemoryStore;
    use crate::domain::checkout::{CartLine, CheckoutPlan, PlacedOrder};
    use crate::domain::order::{Order, OrderDetail, OrderFilter};
    use crate::domain::payment::{signature_for, PaymentLog};
    use serde_json::json;

    const KEY: &str = "server-key";

    fn notification(order_id: &str, transaction_status: &str, fraud_status: Option<&str>) -> Value {
        let mut body = json!({
            "order_id": order_id,
            "status_code": "200",
            "gross_amount": "220000.00",
            "signature_key": signature_for(order_id, "200", "220000.00", KEY),
            "transaction_status": transaction_status,
            "transaction_id": "txn-123",
            "payment_type": "bank_transfer",
        });
        if let Some(fraud) = fraud_status {
            body["fraud_status"] = json!(fraud);
        }
        body
    }

    /// Lets a rival writer move the order just before the first transition.
    struct Raced {
        inner: Arc<MemoryStore>,
        rival: Mutex<Option<OrderStatus>>,
    }

    impl OrderRepository for Raced {
        fn load_cart_lines(&self, user_id: Uuid) -> Result<Option<Vec<CartLine>>, DomainError> {
            self.inner.load_cart_lines(user_id)
        }
        fn place_order(&self, plan: &CheckoutPlan) -> Result<PlacedOrder, DomainError> {
            self.inner.place_order(plan)
        }
        fn find(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
            self.inner.find(id)
        }
        fn find_detail(&self, id: Uuid) -> Result<Option<OrderDetail>, DomainError> {
            self.inner.find_detail(id)
        }
        fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, DomainError> {
            self.inner.list(filter)
        }
        fn set_snap_token(&self, id: Uuid, token: &str) -> Result<(), DomainError> {
            self.inner.set_snap_token(id, token)
        }
        fn transition(
            &self,
            id: Uuid,
            from: OrderStatus,
            to: OrderStatus,
            payment: Option<&PaymentRef>,
        ) -> Result<bool, DomainError> {
            if let Some(rival) = self.rival.lock().unwrap().take() {
                assert!(self.inner.transition(id, from, rival, None)?);
            }
            self.inner.transition(id, from, to, payment)
        }
        fn append_payment_log(&self, entry: &NewPaymentLog) -> Result<(), DomainError> {
            self.inner.append_payment_log(entry)
        }
        fn payment_logs_for(&self, order_id: &str) -> Result<Vec<PaymentLog>, DomainError> {
            self.inner.payment_logs_for(order_id)
        }
    }

    fn raced(rival: OrderStatus) -> (Arc<MemoryStore>, PaymentReconciler, Uuid) {
        let store = MemoryStore::new();
        let id = store.insert_order(Uuid::new_v4(), OrderStatus::Pending, 220_000);
        let repo = Arc::new(Raced {
            inner: store.clone(),
            rival: Mutex::new(Some(rival)),
        });
        (store, PaymentReconciler::new(repo, KEY), id)
    }

    fn setup(status: OrderStatus) -> (Arc<MemoryStore>, PaymentReconciler, Uuid) {
        let store = MemoryStore::new();
        let id = store.insert_order(Uuid::new_v4(), status, 220_000);
        let reconciler = PaymentReconciler::new(store.clone(), KEY);
        (store, reconciler, id)
    }

    #[tokio::test]
    async fn accepted_capture_marks_order_paid() {
        let (store, reconciler, id) = setup(OrderStatus::Pending);

        let outcome = reconciler
            .handle(notification(&id.to_string(), "capture", Some("accept")))
            .await
            .unwrap();

        assert_eq!(outcome.order_status, Some(OrderStatus::Paid));
        let order = store.order(id);
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.payment_id.as_deref(), Some("txn-123"));
        assert_eq!(order.payment_type.as_deref(), Some("bank_transfer"));
    }

    #[tokio::test]
    async fn challenged_capture_keeps_order_pending() {
        let (store, reconciler, id) = setup(OrderStatus::Pending);

        let outcome = reconciler
            .handle(notification(&id.to_string(), "capture", Some("challenge")))
            .await
            .unwrap();

        assert_eq!(outcome.order_status, Some(OrderStatus::Pending));
        assert_eq!(store.order(id).status, OrderStatus::Pending);
        assert!(store.events().is_empty());
    }

    #[tokio::test]
    async fn redelivery_changes_status_once_and_logs_twice() {
        let (store, reconciler, id) = setup(OrderStatus::Pending);
        let body = notification(&id.to_string(), "settlement", None);

        reconciler.handle(body.clone()).await.unwrap();
        reconciler.handle(body).await.unwrap();

        assert_eq!(store.order(id).status, OrderStatus::Paid);
        assert_eq!(store.payment_logs().len(), 2);
        assert_eq!(store.events().len(), 1);
    }

    #[tokio::test]
    async fn losing_the_race_to_the_same_status_is_success() {
        let (store, reconciler, id) = raced(OrderStatus::Paid);

        let outcome = reconciler
            .handle(notification(&id.to_string(), "settlement", None))
            .await
            .unwrap();

        assert_eq!(outcome.order_status, Some(OrderStatus::Paid));
        assert_eq!(store.order(id).status, OrderStatus::Paid);
        assert_eq!(store.events().len(), 1);
    }

    #[tokio::test]
    async fn losing_the_race_to_a_final_status_is_success() {
        let (store, reconciler, id) = raced(OrderStatus::Failed);

        reconciler
            .handle(notification(&id.to_string(), "settlement", None))
            .await
            .unwrap();

        assert_eq!(store.order(id).status, OrderStatus::Failed);
        assert_eq!(store.payment_logs().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_identical_deliveries_both_succeed() {
        for _ in 0..20 {
            let (store, reconciler, id) = setup(OrderStatus::Pending);
            let body = notification(&id.to_string(), "settlement", None);

            let (a, b) = tokio::join!(reconciler.handle(body.clone()), reconciler.handle(body));

            assert!(a.is_ok(), "{a:?}");
            assert!(b.is_ok(), "{b:?}");
            assert_eq!(store.order(id).status, OrderStatus::Paid);
            assert_eq!(store.events().len(), 1);
            assert_eq!(store.payment_logs().len(), 2);
        }
    }

    #[tokio::test]
    async fn late_settlement_does_not_regress_a_shipped_order() {
        let (store, reconciler, id) = setup(OrderStatus::Shipped);

        let outcome = reconciler
            .handle(notification(&id.to_string(), "settlement", None))
            .await
            .unwrap();

        assert_eq!(outcome.order_status, Some(OrderStatus::Paid));
        assert_eq!(store.order(id).status, OrderStatus::Shipped);
        assert_eq!(store.payment_logs().len(), 1);
    }

    #[tokio::test]
    async fn expiry_after_payment_is_ignored() {
        let (store, reconciler, id) = setup(OrderStatus::Paid);

        reconciler
            .handle(notification(&id.to_string(), "expire", None))
            .await
            .unwrap();
        assert_eq!(store.order(id).status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn tampered_amount_writes_nothing() {
        let (store, reconciler, id) = setup(OrderStatus::Pending);
        let mut body = notification(&id.to_string(), "settlement", None);
        body["gross_amount"] = json!("1.00");

        let err = reconciler.handle(body).await.unwrap_err();

        assert!(matches!(err, DomainError::SignatureInvalid));
        assert!(store.payment_logs().is_empty());
        assert_eq!(store.order(id).status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn missing_order_id_is_a_validation_error() {
        let (store, reconciler, _) = setup(OrderStatus::Pending);
        let err = reconciler
            .handle(json!({ "transaction_status": "settlement" }))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(store.payment_logs().is_empty());
    }

    #[tokio::test]
    async fn unmapped_status_is_logged_but_not_applied() {
        let (store, reconciler, id) = setup(OrderStatus::Pending);

        let outcome = reconciler
            .handle(notification(&id.to_string(), "refund", None))
            .await
            .unwrap();

        assert_eq!(outcome.order_status, None);
        assert_eq!(store.payment_logs().len(), 1);
        assert_eq!(store.payment_logs()[0].status.as_deref(), Some("refund"));
        assert_eq!(store.order(id).status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_order_is_logged_then_reported_missing() {
        let (store, reconciler, _) = setup(OrderStatus::Pending);

        let err = reconciler
            .handle(notification(&Uuid::new_v4().to_string(), "settlement", None))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::NotFound(_)));
        assert_eq!(store.payment_logs().len(), 1);
    }
}
