use std::sync::Arc;

use uuid::Uuid;

use super::blocking;
use crate::domain::catalog::Role;
use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderDetail, OrderEvent, OrderFilter, OrderStatus};
use crate::domain::payment::PaymentLog;
use crate::domain::ports::{OrderRepository, ProfileRepository};

/// Order queries and the customer/admin driven lifecycle transitions.
#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    profiles: Arc<dyn ProfileRepository>,
}

impl OrderService {
    pub fn new(orders: Arc<dyn OrderRepository>, profiles: Arc<dyn ProfileRepository>) -> Self {
        Self { orders, profiles }
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, DomainError> {
        let filter = OrderFilter {
            user_id: Some(user_id),
            status: None,
        };
        blocking(&self.orders, move |repo| repo.list(filter)).await
    }

    pub async fn get_for_user(&self, user_id: Uuid, order_id: Uuid) -> Result<OrderDetail, DomainError> {
        blocking(&self.orders, move |repo| repo.find_detail(order_id))
            .await?
            .filter(|detail| detail.order.is_owned_by(user_id))
            .ok_or_else(|| DomainError::not_found("Order"))
    }

    pub async fn status_for_user(&self, user_id: Uuid, order_id: Uuid) -> Result<OrderStatus, DomainError> {
        Ok(self.owned(user_id, order_id).await?.status)
    }

    pub async fn list_for_admin(
        &self,
        user_id: Uuid,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, DomainError> {
        self.require_admin(user_id).await?;
        let filter = OrderFilter {
            user_id: None,
            status,
        };
        blocking(&self.orders, move |repo| repo.list(filter)).await
    }

    pub async fn get_for_admin(&self, user_id: Uuid, order_id: Uuid) -> Result<OrderDetail, DomainError> {
        self.require_admin(user_id).await?;
        blocking(&self.orders, move |repo| repo.find_detail(order_id))
            .await?
            .ok_or_else(|| DomainError::not_found("Order"))
    }

    pub async fn payment_logs_for_admin(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<Vec<PaymentLog>, DomainError> {
        self.require_admin(user_id).await?;
        blocking(&self.orders, move |repo| {
            repo.payment_logs_for(&order_id.to_string())
        })
        .await
    }

    pub async fn mark_shipped(&self, user_id: Uuid, order_id: Uuid) -> Result<OrderStatus, DomainError> {
        self.require_admin(user_id).await?;
        let order = blocking(&self.orders, move |repo| repo.find(order_id))
            .await?
            .ok_or_else(|| DomainError::not_found("Order"))?;
        self.apply(order, OrderEvent::AdminShipped).await
    }

    pub async fn mark_completed(&self, user_id: Uuid, order_id: Uuid) -> Result<OrderStatus, DomainError> {
        let order = self.owned(user_id, order_id).await?;
        self.apply(order, OrderEvent::ReceiptConfirmed).await
    }

    pub async fn cancel(&self, user_id: Uuid, order_id: Uuid) -> Result<OrderStatus, DomainError> {
        let order = self.owned(user_id, order_id).await?;
        self.apply(order, OrderEvent::CustomerCancelled).await
    }

    async fn owned(&self, user_id: Uuid, order_id: Uuid) -> Result<Order, DomainError> {
        blocking(&self.orders, move |repo| repo.find(order_id))
            .await?
            .filter(|order| order.is_owned_by(user_id))
            .ok_or_else(|| DomainError::not_found("Order"))
    }

    pub async fn is_admin(&self, user_id: Uuid) -> Result<bool, DomainError> {
        let role = blocking(&self.profiles, move |repo| repo.role_of(user_id)).await?;
        Ok(role == Some(Role::Admin))
    }

    async fn require_admin(&self, user_id: Uuid) -> Result<(), DomainError> {
        if self.is_admin(user_id).await? {
            Ok(())
        } else {
            Err(DomainError::Forbidden)
        }
    }

    async fn apply(&self, order: Order, event: OrderEvent) -> Result<OrderStatus, DomainError> {
        let next = order.status.apply(event)?;
        let (id, from) = (order.id, order.status);
        let applied = blocking(&self.orders, move |repo| repo.transition(id, from, next, None)).await?;
        if !applied {
            return Err(DomainError::Conflict(format!(
                "order {id} changed while applying {event}"
            )));
        }
        log::info!("Order {} moved from {} to {}", id, from, next);
        Ok(next)
    }
}
