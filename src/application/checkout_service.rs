use std::sync::Arc;

use uuid::Uuid;

use super::blocking;
use crate::domain::checkout::{price_cart, CheckoutPlan, ShippingFees};
use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderStatus, ShippingMethod};
use crate::domain::ports::{CustomerDetails, OrderRepository, PaymentGateway, SnapRequest};

#[derive(Debug, Clone)]
pub struct CheckoutInput {
    pub shipping_address: String,
    pub shipping_method: ShippingMethod,
    pub customer: CustomerDetails,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReceipt {
    pub order_id: Uuid,
    pub snap_token: String,
    pub redirect_url: Option<String>,
    pub gross_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
    pub order_id: Uuid,
    pub snap_token: String,
    pub redirect_url: Option<String>,
    pub gross_amount: i64,
    pub status: OrderStatus,
}

#[derive(Clone)]
pub struct CheckoutService {
    orders: Arc<dyn OrderRepository>,
    gateway: Arc<dyn PaymentGateway>,
    fees: ShippingFees,
}

impl CheckoutService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        gateway: Arc<dyn PaymentGateway>,
        fees: ShippingFees,
    ) -> Self {
        Self {
            orders,
            gateway,
            fees,
        }
    }

    /// Turn the user's cart into a pending order and open a payment session
    /// for it.
    pub async fn checkout(
        &self,
        user_id: Uuid,
        input: CheckoutInput,
    ) -> Result<CheckoutReceipt, DomainError> {
        let shipping_address = input.shipping_address.trim().to_string();
        if shipping_address.is_empty() {
            return Err(DomainError::Validation(
                "shipping_address is required".to_string(),
            ));
        }

        let lines = blocking(&self.orders, move |repo| repo.load_cart_lines(user_id))
            .await?
            .ok_or_else(|| DomainError::not_found("Cart"))?;
        if lines.is_empty() {
            return Err(DomainError::Validation("Cart is empty".to_string()));
        }

        let total_amount = price_cart(&lines, self.fees.fee_for(input.shipping_method))?;
        let plan = CheckoutPlan {
            order_id: Uuid::new_v4(),
            user_id,
            shipping_address,
            lines,
            total_amount,
        };
        let placed = blocking(&self.orders, move |repo| repo.place_order(&plan)).await?;
        log::info!(
            "Order {} placed for user {} with total {}",
            placed.order_id,
            user_id,
            placed.total_amount
        );

        let session = self
            .open_session(placed.order_id, placed.total_amount, input.customer)
            .await?;

        Ok(CheckoutReceipt {
            order_id: placed.order_id,
            snap_token: session.0,
            redirect_url: session.1,
            gross_amount: placed.total_amount,
        })
    }

    /// Hand back a payment session for a pending order, reusing the stored
    /// token when there is one.
    pub async fn resume_payment(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<PaymentSession, DomainError> {
        let order = self.owned_order(user_id, order_id).await?;
        if order.status != OrderStatus::Pending {
            return Err(DomainError::Conflict(format!(
                "Order is not pending (status: {})",
                order.status
            )));
        }

        if let Some(token) = order.snap_token {
            return Ok(PaymentSession {
                order_id: order.id,
                snap_token: token,
                redirect_url: None,
                gross_amount: order.total_amount,
                status: order.status,
            });
        }

        let (token, redirect_url) = self
            .open_session(order.id, order.total_amount, CustomerDetails::default())
            .await?;
        Ok(PaymentSession {
            order_id: order.id,
            snap_token: token,
            redirect_url,
            gross_amount: order.total_amount,
            status: order.status,
        })
    }

    async fn owned_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Order, DomainError> {
        blocking(&self.orders, move |repo| repo.find(order_id))
            .await?
            .filter(|order| order.is_owned_by(user_id))
            .ok_or_else(|| DomainError::not_found("Order"))
    }

    async fn open_session(
        &self,
        order_id: Uuid,
        gross_amount: i64,
        customer: CustomerDetails,
    ) -> Result<(String, Option<String>), DomainError> {
        if gross_amount <= 0 {
            return Err(DomainError::Validation(
                "Invalid order total amount".to_string(),
            ));
        }

        let request = SnapRequest {
            order_id,
            gross_amount,
            customer,
        };
        let session = self
            .gateway
            .create_transaction(&request)
            .await
            .map_err(|e| {
                log::error!("Payment session for order {} failed: {}", order_id, e);
                match e {
                    DomainError::Upstream(_) => e,
                    other => DomainError::Upstream(other.to_string()),
                }
            })?;

        let token = session.token.clone();
        blocking(&self.orders, move |repo| repo.set_snap_token(order_id, &token)).await?;
        Ok((session.token, session.redirect_url))
    }
}
