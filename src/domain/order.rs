use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Failed,
    Shipped,
    Completed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Failed,
        OrderStatus::Shipped,
        OrderStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Failed | OrderStatus::Completed)
    }

    /// Apply `event` to an order currently in `self`.
    ///
    /// Only the pairs below are legal; everything else is rejected and the
    /// caller must leave the stored status untouched.
    pub fn apply(self, event: OrderEvent) -> Result<OrderStatus, DomainError> {
        use OrderEvent::*;
        use OrderStatus::*;

        match (self, event) {
            (Pending, PaymentSettled) => Ok(Paid),
            (Pending, PaymentFailed) => Ok(Failed),
            (Pending, PaymentPending) => Ok(Pending),
            (Pending, CustomerCancelled) => Ok(Failed),
            (Paid, AdminShipped) => Ok(Shipped),
            (Shipped, ReceiptConfirmed) => Ok(Completed),
            (from, event) => Err(DomainError::InvalidTransition { from, event }),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "failed" => Ok(OrderStatus::Failed),
            "shipped" => Ok(OrderStatus::Shipped),
            "completed" => Ok(OrderStatus::Completed),
            other => Err(DomainError::Validation(format!(
                "unknown order status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEvent {
    PaymentSettled,
    PaymentFailed,
    PaymentPending,
    CustomerCancelled,
    AdminShipped,
    ReceiptConfirmed,
}

impl OrderEvent {
    pub const ALL: [OrderEvent; 6] = [
        OrderEvent::PaymentSettled,
        OrderEvent::PaymentFailed,
        OrderEvent::PaymentPending,
        OrderEvent::CustomerCancelled,
        OrderEvent::AdminShipped,
        OrderEvent::ReceiptConfirmed,
    ];
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderEvent::PaymentSettled => "payment settlement",
            OrderEvent::PaymentFailed => "payment failure",
            OrderEvent::PaymentPending => "payment pending",
            OrderEvent::CustomerCancelled => "customer cancellation",
            OrderEvent::AdminShipped => "shipment",
            OrderEvent::ReceiptConfirmed => "receipt confirmation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMethod {
    #[default]
    Standard,
    Express,
}

/// Gateway transaction details stored alongside a payment transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentRef {
    pub payment_id: Option<String>,
    pub payment_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub status: OrderStatus,
    pub total_amount: i64,
    pub payment_id: Option<String>,
    pub payment_type: Option<String>,
    pub shipping_address: String,
    pub snap_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == Some(user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price_at_purchase: i64,
}

#[derive(Debug, Clone)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
}
