use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::errors::DomainError;
use super::order::OrderStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Orders,
    Products,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Orders => "orders",
            Channel::Products => "products",
        }
    }
}

impl FromStr for Channel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "orders" => Ok(Channel::Orders),
            "products" => Ok(Channel::Products),
            other => Err(DomainError::not_found(format!("channel '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    OrderCreated,
    OrderPending,
    OrderPaid,
    OrderShipped,
    OrderCompleted,
    OrderUpdated,
    StockUpdated,
    /// Part of the `products` wire contract for catalog writers. This
    /// service never emits it; clients must still accept it.
    ProductCreated,
    /// See [`EventKind::ProductCreated`].
    ProductDeleted,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        EventKind::OrderCreated,
        EventKind::OrderPending,
        EventKind::OrderPaid,
        EventKind::OrderShipped,
        EventKind::OrderCompleted,
        EventKind::OrderUpdated,
        EventKind::StockUpdated,
        EventKind::ProductCreated,
        EventKind::ProductDeleted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::OrderCreated => "order:created",
            EventKind::OrderPending => "order:pending",
            EventKind::OrderPaid => "order:paid",
            EventKind::OrderShipped => "order:shipped",
            EventKind::OrderCompleted => "order:completed",
            EventKind::OrderUpdated => "order:updated",
            EventKind::StockUpdated => "stock:updated",
            EventKind::ProductCreated => "product:created",
            EventKind::ProductDeleted => "product:deleted",
        }
    }

    pub fn channel(self) -> Channel {
        match self {
            EventKind::StockUpdated | EventKind::ProductCreated | EventKind::ProductDeleted => {
                Channel::Products
            }
            _ => Channel::Orders,
        }
    }

    /// Event announcing that an order entered `status`.
    pub fn for_status(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Pending => EventKind::OrderPending,
            OrderStatus::Paid => EventKind::OrderPaid,
            OrderStatus::Shipped => EventKind::OrderShipped,
            OrderStatus::Completed => EventKind::OrderCompleted,
            OrderStatus::Failed => EventKind::OrderUpdated,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DomainError::Validation(format!("unknown event '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeEvent {
    pub kind: EventKind,
    pub payload: Value,
}

impl RealtimeEvent {
    pub fn channel(&self) -> Channel {
        self.kind.channel()
    }

    pub fn order_status_changed(
        order_id: Uuid,
        user_id: Option<Uuid>,
        status: OrderStatus,
    ) -> Self {
        Self {
            kind: EventKind::for_status(status),
            payload: json!({ "order_id": order_id, "user_id": user_id, "status": status }),
        }
    }

    pub fn order_created(order_id: Uuid, user_id: Uuid, total_amount: i64) -> Self {
        Self {
            kind: EventKind::OrderCreated,
            payload: json!({
                "order_id": order_id,
                "user_id": user_id,
                "status": OrderStatus::Pending,
                "total_amount": total_amount,
            }),
        }
    }

    pub fn stock_updated(product_id: Uuid, stock: i32) -> Self {
        Self {
            kind: EventKind::StockUpdated,
            payload: json!({ "product_id": product_id, "stock": stock }),
        }
    }

    /// The order this event is about, if any.
    pub fn order_id(&self) -> Option<Uuid> {
        self.payload
            .get("order_id")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }

    /// The customer who owns the order this event is about, if known.
    pub fn user_id(&self) -> Option<Uuid> {
        self.payload
            .get("user_id")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }
}
