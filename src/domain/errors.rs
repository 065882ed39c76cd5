use thiserror::Error;
use uuid::Uuid;

use super::order::{OrderEvent, OrderStatus};

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Insufficient stock for product {product_id}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        product_id: Uuid,
        available: i32,
        requested: i32,
    },
    #[error("Cannot apply {event} to an order in status {from}")]
    InvalidTransition { from: OrderStatus, event: OrderEvent },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid signature")]
    SignatureInvalid,
    #[error("Payment gateway error: {0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        DomainError::NotFound(what.into())
    }
}
