use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha512};
use uuid::Uuid;

use super::errors::DomainError;
use super::order::{OrderEvent, OrderStatus};

/// Fields the gateway sends with a transaction notification.
///
/// Only string-typed values are honoured; anything else is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentNotification {
    pub order_id: Option<String>,
    pub status_code: Option<String>,
    pub gross_amount: Option<String>,
    pub signature_key: Option<String>,
    pub transaction_status: Option<String>,
    pub fraud_status: Option<String>,
    pub transaction_id: Option<String>,
    pub payment_type: Option<String>,
}

impl PaymentNotification {
    pub fn from_json(body: &Value) -> Self {
        let field = |name: &str| body.get(name).and_then(Value::as_str).map(str::to_owned);
        Self {
            order_id: field("order_id"),
            status_code: field("status_code"),
            gross_amount: field("gross_amount"),
            signature_key: field("signature_key"),
            transaction_status: field("transaction_status"),
            fraud_status: field("fraud_status"),
            transaction_id: field("transaction_id"),
            payment_type: field("payment_type"),
        }
    }

    /// Check `signature_key` against SHA-512 over
    /// `order_id ‖ status_code ‖ gross_amount ‖ server_key`.
    pub fn verify_signature(&self, server_key: &str) -> Result<(), DomainError> {
        let (Some(order_id), Some(status_code), Some(gross_amount), Some(signature)) = (
            self.order_id.as_deref(),
            self.status_code.as_deref(),
            self.gross_amount.as_deref(),
            self.signature_key.as_deref(),
        ) else {
            return Err(DomainError::SignatureInvalid);
        };

        let expected = signature_for(order_id, status_code, gross_amount, server_key);
        if constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
            Ok(())
        } else {
            Err(DomainError::SignatureInvalid)
        }
    }

    /// Map the gateway's transaction vocabulary onto an order status.
    pub fn mapped_status(&self) -> Option<OrderStatus> {
        match self.transaction_status.as_deref()? {
            "settlement" => Some(OrderStatus::Paid),
            "capture" if self.fraud_status.as_deref() == Some("accept") => Some(OrderStatus::Paid),
            "capture" => Some(OrderStatus::Pending),
            "deny" | "cancel" | "expire" | "failure" => Some(OrderStatus::Failed),
            "pending" => Some(OrderStatus::Pending),
            _ => None,
        }
    }
}

/// A stored gateway notification.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentLog {
    pub id: Uuid,
    pub order_id: String,
    pub external_id: Option<String>,
    pub status: Option<String>,
    pub raw_payload: Value,
    pub received_at: DateTime<Utc>,
}

/// The state-machine event a gateway-reported status stands for.
pub fn gateway_event(target: OrderStatus) -> Option<OrderEvent> {
    match target {
        OrderStatus::Paid => Some(OrderEvent::PaymentSettled),
        OrderStatus::Failed => Some(OrderEvent::PaymentFailed),
        OrderStatus::Pending => Some(OrderEvent::PaymentPending),
        OrderStatus::Shipped | OrderStatus::Completed => None,
    }
}

pub fn signature_for(order_id: &str, status_code: &str, gross_amount: &str, server_key: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hex::encode(hasher.finalize())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
