use uuid::Uuid;

use super::errors::DomainError;
use super::order::ShippingMethod;

/// Flat shipping fees in the smallest currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingFees {
    pub standard: i64,
    pub express: i64,
}

impl Default for ShippingFees {
    fn default() -> Self {
        Self {
            standard: 20_000,
            express: 50_000,
        }
    }
}

impl ShippingFees {
    pub fn fee_for(&self, method: ShippingMethod) -> i64 {
        match method {
            ShippingMethod::Standard => self.standard,
            ShippingMethod::Express => self.express,
        }
    }
}

/// A cart line joined with the live product it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub cart_item_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
    pub stock: i32,
}

/// Everything the persistence layer needs to write a pending order.
#[derive(Debug, Clone)]
pub struct CheckoutPlan {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub shipping_address: String,
    pub lines: Vec<CartLine>,
    pub total_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order_id: Uuid,
    pub total_amount: i64,
}

/// Validate stock for every line and compute the order total.
///
/// Fails on the first line whose requested quantity exceeds live stock, before
/// anything is written.
pub fn price_cart(lines: &[CartLine], shipping_fee: i64) -> Result<i64, DomainError> {
    if lines.is_empty() {
        return Err(DomainError::Validation("Cart is empty".to_string()));
    }

    let mut total: i64 = 0;
    for line in lines {
        if line.quantity <= 0 {
            return Err(DomainError::Validation(format!(
                "quantity for product {} must be positive",
                line.product_id
            )));
        }
        if line.stock < line.quantity {
            return Err(DomainError::InsufficientStock {
                product_id: line.product_id,
                available: line.stock,
                requested: line.quantity,
            });
        }
        let subtotal = line
            .unit_price
            .checked_mul(i64::from(line.quantity))
            .ok_or_else(|| DomainError::Validation("order total overflows".to_string()))?;
        total = total
            .checked_add(subtotal)
            .ok_or_else(|| DomainError::Validation("order total overflows".to_string()))?;
    }

    let total = total
        .checked_add(shipping_fee)
        .ok_or_else(|| DomainError::Validation("order total overflows".to_string()))?;
    if total <= 0 {
        return Err(DomainError::Validation(
            "Invalid order total amount".to_string(),
        ));
    }
    Ok(total)
}
