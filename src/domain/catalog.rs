use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub stock: i32,
    pub category: String,
    pub image_urls: Vec<String>,
}

/// One cart line with exactly one product attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub product_name: String,
    pub unit_price: i64,
    pub stock: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartView {
    pub id: Uuid,
    pub items: Vec<CartItemView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Admin,
}

impl Role {
    pub fn from_db(value: &str) -> Self {
        if value == "admin" {
            Role::Admin
        } else {
            Role::Customer
        }
    }
}
