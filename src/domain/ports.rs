use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::catalog::{CartItemView, CartView, Product, Role};
use super::checkout::{CartLine, CheckoutPlan, PlacedOrder};
use super::errors::DomainError;
use super::order::{Order, OrderDetail, OrderFilter, OrderStatus, PaymentRef};
use super::payment::PaymentLog;
use super::realtime::RealtimeEvent;

pub trait OrderRepository: Send + Sync + 'static {
    /// Lines of the user's cart joined with live product data, or `None` when
    /// the user has no cart row at all.
    fn load_cart_lines(&self, user_id: Uuid) -> Result<Option<Vec<CartLine>>, DomainError>;

    /// Write the order, its items, the stock decrements, the cart cleanup and
    /// the matching realtime events as one unit.
    fn place_order(&self, plan: &CheckoutPlan) -> Result<PlacedOrder, DomainError>;

    fn find(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn find_detail(&self, id: Uuid) -> Result<Option<OrderDetail>, DomainError>;
    fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, DomainError>;
    fn set_snap_token(&self, id: Uuid, token: &str) -> Result<(), DomainError>;

    /// Move an order from `from` to `to` only if it is still in `from`.
    /// Returns `false` when another writer got there first.
    fn transition(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        payment: Option<&PaymentRef>,
    ) -> Result<bool, DomainError>;

    fn append_payment_log(&self, entry: &NewPaymentLog) -> Result<(), DomainError>;
    fn payment_logs_for(&self, order_id: &str) -> Result<Vec<PaymentLog>, DomainError>;
}

pub trait CatalogRepository: Send + Sync + 'static {
    fn list_products(&self) -> Result<Vec<Product>, DomainError>;
    fn find_product(&self, id: Uuid) -> Result<Option<Product>, DomainError>;
    fn cart_for(&self, user_id: Uuid) -> Result<Option<CartView>, DomainError>;
    /// Set the quantity of `product_id` in the user's cart, creating the cart
    /// on first use.
    fn upsert_cart_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartItemView, DomainError>;
    fn remove_cart_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool, DomainError>;
}

pub trait ProfileRepository: Send + Sync + 'static {
    fn role_of(&self, user_id: Uuid) -> Result<Option<Role>, DomainError>;
}

pub trait OutboxRepository: Send + Sync + 'static {
    fn fetch_unpublished(&self, limit: i64) -> Result<Vec<OutboxEntry>, DomainError>;
    fn mark_published(&self, ids: &[Uuid]) -> Result<(), DomainError>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    async fn create_transaction(&self, request: &SnapRequest) -> Result<SnapSession, DomainError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPaymentLog {
    pub order_id: String,
    pub external_id: Option<String>,
    pub status: Option<String>,
    pub raw_payload: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    pub id: Uuid,
    pub event: RealtimeEvent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerDetails {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapRequest {
    pub order_id: Uuid,
    pub gross_amount: i64,
    pub customer: CustomerDetails,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapSession {
    pub token: String,
    pub redirect_url: Option<String>,
}
