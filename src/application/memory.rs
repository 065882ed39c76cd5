//! In-memory implementations of the ports, used by service and handler tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::catalog::{CartItemView, CartView, Product, Role};
use crate::domain::checkout::{CartLine, CheckoutPlan, PlacedOrder};
use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderDetail, OrderFilter, OrderItem, OrderStatus, PaymentRef};
use crate::domain::payment::PaymentLog;
use crate::domain::ports::{
    CatalogRepository, NewPaymentLog, OrderRepository, OutboxEntry, OutboxRepository,
    PaymentGateway, ProfileRepository, SnapRequest, SnapSession,
};
use crate::domain::realtime::RealtimeEvent;

#[derive(Debug, Clone)]
struct StoredCartItem {
    id: Uuid,
    product_id: Uuid,
    quantity: i32,
}

#[derive(Default)]
struct State {
    products: HashMap<Uuid, Product>,
    carts: HashMap<Uuid, (Uuid, Vec<StoredCartItem>)>,
    orders: HashMap<Uuid, Order>,
    items: HashMap<Uuid, Vec<OrderItem>>,
    payment_logs: Vec<NewPaymentLog>,
    outbox: Vec<(OutboxEntry, bool)>,
    roles: HashMap<Uuid, Role>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_product(&self, price: i64, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().products.insert(
            id,
            Product {
                id,
                name: format!("product-{id}"),
                description: String::new(),
                price,
                stock,
                category: "general".to_string(),
                image_urls: vec![],
            },
        );
        id
    }

    pub fn set_price(&self, product_id: Uuid, price: i64) {
        if let Some(p) = self.state.lock().unwrap().products.get_mut(&product_id) {
            p.price = price;
        }
    }

    pub fn stock_of(&self, product_id: Uuid) -> i32 {
        self.state.lock().unwrap().products[&product_id].stock
    }

    pub fn add_to_cart(&self, user_id: Uuid, product_id: Uuid, quantity: i32) {
        let mut state = self.state.lock().unwrap();
        let cart = state
            .carts
            .entry(user_id)
            .or_insert_with(|| (Uuid::new_v4(), vec![]));
        cart.1.push(StoredCartItem {
            id: Uuid::new_v4(),
            product_id,
            quantity,
        });
    }

    pub fn create_empty_cart(&self, user_id: Uuid) {
        self.state
            .lock()
            .unwrap()
            .carts
            .entry(user_id)
            .or_insert_with(|| (Uuid::new_v4(), vec![]));
    }

    pub fn cart_len(&self, user_id: Uuid) -> usize {
        self.state
            .lock()
            .unwrap()
            .carts
            .get(&user_id)
            .map(|(_, items)| items.len())
            .unwrap_or(0)
    }

    pub fn make_admin(&self, user_id: Uuid) {
        self.state.lock().unwrap().roles.insert(user_id, Role::Admin);
    }

    pub fn insert_order(&self, user_id: Uuid, status: OrderStatus, total_amount: i64) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().orders.insert(
            id,
            Order {
                id,
                user_id: Some(user_id),
                status,
                total_amount,
                payment_id: None,
                payment_type: None,
                shipping_address: "Jl. Test 1".to_string(),
                snap_token: None,
                created_at: Utc::now(),
            },
        );
        id
    }

    pub fn order(&self, id: Uuid) -> Order {
        self.state.lock().unwrap().orders[&id].clone()
    }

    pub fn order_count(&self) -> usize {
        self.state.lock().unwrap().orders.len()
    }

    pub fn items_of(&self, order_id: Uuid) -> Vec<OrderItem> {
        self.state
            .lock()
            .unwrap()
            .items
            .get(&order_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn payment_logs(&self) -> Vec<NewPaymentLog> {
        self.state.lock().unwrap().payment_logs.clone()
    }

    pub fn events(&self) -> Vec<RealtimeEvent> {
        self.state
            .lock()
            .unwrap()
            .outbox
            .iter()
            .map(|(entry, _)| entry.event.clone())
            .collect()
    }

    fn push_event(state: &mut State, event: RealtimeEvent) {
        state.outbox.push((
            OutboxEntry {
                id: Uuid::new_v4(),
                event,
            },
            false,
        ));
    }
}

impl OrderRepository for MemoryStore {
    fn load_cart_lines(&self, user_id: Uuid) -> Result<Option<Vec<CartLine>>, DomainError> {
        let state = self.state.lock().unwrap();
        let Some((_, items)) = state.carts.get(&user_id) else {
            return Ok(None);
        };
        let lines = items
            .iter()
            .map(|item| {
                let product = state
                    .products
                    .get(&item.product_id)
                    .ok_or_else(|| DomainError::not_found("Product"))?;
                Ok(CartLine {
                    cart_item_id: item.id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_price: product.price,
                    stock: product.stock,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;
        Ok(Some(lines))
    }

    fn place_order(&self, plan: &CheckoutPlan) -> Result<PlacedOrder, DomainError> {
        let mut state = self.state.lock().unwrap();

        let consumed: Vec<Uuid> = plan.lines.iter().map(|l| l.cart_item_id).collect();
        let in_cart = state
            .carts
            .get(&plan.user_id)
            .map(|(_, items)| items.iter().filter(|item| consumed.contains(&item.id)).count())
            .unwrap_or(0);
        if in_cart != consumed.len() {
            return Err(DomainError::Conflict("Cart changed during checkout".to_string()));
        }

        // Validate every decrement before touching anything.
        for line in &plan.lines {
            let stock = state.products.get(&line.product_id).map(|p| p.stock).unwrap_or(0);
            if stock < line.quantity {
                return Err(DomainError::InsufficientStock {
                    product_id: line.product_id,
                    available: stock,
                    requested: line.quantity,
                });
            }
        }

        state.orders.insert(
            plan.order_id,
            Order {
                id: plan.order_id,
                user_id: Some(plan.user_id),
                status: OrderStatus::Pending,
                total_amount: plan.total_amount,
                payment_id: None,
                payment_type: None,
                shipping_address: plan.shipping_address.clone(),
                snap_token: None,
                created_at: Utc::now(),
            },
        );

        let mut items = Vec::new();
        let mut stock_events = Vec::new();
        for line in &plan.lines {
            let product = state
                .products
                .get_mut(&line.product_id)
                .ok_or_else(|| DomainError::not_found("Product"))?;
            product.stock -= line.quantity;
            stock_events.push(RealtimeEvent::stock_updated(product.id, product.stock));
            items.push(OrderItem {
                id: Uuid::new_v4(),
                product_id: line.product_id,
                product_name: product.name.clone(),
                quantity: line.quantity,
                price_at_purchase: line.unit_price,
            });
        }
        state.items.insert(plan.order_id, items);

        if let Some((_, cart_items)) = state.carts.get_mut(&plan.user_id) {
            cart_items.retain(|item| !consumed.contains(&item.id));
        }

        Self::push_event(
            &mut state,
            RealtimeEvent::order_created(plan.order_id, plan.user_id, plan.total_amount),
        );
        for event in stock_events {
            Self::push_event(&mut state, event);
        }

        Ok(PlacedOrder {
            order_id: plan.order_id,
            total_amount: plan.total_amount,
        })
    }

    fn find(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.state.lock().unwrap().orders.get(&id).cloned())
    }

    fn find_detail(&self, id: Uuid) -> Result<Option<OrderDetail>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state.orders.get(&id).map(|order| OrderDetail {
            order: order.clone(),
            items: state.items.get(&id).cloned().unwrap_or_default(),
        }))
    }

    fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, DomainError> {
        let state = self.state.lock().unwrap();
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| filter.user_id.map_or(true, |u| o.user_id == Some(u)))
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    fn set_snap_token(&self, id: Uuid, token: &str) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();
        let order = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Order"))?;
        order.snap_token = Some(token.to_string());
        Ok(())
    }

    fn transition(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        payment: Option<&PaymentRef>,
    ) -> Result<bool, DomainError> {
        let mut state = self.state.lock().unwrap();
        let Some(order) = state.orders.get_mut(&id) else {
            return Ok(false);
        };
        if order.status != from {
            return Ok(false);
        }
        order.status = to;
        let owner = order.user_id;
        if let Some(payment) = payment {
            if payment.payment_id.is_some() {
                order.payment_id = payment.payment_id.clone();
            }
            if payment.payment_type.is_some() {
                order.payment_type = payment.payment_type.clone();
            }
        }
        Self::push_event(&mut state, RealtimeEvent::order_status_changed(id, owner, to));
        Ok(true)
    }

    fn append_payment_log(&self, entry: &NewPaymentLog) -> Result<(), DomainError> {
        self.state.lock().unwrap().payment_logs.push(entry.clone());
        Ok(())
    }

    fn payment_logs_for(&self, order_id: &str) -> Result<Vec<PaymentLog>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .payment_logs
            .iter()
            .filter(|log| log.order_id == order_id)
            .map(|log| PaymentLog {
                id: Uuid::new_v4(),
                order_id: log.order_id.clone(),
                external_id: log.external_id.clone(),
                status: log.status.clone(),
                raw_payload: log.raw_payload.clone(),
                received_at: Utc::now(),
            })
            .collect())
    }
}

impl CatalogRepository for MemoryStore {
    fn list_products(&self) -> Result<Vec<Product>, DomainError> {
        Ok(self.state.lock().unwrap().products.values().cloned().collect())
    }

    fn find_product(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        Ok(self.state.lock().unwrap().products.get(&id).cloned())
    }

    fn cart_for(&self, user_id: Uuid) -> Result<Option<CartView>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state.carts.get(&user_id).map(|(cart_id, items)| CartView {
            id: *cart_id,
            items: items
                .iter()
                .filter_map(|item| {
                    let product = state.products.get(&item.product_id)?;
                    Some(CartItemView {
                        id: item.id,
                        product_id: item.product_id,
                        quantity: item.quantity,
                        product_name: product.name.clone(),
                        unit_price: product.price,
                        stock: product.stock,
                    })
                })
                .collect(),
        }))
    }

    fn upsert_cart_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartItemView, DomainError> {
        let mut state = self.state.lock().unwrap();
        let product = state
            .products
            .get(&product_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("Product"))?;
        let (_, items) = state
            .carts
            .entry(user_id)
            .or_insert_with(|| (Uuid::new_v4(), vec![]));
        let id = match items.iter_mut().find(|i| i.product_id == product_id) {
            Some(existing) => {
                existing.quantity = quantity;
                existing.id
            }
            None => {
                let id = Uuid::new_v4();
                items.push(StoredCartItem {
                    id,
                    product_id,
                    quantity,
                });
                id
            }
        };
        Ok(CartItemView {
            id,
            product_id,
            quantity,
            product_name: product.name,
            unit_price: product.price,
            stock: product.stock,
        })
    }

    fn remove_cart_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool, DomainError> {
        let mut state = self.state.lock().unwrap();
        let Some((_, items)) = state.carts.get_mut(&user_id) else {
            return Ok(false);
        };
        let before = items.len();
        items.retain(|i| i.id != item_id);
        Ok(items.len() != before)
    }
}

impl ProfileRepository for MemoryStore {
    fn role_of(&self, user_id: Uuid) -> Result<Option<Role>, DomainError> {
        Ok(Some(
            self.state
                .lock()
                .unwrap()
                .roles
                .get(&user_id)
                .copied()
                .unwrap_or(Role::Customer),
        ))
    }
}

impl OutboxRepository for MemoryStore {
    fn fetch_unpublished(&self, limit: i64) -> Result<Vec<OutboxEntry>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .outbox
            .iter()
            .filter(|(_, published)| !published)
            .take(limit as usize)
            .map(|(entry, _)| entry.clone())
            .collect())
    }

    fn mark_published(&self, ids: &[Uuid]) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();
        for (entry, published) in state.outbox.iter_mut() {
            if ids.contains(&entry.id) {
                *published = true;
            }
        }
        Ok(())
    }
}

/// Gateway double that hands out numbered tokens and can be told to fail.
#[derive(Default)]
pub struct FakeGateway {
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let gateway = Self::default();
        gateway.fail.store(true, Ordering::SeqCst);
        Arc::new(gateway)
    }

    pub fn recover(&self) {
        self.fail.store(false, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_transaction(&self, request: &SnapRequest) -> Result<SnapSession, DomainError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::Upstream("gateway unavailable".to_string()));
        }
        Ok(SnapSession {
            token: format!("snap-{}-{n}", request.order_id),
            redirect_url: Some(format!("https://pay.test/{}", request.order_id)),
        })
    }
}
