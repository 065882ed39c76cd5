use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::Identity;
use crate::domain::order::{Order, OrderDetail, OrderItem, OrderStatus};
use crate::errors::AppError;
use crate::AppState;

// ── Response DTOs ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub status: OrderStatus,
    /// Smallest currency unit, shipping included.
    pub total_amount: i64,
    pub payment_id: Option<String>,
    pub payment_type: Option<String>,
    pub shipping_address: String,
    pub snap_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            user_id: o.user_id,
            status: o.status,
            total_amount: o.total_amount,
            payment_id: o.payment_id,
            payment_type: o.payment_type,
            shipping_address: o.shipping_address,
            snap_token: o.snap_token,
            created_at: o.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price_at_purchase: i64,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(i: OrderItem) -> Self {
        Self {
            id: i.id,
            product_id: i.product_id,
            product_name: i.product_name,
            quantity: i.quantity,
            price_at_purchase: i.price_at_purchase,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderDetailResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub items: Vec<OrderItemResponse>,
}

impl From<OrderDetail> for OrderDetailResponse {
    fn from(d: OrderDetail) -> Self {
        Self {
            order: d.order.into(),
            items: d.items.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderStatusResponse {
    pub order_id: Uuid,
    pub status: OrderStatus,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /api/orders
///
/// The caller's orders, newest first, without items.
#[utoipa::path(
    get,
    path = "/api/orders",
    params(("X-User-Id" = Uuid, Header, description = "Verified caller")),
    responses(
        (status = 200, description = "Caller's orders", body = [OrderResponse]),
        (status = 401, description = "No caller identity"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    identity: Identity,
) -> Result<HttpResponse, AppError> {
    let orders = state.orders.list_for_user(identity.0).await?;
    let body: Vec<OrderResponse> = orders.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /api/orders/{id}
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Verified caller"),
    ),
    responses(
        (status = 200, description = "Order with its items", body = OrderDetailResponse),
        (status = 404, description = "Order not found or not owned by the caller"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let detail = state.orders.get_for_user(identity.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(OrderDetailResponse::from(detail)))
}

/// GET /api/orders/{id}/status
///
/// Cheap status read used by the payment page's polling fallback.
#[utoipa::path(
    get,
    path = "/api/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Verified caller"),
    ),
    responses(
        (status = 200, description = "Current status", body = OrderStatusResponse),
        (status = 404, description = "Order not found or not owned by the caller"),
    ),
    tag = "orders"
)]
pub async fn order_status(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let status = state.orders.status_for_user(identity.0, order_id).await?;
    Ok(HttpResponse::Ok().json(OrderStatusResponse { order_id, status }))
}

/// POST /api/orders/{id}/cancel
///
/// Abandons a pending order. Stock is not restored.
#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Verified caller"),
    ),
    responses(
        (status = 200, description = "Order failed", body = OrderStatusResponse),
        (status = 400, description = "Order is not pending"),
        (status = 404, description = "Order not found or not owned by the caller"),
        (status = 409, description = "Order changed concurrently"),
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let status = state.orders.cancel(identity.0, order_id).await?;
    Ok(HttpResponse::Ok().json(OrderStatusResponse { order_id, status }))
}

/// POST /api/orders/{id}/complete
///
/// Customer confirms receipt of a shipped order.
#[utoipa::path(
    post,
    path = "/api/orders/{id}/complete",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Verified caller"),
    ),
    responses(
        (status = 200, description = "Order completed", body = OrderStatusResponse),
        (status = 400, description = "Order is not shipped"),
        (status = 404, description = "Order not found or not owned by the caller"),
        (status = 409, description = "Order changed concurrently"),
    ),
    tag = "orders"
)]
pub async fn complete_order(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let status = state.orders.mark_completed(identity.0, order_id).await?;
    Ok(HttpResponse::Ok().json(OrderStatusResponse { order_id, status }))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::Value;

    use super::*;
    use crate::application::memory::{FakeGateway, MemoryStore};
    use crate::handlers::auth::USER_ID_HEADER;
    use crate::handlers::test_support::test_app;

    #[actix_web::test]
    async fn status_is_visible_to_owner_only() {
        let store = MemoryStore::new();
        let (owner, other) = (Uuid::new_v4(), Uuid::new_v4());
        let id = store.insert_order(owner, OrderStatus::Pending, 30_000);
        let app = test::init_service(test_app(&store, FakeGateway::new())).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/orders/{id}/status"))
            .insert_header((USER_ID_HEADER, owner.to_string()))
            .to_request();
        let resp: OrderStatusResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.status, OrderStatus::Pending);

        let req = test::TestRequest::get()
            .uri(&format!("/api/orders/{id}/status"))
            .insert_header((USER_ID_HEADER, other.to_string()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn detail_lists_items_flattened_with_order() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let product = store.add_product(25_000, 4);
        store.add_to_cart(user, product, 2);
        let app = test::init_service(test_app(&store, FakeGateway::new())).await;

        let req = test::TestRequest::post()
            .uri("/api/checkout")
            .insert_header((USER_ID_HEADER, user.to_string()))
            .set_json(serde_json::json!({ "shipping_address": "Jl. Riau 5" }))
            .to_request();
        let placed: Value = test::call_and_read_body_json(&app, req).await;
        let id = placed["order_id"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri(&format!("/api/orders/{id}"))
            .insert_header((USER_ID_HEADER, user.to_string()))
            .to_request();
        let detail: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(detail["id"], id.as_str());
        assert_eq!(detail["status"], "pending");
        assert_eq!(detail["total_amount"], 70_000);
        assert_eq!(detail["items"][0]["price_at_purchase"], 25_000);
        assert_eq!(detail["items"][0]["quantity"], 2);
    }

    #[actix_web::test]
    async fn cancel_pending_then_cancel_again_is_400() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let id = store.insert_order(user, OrderStatus::Pending, 30_000);
        let app = test::init_service(test_app(&store, FakeGateway::new())).await;

        let cancel = || {
            test::TestRequest::post()
                .uri(&format!("/api/orders/{id}/cancel"))
                .insert_header((USER_ID_HEADER, user.to_string()))
                .to_request()
        };
        let resp: OrderStatusResponse = test::call_and_read_body_json(&app, cancel()).await;
        assert_eq!(resp.status, OrderStatus::Failed);

        let resp = test::call_service(&app, cancel()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn list_returns_only_callers_orders() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.insert_order(user, OrderStatus::Paid, 1_000);
        store.insert_order(Uuid::new_v4(), OrderStatus::Paid, 1_000);
        let app = test::init_service(test_app(&store, FakeGateway::new())).await;

        let req = test::TestRequest::get()
            .uri("/api/orders")
            .insert_header((USER_ID_HEADER, user.to_string()))
            .to_request();
        let orders: Vec<OrderResponse> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].user_id, Some(user));
    }

    #[actix_web::test]
    async fn completing_a_paid_order_is_400() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let id = store.insert_order(user, OrderStatus::Paid, 30_000);
        let app = test::init_service(test_app(&store, FakeGateway::new())).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/orders/{id}/complete"))
            .insert_header((USER_ID_HEADER, user.to_string()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
