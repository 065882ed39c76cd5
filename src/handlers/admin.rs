use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::auth::Identity;
use super::orders::{OrderDetailResponse, OrderResponse, OrderStatusResponse};
use crate::domain::order::OrderStatus;
use crate::domain::payment::PaymentLog;
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct AdminOrdersQuery {
    /// Only orders in this status.
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentLogResponse {
    pub id: Uuid,
    pub order_id: String,
    pub external_id: Option<String>,
    pub status: Option<String>,
    #[schema(value_type = Object)]
    pub raw_payload: Value,
    pub received_at: DateTime<Utc>,
}

impl From<PaymentLog> for PaymentLogResponse {
    fn from(l: PaymentLog) -> Self {
        Self {
            id: l.id,
            order_id: l.order_id,
            external_id: l.external_id,
            status: l.status,
            raw_payload: l.raw_payload,
            received_at: l.received_at,
        }
    }
}

/// GET /api/admin/orders
#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(
        AdminOrdersQuery,
        ("X-User-Id" = Uuid, Header, description = "Verified admin"),
    ),
    responses(
        (status = 200, description = "All orders, newest first", body = [OrderResponse]),
        (status = 403, description = "Caller is not an admin"),
    ),
    tag = "admin"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    identity: Identity,
    query: web::Query<AdminOrdersQuery>,
) -> Result<HttpResponse, AppError> {
    let orders = state.orders.list_for_admin(identity.0, query.status).await?;
    let body: Vec<OrderResponse> = orders.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /api/admin/orders/{id}
#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Verified admin"),
    ),
    responses(
        (status = 200, description = "Order with its items", body = OrderDetailResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Order not found"),
    ),
    tag = "admin"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let detail = state.orders.get_for_admin(identity.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(OrderDetailResponse::from(detail)))
}

/// POST /api/admin/orders/{id}/ship
#[utoipa::path(
    post,
    path = "/api/admin/orders/{id}/ship",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Verified admin"),
    ),
    responses(
        (status = 200, description = "Order shipped", body = OrderStatusResponse),
        (status = 400, description = "Order is not paid"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order changed concurrently"),
    ),
    tag = "admin"
)]
pub async fn ship_order(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let status = state.orders.mark_shipped(identity.0, order_id).await?;
    Ok(HttpResponse::Ok().json(OrderStatusResponse { order_id, status }))
}

/// GET /api/admin/orders/{id}/payment-logs
///
/// Every authentic gateway notification received for the order, oldest first.
#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}/payment-logs",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Verified admin"),
    ),
    responses(
        (status = 200, description = "Gateway notifications", body = [PaymentLogResponse]),
        (status = 403, description = "Caller is not an admin"),
    ),
    tag = "admin"
)]
pub async fn payment_logs(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let logs = state
        .orders
        .payment_logs_for_admin(identity.0, path.into_inner())
        .await?;
    let body: Vec<PaymentLogResponse> = logs.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}
