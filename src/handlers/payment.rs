use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::order::OrderStatus;
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookResponse {
    pub ok: bool,
    pub order_id: String,
    /// Status the notification mapped to, or null when it was not actionable.
    pub order_status: Option<OrderStatus>,
}

/// POST /api/payment-webhook
///
/// Gateway transaction notification. Authenticated by its SHA-512 signature,
/// not by caller identity. Safe to deliver more than once.
#[utoipa::path(
    post,
    path = "/api/payment-webhook",
    responses(
        (status = 200, description = "Notification recorded", body = WebhookResponse),
        (status = 400, description = "Missing order_id"),
        (status = 401, description = "Signature missing or invalid"),
        (status = 404, description = "Order not found (notification still logged)"),
    ),
    tag = "payment"
)]
pub async fn payment_webhook(
    state: web::Data<AppState>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let outcome = state.payments.handle(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(WebhookResponse {
        ok: true,
        order_id: outcome.order_id,
        order_status: outcome.order_status,
    }))
}
