use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::auth::Identity;
use crate::application::checkout_service::{CheckoutInput, CheckoutReceipt, PaymentSession};
use crate::domain::order::{OrderStatus, ShippingMethod};
use crate::domain::ports::CustomerDetails;
use crate::errors::AppError;
use crate::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "shipping_address is required"))]
    pub shipping_address: String,
    #[serde(default)]
    pub shipping_method: ShippingMethod,
    #[validate(length(min = 1))]
    pub full_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 5))]
    pub phone: Option<String>,
}

impl From<CheckoutRequest> for CheckoutInput {
    fn from(req: CheckoutRequest) -> Self {
        CheckoutInput {
            shipping_address: req.shipping_address,
            shipping_method: req.shipping_method,
            customer: CustomerDetails {
                full_name: req.full_name,
                email: req.email,
                phone: req.phone,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutResponse {
    pub order_id: Uuid,
    pub snap_token: String,
    pub redirect_url: Option<String>,
    pub gross_amount: i64,
}

impl From<CheckoutReceipt> for CheckoutResponse {
    fn from(r: CheckoutReceipt) -> Self {
        Self {
            order_id: r.order_id,
            snap_token: r.snap_token,
            redirect_url: r.redirect_url,
            gross_amount: r.gross_amount,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ResumePaymentRequest {
    pub order_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentSessionResponse {
    pub order_id: Uuid,
    pub snap_token: String,
    /// Only present when a new session was opened.
    pub redirect_url: Option<String>,
    pub gross_amount: i64,
    pub status: OrderStatus,
}

impl From<PaymentSession> for PaymentSessionResponse {
    fn from(s: PaymentSession) -> Self {
        Self {
            order_id: s.order_id,
            snap_token: s.snap_token,
            redirect_url: s.redirect_url,
            gross_amount: s.gross_amount,
            status: s.status,
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /api/checkout
///
/// Converts the caller's cart into a pending order, decrementing stock in the
/// same transaction, then opens a Snap payment session for the total.
#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = CheckoutRequest,
    params(("X-User-Id" = Uuid, Header, description = "Verified caller")),
    responses(
        (status = 200, description = "Order placed and payment session opened", body = CheckoutResponse),
        (status = 400, description = "Empty cart, invalid body or insufficient stock"),
        (status = 401, description = "No caller identity"),
        (status = 404, description = "Caller has no cart"),
        (status = 502, description = "Payment gateway failed; the order stays pending"),
    ),
    tag = "checkout"
)]
pub async fn checkout(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()?;

    let receipt = state.checkout.checkout(identity.0, body.into()).await?;
    Ok(HttpResponse::Ok().json(CheckoutResponse::from(receipt)))
}

/// POST /api/payment
///
/// Returns a payment session for a pending order owned by the caller. The
/// stored token is reused when present.
#[utoipa::path(
    post,
    path = "/api/payment",
    request_body = ResumePaymentRequest,
    params(("X-User-Id" = Uuid, Header, description = "Verified caller")),
    responses(
        (status = 200, description = "Payment session", body = PaymentSessionResponse),
        (status = 401, description = "No caller identity"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not pending"),
        (status = 502, description = "Payment gateway failed"),
    ),
    tag = "checkout"
)]
pub async fn resume_payment(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<ResumePaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let session = state
        .checkout
        .resume_payment(identity.0, body.order_id)
        .await?;
    Ok(HttpResponse::Ok().json(PaymentSessionResponse::from(session)))
}
