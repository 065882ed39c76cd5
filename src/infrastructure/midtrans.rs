//! Midtrans Snap over its REST API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::ports::{PaymentGateway, SnapRequest, SnapSession};

const SANDBOX_URL: &str = "https://app.sandbox.midtrans.com";
const PRODUCTION_URL: &str = "https://app.midtrans.com";

#[derive(Debug, Serialize)]
struct TransactionDetails {
    order_id: String,
    gross_amount: i64,
}

#[derive(Debug, Serialize)]
struct CustomerDetailsBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Callbacks {
    finish: String,
    error: String,
    pending: String,
}

#[derive(Debug, Serialize)]
struct SnapBody<'a> {
    transaction_details: TransactionDetails,
    customer_details: CustomerDetailsBody<'a>,
    callbacks: Callbacks,
}

#[derive(Debug, Deserialize)]
struct SnapResponse {
    token: Option<String>,
    redirect_url: Option<String>,
    #[serde(default)]
    error_messages: Vec<String>,
}

pub struct MidtransGateway {
    http: reqwest::Client,
    server_key: String,
    base_url: String,
    site_url: String,
}

impl MidtransGateway {
    pub fn new(server_key: impl Into<String>, is_production: bool, site_url: impl Into<String>) -> Self {
        let base_url = if is_production { PRODUCTION_URL } else { SANDBOX_URL };
        Self::with_base_url(server_key, base_url, site_url)
    }

    pub fn with_base_url(
        server_key: impl Into<String>,
        base_url: impl Into<String>,
        site_url: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            server_key: server_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            site_url: site_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn body<'a>(&self, request: &'a SnapRequest) -> SnapBody<'a> {
        let return_to = |page: &str| {
            format!("{}/cart/{page}?order_id={}", self.site_url, request.order_id)
        };
        SnapBody {
            transaction_details: TransactionDetails {
                order_id: request.order_id.to_string(),
                gross_amount: request.gross_amount,
            },
            customer_details: CustomerDetailsBody {
                first_name: request.customer.full_name.as_deref(),
                email: request.customer.email.as_deref(),
                phone: request.customer.phone.as_deref(),
            },
            callbacks: Callbacks {
                finish: return_to("payment-success"),
                error: return_to("payment-failed"),
                pending: return_to("payment-pending"),
            },
        }
    }
}

#[async_trait]
impl PaymentGateway for MidtransGateway {
    async fn create_transaction(&self, request: &SnapRequest) -> Result<SnapSession, DomainError> {
        let resp = self
            .http
            .post(format!("{}/snap/v1/transactions", self.base_url))
            .basic_auth(&self.server_key, None::<&str>)
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| DomainError::Upstream(e.to_string()))?;

        let status = resp.status();
        let parsed: SnapResponse = resp
            .json()
            .await
            .map_err(|e| DomainError::Upstream(format!("unreadable Snap response ({status}): {e}")))?;

        match parsed.token {
            Some(token) if status.is_success() => Ok(SnapSession {
                token,
                redirect_url: parsed.redirect_url,
            }),
            _ => Err(DomainError::Upstream(format!(
                "Snap returned {status}: {}",
                parsed.error_messages.join("; ")
            ))),
        }
    }
}
