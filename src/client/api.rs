//! Typed HTTP client for the storefront API, as used by the payment and order
//! pages.

use std::collections::VecDeque;
use std::future::Future;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use super::reconcile::Outcome;
use super::watcher::{
    refresh_list, watch_payment, ChannelHealth, StatusSource, DEGRADED_LIST_POLL_INTERVAL,
    PAYMENT_POLL_INTERVAL,
};
use crate::domain::order::OrderStatus;
use crate::handlers::auth::USER_ID_HEADER;
use crate::handlers::checkout::PaymentSessionResponse;
use crate::handlers::orders::{OrderResponse, OrderStatusResponse};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {status}: {message}")]
    Api { status: u16, message: String },
}

/// Status updates pushed for one order.
pub type StatusStream = BoxStream<'static, OrderStatus>;

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct StorefrontClient {
    http: reqwest::Client,
    base_url: String,
    user_id: Uuid,
}

impl StorefrontClient {
    pub fn new(base_url: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn read<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
        if resp.status().is_success() {
            return Ok(resp.json().await?);
        }
        Err(Self::api_error(resp).await)
    }

    async fn api_error(resp: reqwest::Response) -> ClientError {
        let status = resp.status();
        let message = match resp.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status.canonical_reason().unwrap_or("unknown").to_string(),
        };
        ClientError::Api {
            status: status.as_u16(),
            message,
        }
    }

    pub async fn order_status(&self, order_id: Uuid) -> Result<OrderStatus, ClientError> {
        let resp = self
            .http
            .get(self.url(&format!("/orders/{order_id}/status")))
            .header(USER_ID_HEADER, self.user_id.to_string())
            .send()
            .await?;
        let body: OrderStatusResponse = Self::read(resp).await?;
        Ok(body.status)
    }

    pub async fn orders(&self) -> Result<Vec<OrderResponse>, ClientError> {
        let resp = self
            .http
            .get(self.url("/orders"))
            .header(USER_ID_HEADER, self.user_id.to_string())
            .send()
            .await?;
        Self::read(resp).await
    }

    /// Reopen the payment popup for a pending order.
    pub async fn resume_payment(
        &self,
        order_id: Uuid,
    ) -> Result<PaymentSessionResponse, ClientError> {
        let resp = self
            .http
            .post(self.url("/payment"))
            .header(USER_ID_HEADER, self.user_id.to_string())
            .json(&json!({ "order_id": order_id }))
            .send()
            .await?;
        Self::read(resp).await
    }

    pub async fn cancel(&self, order_id: Uuid) -> Result<OrderStatus, ClientError> {
        let resp = self
            .http
            .post(self.url(&format!("/orders/{order_id}/cancel")))
            .header(USER_ID_HEADER, self.user_id.to_string())
            .send()
            .await?;
        let body: OrderStatusResponse = Self::read(resp).await?;
        Ok(body.status)
    }

    /// Open the order-scoped event stream.
    ///
    /// `health` is marked healthy once the stream is open and degraded when it
    /// errors or the server closes it.
    pub async fn subscribe_order(
        &self,
        order_id: Uuid,
        health: ChannelHealth,
    ) -> Result<StatusStream, ClientError> {
        let events = self.open_events(Some(order_id), health).await?;
        Ok(events
            .filter_map(|msg| async move { msg.order_status() })
            .boxed())
    }

    /// Settle the payment page for `order_id`, racing the push channel against
    /// a poll every [`PAYMENT_POLL_INTERVAL`]. A push channel that cannot be
    /// opened just leaves polling to do the work.
    pub async fn await_payment(&self, order_id: Uuid) -> Outcome {
        let push = match self.subscribe_order(order_id, ChannelHealth::new()).await {
            Ok(push) => push,
            Err(e) => {
                log::warn!("Push channel unavailable for order {}: {}", order_id, e);
                stream::empty().boxed()
            }
        };
        watch_payment(order_id, push, self, PAYMENT_POLL_INTERVAL).await
    }

    /// Keep the caller's order list fresh until the returned future is
    /// dropped. `refetch` runs on every order event, and every
    /// [`DEGRADED_LIST_POLL_INTERVAL`] while `health` reports the push channel
    /// as degraded.
    pub async fn watch_orders<F, Fut>(&self, health: ChannelHealth, refetch: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        let events = match self.open_events(None, health.clone()).await {
            Ok(events) => events,
            Err(e) => {
                log::warn!("Order events unavailable, polling: {}", e);
                stream::empty().boxed()
            }
        };
        refresh_list(events, health.watch(), DEGRADED_LIST_POLL_INTERVAL, refetch).await;
    }

    async fn open_events(
        &self,
        order_id: Option<Uuid>,
        health: ChannelHealth,
    ) -> Result<BoxStream<'static, SseMessage>, ClientError> {
        let mut request = self
            .http
            .get(self.url("/realtime/orders"))
            .header(USER_ID_HEADER, self.user_id.to_string());
        if let Some(order_id) = order_id {
            request = request.query(&[("order_id", order_id.to_string())]);
        }
        let resp = match request.send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                health.mark_degraded();
                return Err(Self::api_error(resp).await);
            }
            Err(e) => {
                health.mark_degraded();
                return Err(e.into());
            }
        };
        health.mark_healthy();

        let bytes = Box::pin(resp.bytes_stream());
        let messages = stream::unfold(
            (bytes, SseParser::default(), VecDeque::new(), health),
            |(mut bytes, mut parser, mut pending, health)| async move {
                loop {
                    if let Some(msg) = pending.pop_front() {
                        return Some((msg, (bytes, parser, pending, health)));
                    }
                    match bytes.next().await {
                        Some(Ok(chunk)) => pending.extend(parser.push(&chunk)),
                        Some(Err(e)) => {
                            log::warn!("Realtime stream failed: {}", e);
                            health.mark_degraded();
                            return None;
                        }
                        None => {
                            log::debug!("Realtime stream closed by server");
                            health.mark_degraded();
                            return None;
                        }
                    }
                }
            },
        );
        Ok(messages.boxed())
    }
}

#[async_trait]
impl StatusSource for StorefrontClient {
    async fn fetch_status(&self, order_id: Uuid) -> Result<OrderStatus, ClientError> {
        self.order_status(order_id).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseMessage {
    pub event: Option<String>,
    pub data: String,
}

impl SseMessage {
    /// The `status` carried by an order event, if this is one.
    pub fn order_status(&self) -> Option<OrderStatus> {
        if !self.event.as_deref()?.starts_with("order:") {
            return None;
        }
        let payload: Value = serde_json::from_str(&self.data).ok()?;
        serde_json::from_value(payload.get("status")?.clone()).ok()
    }
}

/// Incremental `text/event-stream` decoder. Chunks may split frames anywhere.
#[derive(Debug, Default)]
pub struct SseParser {
    buf: Vec<u8>,
}

impl SseParser {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseMessage> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(end) = self.buf.windows(2).position(|w| w == b"\n\n") {
            let frame: Vec<u8> = self.buf.drain(..end + 2).collect();
            if let Some(msg) = Self::parse_frame(&String::from_utf8_lossy(&frame[..end])) {
                out.push(msg);
            }
        }
        out
    }

    fn parse_frame(frame: &str) -> Option<SseMessage> {
        let mut event = None;
        let mut data: Vec<&str> = Vec::new();
        for line in frame.lines() {
            if line.starts_with(':') {
                continue;
            }
            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            let value = value.strip_prefix(' ').unwrap_or(value);
            match field {
                "event" => event = Some(value.to_string()),
                "data" => data.push(value),
                _ => {}
            }
        }
        if data.is_empty() {
            return None;
        }
        Some(SseMessage {
            event,
            data: data.join("\n"),
        })
    }
}
