use std::convert::Infallible;

use actix_web::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use actix_web::web::{self, Bytes};
use actix_web::HttpResponse;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use utoipa::IntoParams;
use uuid::Uuid;

use super::auth::Identity;
use crate::domain::realtime::{Channel, RealtimeEvent};
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct SubscribeQuery {
    /// Only forward events about this order. The caller must own it.
    pub order_id: Option<Uuid>,
}

/// Which events a subscriber is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Everything,
    Owner(Uuid),
    Order(Uuid),
}

impl Scope {
    fn admits(self, event: &RealtimeEvent) -> bool {
        match self {
            Scope::Everything => true,
            Scope::Owner(user_id) => event.user_id() == Some(user_id),
            Scope::Order(order_id) => event.order_id() == Some(order_id),
        }
    }
}

/// One server-sent event frame.
pub fn sse_frame(event: &RealtimeEvent) -> String {
    format!("event: {}\ndata: {}\n\n", event.kind, event.payload)
}

/// GET /api/realtime/{channel}
///
/// Server-sent event stream of `orders` or `products` events. Delivery is
/// best-effort; clients keep a polling fallback. Customers only receive
/// events about their own orders; admins receive every order event.
#[utoipa::path(
    get,
    path = "/api/realtime/{channel}",
    params(
        ("channel" = String, Path, description = "`orders` or `products`"),
        SubscribeQuery,
        ("X-User-Id" = Uuid, Header, description = "Verified caller"),
    ),
    responses(
        (status = 200, description = "text/event-stream"),
        (status = 404, description = "Unknown channel, or order not owned by the caller"),
    ),
    tag = "realtime"
)]
pub async fn subscribe(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
    query: web::Query<SubscribeQuery>,
) -> Result<HttpResponse, AppError> {
    let channel: Channel = path.parse()?;
    let scope = match (channel, query.order_id) {
        (Channel::Products, _) => Scope::Everything,
        (Channel::Orders, Some(order_id)) => {
            state.orders.status_for_user(identity.0, order_id).await?;
            Scope::Order(order_id)
        }
        (Channel::Orders, None) => {
            if state.orders.is_admin(identity.0).await? {
                Scope::Everything
            } else {
                Scope::Owner(identity.0)
            }
        }
    };

    let rx = state.hub.subscribe(channel);
    log::debug!("User {} subscribed to {}", identity.0, channel.as_str());

    let events = stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) if scope.admits(&event) => {
                    return Some((Bytes::from(sse_frame(&event)), rx));
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Realtime subscriber lagged, {} event(s) dropped", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });
    let body = stream::once(async { Bytes::from_static(b": connected\n\n") })
        .chain(events)
        .map(Ok::<_, Infallible>);

    Ok(HttpResponse::Ok()
        .insert_header((CONTENT_TYPE, "text/event-stream"))
        .insert_header((CACHE_CONTROL, "no-cache"))
        .streaming(body))
}
