use std::collections::BTreeMap;

use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::checkout::{CartLine, CheckoutPlan, PlacedOrder};
use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderDetail, OrderFilter, OrderItem, OrderStatus, PaymentRef};
use crate::domain::payment::PaymentLog;
use crate::domain::ports::{NewPaymentLog, OrderRepository, OutboxEntry, OutboxRepository};
use crate::domain::realtime::RealtimeEvent;
use crate::schema::{cart_items, carts, order_items, orders, payment_logs, products, realtime_outbox};

use super::models::{
    NewOrderItemRow, NewOrderRow, NewOutboxRow, NewPaymentLogRow, OrderItemRow, OrderRow,
    OrderStatusChange, OutboxRow, PaymentLogRow,
};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Row mapping ───────────────────────────────────────────────────────────────

fn to_order(row: OrderRow) -> Result<Order, DomainError> {
    let status: OrderStatus = row
        .status
        .parse()
        .map_err(|_| DomainError::Internal(format!("order {} has status '{}'", row.id, row.status)))?;
    Ok(Order {
        id: row.id,
        user_id: row.user_id,
        status,
        total_amount: row.total_amount,
        payment_id: row.payment_id,
        payment_type: row.payment_type,
        shipping_address: row.shipping_address,
        snap_token: row.snap_token,
        created_at: row.created_at,
    })
}

fn to_outbox_entry(row: OutboxRow) -> Result<OutboxEntry, DomainError> {
    let kind = row
        .event_type
        .parse()
        .map_err(|_| DomainError::Internal(format!("outbox row {} has event '{}'", row.id, row.event_type)))?;
    Ok(OutboxEntry {
        id: row.id,
        event: RealtimeEvent {
            kind,
            payload: row.payload,
        },
    })
}

/// Queue realtime events in the caller's transaction.
pub(crate) fn insert_events(conn: &mut PgConnection, events: &[RealtimeEvent]) -> QueryResult<usize> {
    let rows: Vec<NewOutboxRow> = events
        .iter()
        .map(|event| NewOutboxRow {
            id: Uuid::new_v4(),
            channel: event.channel().as_str().to_string(),
            event_type: event.kind.as_str().to_string(),
            payload: event.payload.clone(),
        })
        .collect();
    diesel::insert_into(realtime_outbox::table)
        .values(&rows)
        .execute(conn)
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    fn load_cart_lines(&self, user_id: Uuid) -> Result<Option<Vec<CartLine>>, DomainError> {
        let mut conn = self.pool.get()?;

        let cart_id: Option<Uuid> = carts::table
            .filter(carts::user_id.eq(user_id))
            .select(carts::id)
            .first(&mut conn)
            .optional()?;
        let Some(cart_id) = cart_id else {
            return Ok(None);
        };

        let rows: Vec<(Uuid, Uuid, i32, i64, i32)> = cart_items::table
            .inner_join(products::table)
            .filter(cart_items::cart_id.eq(cart_id))
            .select((
                cart_items::id,
                cart_items::product_id,
                cart_items::quantity,
                products::price,
                products::stock,
            ))
            .order(cart_items::id.asc())
            .load(&mut conn)?;

        Ok(Some(
            rows.into_iter()
                .map(|(cart_item_id, product_id, quantity, unit_price, stock)| CartLine {
                    cart_item_id,
                    product_id,
                    quantity,
                    unit_price,
                    stock,
                })
                .collect(),
        ))
    }

    fn place_order(&self, plan: &CheckoutPlan) -> Result<PlacedOrder, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Claim the cart lines. A concurrent checkout of the same cart
            //    blocks on these rows and then finds them gone.
            let consumed: Vec<Uuid> = plan.lines.iter().map(|l| l.cart_item_id).collect();
            let claimed =
                diesel::delete(cart_items::table.filter(cart_items::id.eq_any(consumed)))
                    .execute(conn)?;
            if claimed != plan.lines.len() {
                return Err(DomainError::Conflict("Cart changed during checkout".to_string()));
            }

            // 2. Insert the order
            diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: plan.order_id,
                    user_id: Some(plan.user_id),
                    status: OrderStatus::Pending.as_str(),
                    total_amount: plan.total_amount,
                    shipping_address: &plan.shipping_address,
                })
                .execute(conn)?;

            // 3. Insert items with the price observed during validation
            let items: Vec<NewOrderItemRow> = plan
                .lines
                .iter()
                .map(|line| NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id: plan.order_id,
                    product_id: line.product_id,
                    quantity: line.quantity,
                    price_at_purchase: line.unit_price,
                })
                .collect();
            diesel::insert_into(order_items::table)
                .values(&items)
                .execute(conn)?;

            // 4. Conditional decrements. A product listed twice is decremented once
            //    for the combined quantity.
            let mut wanted: BTreeMap<Uuid, i32> = BTreeMap::new();
            for line in &plan.lines {
                *wanted.entry(line.product_id).or_default() += line.quantity;
            }

            let mut events = vec![RealtimeEvent::order_created(
                plan.order_id,
                plan.user_id,
                plan.total_amount,
            )];
            for (product_id, quantity) in wanted {
                let remaining: Option<i32> = diesel::update(
                    products::table
                        .filter(products::id.eq(product_id))
                        .filter(products::stock.ge(quantity)),
                )
                .set(products::stock.eq(products::stock - quantity))
                .returning(products::stock)
                .get_result(conn)
                .optional()?;

                let Some(remaining) = remaining else {
                    let available: i32 = products::table
                        .filter(products::id.eq(product_id))
                        .select(products::stock)
                        .first::<i32>(conn)
                        .optional()?
                        .unwrap_or(0);
                    return Err(DomainError::InsufficientStock {
                        product_id,
                        available,
                        requested: quantity,
                    });
                };
                events.push(RealtimeEvent::stock_updated(product_id, remaining));
            }

            // 5. Outbox events commit with the order
            insert_events(conn, &events)?;

            Ok(PlacedOrder {
                order_id: plan.order_id,
                total_amount: plan.total_amount,
            })
        })
    }

    fn find(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        orders::table
            .filter(orders::id.eq(id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(to_order)
            .transpose()
    }

    fn find_detail(&self, id: Uuid) -> Result<Option<OrderDetail>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .filter(orders::id.eq(id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        let rows: Vec<(OrderItemRow, String)> = OrderItemRow::belonging_to(&order)
            .inner_join(products::table)
            .select((OrderItemRow::as_select(), products::name))
            .load(&mut conn)?;

        Ok(Some(OrderDetail {
            order: to_order(order)?,
            items: rows
                .into_iter()
                .map(|(item, product_name)| OrderItem {
                    id: item.id,
                    product_id: item.product_id,
                    product_name,
                    quantity: item.quantity,
                    price_at_purchase: item.price_at_purchase,
                })
                .collect(),
        }))
    }

    fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let mut query = orders::table.select(OrderRow::as_select()).into_boxed();
        if let Some(user_id) = filter.user_id {
            query = query.filter(orders::user_id.eq(user_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(orders::status.eq(status.as_str()));
        }

        query
            .order(orders::created_at.desc())
            .load(&mut conn)?
            .into_iter()
            .map(to_order)
            .collect()
    }

    fn set_snap_token(&self, id: Uuid, token: &str) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(orders::table.filter(orders::id.eq(id)))
            .set((orders::snap_token.eq(token), orders::updated_at.eq(Utc::now())))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(DomainError::not_found("Order"));
        }
        Ok(())
    }

    fn transition(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        payment: Option<&PaymentRef>,
    ) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let change = OrderStatusChange {
                status: to.as_str(),
                updated_at: Utc::now(),
                payment_id: payment.and_then(|p| p.payment_id.as_deref()),
                payment_type: payment.and_then(|p| p.payment_type.as_deref()),
            };
            let updated = diesel::update(
                orders::table
                    .filter(orders::id.eq(id))
                    .filter(orders::status.eq(from.as_str())),
            )
            .set(&change)
            .returning(orders::user_id)
            .get_result::<Option<Uuid>>(conn)
            .optional()?;

            let Some(owner) = updated else {
                return Ok(false);
            };
            insert_events(conn, &[RealtimeEvent::order_status_changed(id, owner, to)])?;
            Ok(true)
        })
    }

    fn append_payment_log(&self, entry: &NewPaymentLog) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        diesel::insert_into(payment_logs::table)
            .values(&NewPaymentLogRow {
                id: Uuid::new_v4(),
                order_id: &entry.order_id,
                external_id: entry.external_id.as_deref(),
                status: entry.status.as_deref(),
                raw_payload: entry.raw_payload.clone(),
            })
            .execute(&mut conn)?;
        Ok(())
    }

    fn payment_logs_for(&self, order_id: &str) -> Result<Vec<PaymentLog>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = payment_logs::table
            .filter(payment_logs::order_id.eq(order_id))
            .select(PaymentLogRow::as_select())
            .order(payment_logs::received_at.asc())
            .load(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|row| PaymentLog {
                id: row.id,
                order_id: row.order_id,
                external_id: row.external_id,
                status: row.status,
                raw_payload: row.raw_payload,
                received_at: row.received_at,
            })
            .collect())
    }
}

impl OutboxRepository for DieselOrderRepository {
    fn fetch_unpublished(&self, limit: i64) -> Result<Vec<OutboxEntry>, DomainError> {
        let mut conn = self.pool.get()?;

        realtime_outbox::table
            .filter(realtime_outbox::published_at.is_null())
            .select(OutboxRow::as_select())
            .order(realtime_outbox::created_at.asc())
            .limit(limit)
            .load(&mut conn)?
            .into_iter()
            .map(to_outbox_entry)
            .collect()
    }

    fn mark_published(&self, ids: &[Uuid]) -> Result<(), DomainError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.pool.get()?;

        diesel::update(realtime_outbox::table.filter(realtime_outbox::id.eq_any(ids)))
            .set(realtime_outbox::published_at.eq(Utc::now()))
            .execute(&mut conn)?;
        Ok(())
    }
}
