use chrono::{DateTime, Utc};
use log::{debug, trace};
use msq_common::MinorUnits;
use sqlx::{types::Json, FromRow, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderItem, OrderTotals, SessionId, ShippingAddress},
    helpers::order_ref_for,
    traits::OrderStoreError,
};

#[derive(Debug, FromRow)]
struct OrderHeader {
    order_id: OrderId,
    order_ref: String,
    checkout_session_id: SessionId,
    user_id: String,
    shipping_method: String,
    shipping_address: Option<Json<ShippingAddress>>,
    items_subtotal: MinorUnits,
    service_fee: MinorUnits,
    shipping_cost: MinorUnits,
    total: MinorUnits,
    currency: String,
    created_at: DateTime<Utc>,
}

impl OrderHeader {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            order_id: self.order_id,
            order_ref: self.order_ref,
            checkout_session_id: self.checkout_session_id,
            user_id: self.user_id,
            items,
            shipping_method: self.shipping_method,
            shipping_address: self.shipping_address.map(|a| a.0),
            totals: OrderTotals {
                items_subtotal: self.items_subtotal,
                service_fee: self.service_fee,
                shipping_cost: self.shipping_cost,
                total: self.total,
                currency: self.currency,
            },
            created_at: self.created_at,
        }
    }
}

/// Inserts the order header and its line items using the given connection. This is not atomic. Embed this call
/// inside a transaction, passing `&mut *tx` as the connection argument, so that a partial order is never visible.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderStoreError> {
    if order.items.is_empty() {
        return Err(OrderStoreError::EmptyOrder);
    }
    let order_ref = order_ref_for(&order.order_id);
    sqlx::query(
        r#"
            INSERT INTO orders (
                order_id,
                order_ref,
                checkout_session_id,
                user_id,
                shipping_method,
                shipping_address,
                items_subtotal,
                service_fee,
                shipping_cost,
                total,
                currency,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12);
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(&order_ref)
    .bind(order.checkout_session_id.as_str())
    .bind(&order.user_id)
    .bind(&order.shipping_method)
    .bind(order.shipping_address.clone().map(Json))
    .bind(order.totals.items_subtotal)
    .bind(order.totals.service_fee)
    .bind(order.totals.shipping_cost)
    .bind(order.totals.total)
    .bind(&order.totals.currency)
    .bind(order.created_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| match e.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() && db_err.message().contains("checkout_session_id") => {
            OrderStoreError::SessionAlreadyHasOrder(order.checkout_session_id.clone())
        },
        Some(db_err) if db_err.is_unique_violation() => OrderStoreError::OrderAlreadyExists(order.order_id.clone()),
        _ => OrderStoreError::from(e),
    })?;
    for item in &order.items {
        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, listing_id, title, price, quantity, seller_id)
            VALUES ($1, $2, $3, $4, $5, $6);
            "#,
        )
        .bind(order.order_id.as_str())
        .bind(&item.listing_id)
        .bind(&item.title)
        .bind(item.price)
        .bind(item.quantity)
        .bind(&item.seller_id)
        .execute(&mut *conn)
        .await?;
    }
    debug!("📝️ Order {} ({order_ref}) inserted with {} line items", order.order_id, order.items.len());
    Ok(Order {
        order_id: order.order_id,
        order_ref,
        checkout_session_id: order.checkout_session_id,
        user_id: order.user_id,
        items: order.items,
        shipping_method: order.shipping_method,
        shipping_address: order.shipping_address,
        totals: order.totals,
        created_at: order.created_at,
    })
}

pub async fn fetch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let header: Option<OrderHeader> = sqlx::query_as("SELECT * FROM orders WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    let Some(header) = header else {
        return Ok(None);
    };
    let items = fetch_order_items(order_id, conn).await?;
    Ok(Some(header.into_order(items)))
}

pub async fn fetch_order_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as(
        "SELECT listing_id, title, price, quantity, seller_id FROM order_items WHERE order_id = $1 ORDER BY id ASC",
    )
    .bind(order_id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(items)
}

/// All orders that were created for the given checkout session, oldest first. Under normal operation this is at most
/// one order.
pub async fn fetch_orders_for_session(
    session_id: &SessionId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let headers: Vec<OrderHeader> =
        sqlx::query_as("SELECT * FROM orders WHERE checkout_session_id = $1 ORDER BY created_at ASC")
            .bind(session_id.as_str())
            .fetch_all(&mut *conn)
            .await?;
    let mut orders = Vec::with_capacity(headers.len());
    for header in headers {
        let items = fetch_order_items(&header.order_id, conn).await?;
        orders.push(header.into_order(items));
    }
    trace!("📝️ {} orders found for checkout session {session_id}", orders.len());
    Ok(orders)
}
