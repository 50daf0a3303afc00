use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db_types::{CartPayload, NewOrder, Order, SessionId},
    traits::{OrderManagement, OrderStoreError},
};

/// Turns a locked checkout session's cart snapshot into a durable order.
///
/// The factory must only be used while the caller holds the session lock; it performs no locking of its own.
pub struct OrderFactory<'a, B> {
    db: &'a B,
}

impl<'a, B> OrderFactory<'a, B>
where B: OrderManagement
{
    pub fn new(db: &'a B) -> Self {
        Self { db }
    }

    /// Creates the order header and line items with a freshly generated order id, and records the order on the
    /// session held by `locked_at`. Either all of it is stored or none of it is.
    pub async fn create_order(
        &self,
        session_id: &SessionId,
        user_id: &str,
        cart: &CartPayload,
        locked_at: DateTime<Utc>,
    ) -> Result<Order, OrderStoreError> {
        let new_order = NewOrder::from_cart(session_id, user_id, cart);
        trace!("🏭️ Creating order {} for checkout session {session_id}", new_order.order_id);
        let order = self.db.insert_order_for_session(new_order, locked_at).await?;
        info!(
            "🏭️ Order {} [{}] created for user {user_id}. {} line items, total {} {}",
            order.order_id,
            order.order_ref,
            order.items.len(),
            order.totals.total,
            order.totals.currency
        );
        Ok(order)
    }
}
