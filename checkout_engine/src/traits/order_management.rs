use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderId, SessionId},
    traits::CheckoutStoreError,
};

/// The `OrderManagement` trait defines the behaviour for persisting and querying order aggregates.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Inserts the order header and all its line items in a single atomic transaction, returning the stored order.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;

    /// Inserts the order and writes its id onto the checkout session it was built from, all in one transaction.
    ///
    /// The session must still be locked with `locked_at` and must not have an order yet. If it isn't, nothing is
    /// stored and the session store's verdict comes back as [`OrderStoreError::SessionNotUpdated`].
    async fn insert_order_for_session(&self, order: NewOrder, locked_at: DateTime<Utc>) -> Result<Order, OrderStoreError>;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError>;
}

#[derive(Debug, Clone, Error)]
pub enum OrderStoreError {
    #[error("Order store error: {0}")]
    DatabaseError(String),
    #[error("Order {0} already exists")]
    OrderAlreadyExists(OrderId),
    #[error("Cannot create an order with no line items")]
    EmptyOrder,
    #[error("Checkout session {0} already has an order")]
    SessionAlreadyHasOrder(SessionId),
    #[error("The order was not recorded on its checkout session. {0}")]
    SessionNotUpdated(#[from] CheckoutStoreError),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        OrderStoreError::DatabaseError(e.to_string())
    }
}
