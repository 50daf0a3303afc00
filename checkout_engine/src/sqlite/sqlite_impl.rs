//! `SqliteDatabase` is a concrete implementation of a checkout engine backend.
//!
//! It uses SQLite as the store and implements all the storage traits defined in the [`crate::traits`] module.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{checkout_sessions, db_url, listings, new_pool, offers, orders, run_migrations};
use crate::{
    db_types::{
        CheckoutSession,
        ListingStock,
        NewCheckoutSession,
        NewOrder,
        Offer,
        Order,
        OrderId,
        SessionId,
    },
    traits::{
        CheckoutSessionStore,
        CheckoutStoreError,
        ListingManagement,
        ListingStoreError,
        LockResult,
        OfferManagement,
        OfferStoreError,
        OrderManagement,
        OrderStoreError,
        SessionLock,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({})", self.url)
    }
}

impl CheckoutSessionStore for SqliteDatabase {
    async fn fetch_checkout_session(&self, session_id: &SessionId) -> Result<Option<CheckoutSession>, CheckoutStoreError> {
        let mut conn = self.pool.acquire().await?;
        let session = checkout_sessions::fetch_checkout_session(session_id, &mut conn).await?;
        Ok(session)
    }

    async fn insert_checkout_session(&self, session: NewCheckoutSession) -> Result<CheckoutSession, CheckoutStoreError> {
        let mut tx = self.pool.begin().await?;
        let session = checkout_sessions::insert_checkout_session(session, &mut tx).await?;
        tx.commit().await?;
        Ok(session)
    }

    async fn try_lock_session(&self, session_id: &SessionId, lock: &SessionLock) -> Result<LockResult, CheckoutStoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = checkout_sessions::try_lock(session_id, lock, &mut conn).await?;
        if result.is_acquired() {
            debug!("🗃️ Lock on checkout session {session_id} acquired at {}", lock.locked_at);
        }
        Ok(result)
    }

    async fn record_order_for_session(
        &self,
        session_id: &SessionId,
        locked_at: DateTime<Utc>,
        order_id: &OrderId,
    ) -> Result<(), CheckoutStoreError> {
        let mut conn = self.pool.acquire().await?;
        checkout_sessions::record_order(session_id, locked_at, order_id, &mut conn).await
    }

    async fn release_session_lock(&self, session_id: &SessionId, locked_at: DateTime<Utc>) -> Result<bool, CheckoutStoreError> {
        let mut conn = self.pool.acquire().await?;
        let released = checkout_sessions::release_lock(session_id, locked_at, &mut conn).await?;
        if !released {
            warn!("🗃️ Lock {locked_at} on checkout session {session_id} was not released. It has already moved on.");
        }
        Ok(released)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} [{}] has been saved in the DB", order.order_id, order.order_ref);
        Ok(order)
    }

    async fn insert_order_for_session(&self, order: NewOrder, locked_at: DateTime<Utc>) -> Result<Order, OrderStoreError> {
        let session_id = order.checkout_session_id.clone();
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        // Dropping the transaction on error rolls the order back
        checkout_sessions::record_order(&session_id, locked_at, &order.order_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} [{}] saved and recorded on checkout session {session_id}", order.order_id, order.order_ref);
        Ok(order)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }
}

impl ListingManagement for SqliteDatabase {
    async fn fetch_listing_stock(&self, listing_id: &str) -> Result<Option<ListingStock>, ListingStoreError> {
        let mut conn = self.pool.acquire().await?;
        let stock = listings::fetch_listing_stock(listing_id, &mut conn).await?;
        Ok(stock)
    }

    async fn decrement_listing_stock(
        &self,
        listing_id: &str,
        quantity: i64,
        sold_at: DateTime<Utc>,
    ) -> Result<ListingStock, ListingStoreError> {
        let mut conn = self.pool.acquire().await?;
        listings::decrement_listing_stock(listing_id, quantity, sold_at, &mut conn).await
    }
}

impl OfferManagement for SqliteDatabase {
    async fn fetch_offer(&self, offer_id: &str) -> Result<Option<Offer>, OfferStoreError> {
        let mut conn = self.pool.acquire().await?;
        let offer = offers::fetch_offer(offer_id, &mut conn).await?;
        Ok(offer)
    }

    async fn complete_accepted_offer(&self, offer_id: &str) -> Result<bool, OfferStoreError> {
        let mut conn = self.pool.acquire().await?;
        let completed = offers::complete_accepted_offer(offer_id, &mut conn).await?;
        Ok(completed)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using `MSQ_DATABASE_URL` or the default location.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        run_migrations(&self.pool).await?;
        Ok(())
    }

    /// Every order ever created for the given session. The exactly-once guarantee means this should never hold more
    /// than one entry; it is exposed so that operators and tests can check that.
    pub async fn fetch_orders_for_session(&self, session_id: &SessionId) -> Result<Vec<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_session(session_id, &mut conn).await?;
        Ok(orders)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
