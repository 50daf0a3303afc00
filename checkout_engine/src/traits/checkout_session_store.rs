use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{CheckoutSession, NewCheckoutSession, OrderId, SessionId},
    traits::data_objects::{LockResult, SessionLock},
};

/// Persistence for checkout sessions.
///
/// Implementations must be durable and visible across processes: the browser redirect and the payment provider's
/// webhook are typically served by different processes, and both may try to finalize the same session.
#[allow(async_fn_in_trait)]
pub trait CheckoutSessionStore {
    /// Fetches the session with the given id, or `None` if no such session exists.
    async fn fetch_checkout_session(&self, session_id: &SessionId) -> Result<Option<CheckoutSession>, CheckoutStoreError>;

    /// Stores a brand-new session. Sessions are created by the checkout-start flow, outside of finalization.
    ///
    /// Returns [`CheckoutStoreError::SessionAlreadyExists`] if the id is taken.
    async fn insert_checkout_session(&self, session: NewCheckoutSession) -> Result<CheckoutSession, CheckoutStoreError>;

    /// Atomically sets `consumed_at = lock.locked_at`, but only if `consumed_at` is currently null.
    ///
    /// If `lock.stale_before` is set, a row whose lock is older than that instant and which has no order id also
    /// matches. Exactly one concurrent caller can observe [`LockResult::Acquired`] for a given lock generation.
    async fn try_lock_session(&self, session_id: &SessionId, lock: &SessionLock) -> Result<LockResult, CheckoutStoreError>;

    /// Writes the order id onto a session that is still locked with `locked_at`.
    ///
    /// Fails with [`CheckoutStoreError::OrderAlreadyRecorded`] if the session already has an order id, and with
    /// [`CheckoutStoreError::LockLost`] if the lock is no longer held by `locked_at`.
    async fn record_order_for_session(
        &self,
        session_id: &SessionId,
        locked_at: DateTime<Utc>,
        order_id: &OrderId,
    ) -> Result<(), CheckoutStoreError>;

    /// Clears `consumed_at`, but only if it still equals `locked_at` and no order has been recorded.
    ///
    /// Returns `true` if the lock was released, `false` if the row had moved on (another holder, or a result).
    async fn release_session_lock(&self, session_id: &SessionId, locked_at: DateTime<Utc>) -> Result<bool, CheckoutStoreError>;
}

#[derive(Debug, Clone, Error)]
pub enum CheckoutStoreError {
    #[error("Checkout session store error: {0}")]
    DatabaseError(String),
    #[error("Checkout session {0} already exists")]
    SessionAlreadyExists(SessionId),
    #[error("Checkout session {0} does not exist")]
    SessionNotFound(SessionId),
    #[error("The lock on checkout session {0} is no longer held by this attempt")]
    LockLost(SessionId),
    #[error("Checkout session {0} already has an order recorded")]
    OrderAlreadyRecorded(SessionId),
}

impl From<sqlx::Error> for CheckoutStoreError {
    fn from(e: sqlx::Error) -> Self {
        CheckoutStoreError::DatabaseError(e.to_string())
    }
}
