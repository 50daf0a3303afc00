use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{CheckoutSession, NewCheckoutSession, OrderId, SessionId},
    traits::{CheckoutStoreError, LockResult, SessionLock},
};

pub async fn fetch_checkout_session(
    session_id: &SessionId,
    conn: &mut SqliteConnection,
) -> Result<Option<CheckoutSession>, sqlx::Error> {
    let session = sqlx::query_as("SELECT * FROM checkout_sessions WHERE session_id = $1")
        .bind(session_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(session)
}

/// Inserts a new checkout session. A duplicate id is reported as [`CheckoutStoreError::SessionAlreadyExists`].
pub async fn insert_checkout_session(
    session: NewCheckoutSession,
    conn: &mut SqliteConnection,
) -> Result<CheckoutSession, CheckoutStoreError> {
    let session_id = session.session_id.clone();
    let inserted: CheckoutSession = sqlx::query_as(
        r#"
            INSERT INTO checkout_sessions (session_id, user_id, payload)
            VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(session.session_id.as_str())
    .bind(session.user_id)
    .bind(Json(session.payload))
    .fetch_one(conn)
    .await
    .map_err(|e| match e.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => CheckoutStoreError::SessionAlreadyExists(session_id),
        _ => CheckoutStoreError::from(e),
    })?;
    debug!("🧾️ Checkout session {} stored for user {}", inserted.session_id, inserted.user_id);
    Ok(inserted)
}

/// The compare-and-set at the heart of the finalize protocol. A single `UPDATE` either claims the row or does
/// nothing; SQLite serializes writers, so two racing callers can never both see a row affected.
pub async fn try_lock(
    session_id: &SessionId,
    lock: &SessionLock,
    conn: &mut SqliteConnection,
) -> Result<LockResult, sqlx::Error> {
    let result = match lock.stale_before {
        None => {
            sqlx::query(
                r#"
                UPDATE checkout_sessions SET consumed_at = $1, updated_at = CURRENT_TIMESTAMP
                WHERE session_id = $2 AND consumed_at IS NULL
                "#,
            )
            .bind(lock.locked_at)
            .bind(session_id.as_str())
            .execute(conn)
            .await?
        },
        Some(stale_before) => {
            sqlx::query(
                r#"
                UPDATE checkout_sessions SET consumed_at = $1, updated_at = CURRENT_TIMESTAMP
                WHERE session_id = $2 AND (consumed_at IS NULL OR (order_id IS NULL AND consumed_at < $3))
                "#,
            )
            .bind(lock.locked_at)
            .bind(session_id.as_str())
            .bind(stale_before)
            .execute(conn)
            .await?
        },
    };
    let lock_result = LockResult::from_rows_affected(result.rows_affected());
    trace!("🧾️ Lock attempt on {session_id} at {}: {lock_result:?}", lock.locked_at);
    Ok(lock_result)
}

pub async fn record_order(
    session_id: &SessionId,
    locked_at: DateTime<Utc>,
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<(), CheckoutStoreError> {
    let result = sqlx::query(
        r#"
        UPDATE checkout_sessions SET order_id = $1, updated_at = CURRENT_TIMESTAMP
        WHERE session_id = $2 AND consumed_at = $3 AND order_id IS NULL
        "#,
    )
    .bind(order_id.as_str())
    .bind(session_id.as_str())
    .bind(locked_at)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 1 {
        debug!("🧾️ Order {order_id} recorded against checkout session {session_id}");
        return Ok(());
    }
    // Work out why the conditional write missed, so the caller gets a precise error
    match fetch_checkout_session(session_id, conn).await? {
        None => Err(CheckoutStoreError::SessionNotFound(session_id.clone())),
        Some(s) if s.order_id.is_some() => Err(CheckoutStoreError::OrderAlreadyRecorded(session_id.clone())),
        Some(_) => Err(CheckoutStoreError::LockLost(session_id.clone())),
    }
}

pub async fn release_lock(
    session_id: &SessionId,
    locked_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE checkout_sessions SET consumed_at = NULL, updated_at = CURRENT_TIMESTAMP
        WHERE session_id = $1 AND consumed_at = $2 AND order_id IS NULL
        "#,
    )
    .bind(session_id.as_str())
    .bind(locked_at)
    .execute(conn)
    .await?;
    let released = result.rows_affected() == 1;
    trace!("🧾️ Release of lock {locked_at} on {session_id}: {released}");
    Ok(released)
}
