use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{NewOffer, Offer};

pub async fn fetch_offer(offer_id: &str, conn: &mut SqliteConnection) -> Result<Option<Offer>, sqlx::Error> {
    let offer = sqlx::query_as(
        "SELECT offer_id, listing_id, buyer_id, amount, status, updated_at FROM offers WHERE offer_id = $1",
    )
    .bind(offer_id)
    .fetch_optional(conn)
    .await?;
    Ok(offer)
}

/// Conditionally moves an accepted offer to completed. Offers in any other state are left untouched.
pub async fn complete_accepted_offer(offer_id: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE offers SET status = 'completed', updated_at = CURRENT_TIMESTAMP
        WHERE offer_id = $1 AND status = 'accepted'
        "#,
    )
    .bind(offer_id)
    .execute(conn)
    .await?;
    let completed = result.rows_affected() == 1;
    trace!("🤝️ Offer {offer_id} completion: {completed}");
    Ok(completed)
}

/// Offers are owned by the offers subsystem. This exists for seeding and tests.
pub async fn insert_offer(offer: NewOffer, conn: &mut SqliteConnection) -> Result<Offer, sqlx::Error> {
    let offer = sqlx::query_as(
        r#"
        INSERT INTO offers (offer_id, listing_id, buyer_id, amount, status)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING offer_id, listing_id, buyer_id, amount, status, updated_at
        "#,
    )
    .bind(offer.offer_id)
    .bind(offer.listing_id)
    .bind(offer.buyer_id)
    .bind(offer.amount)
    .bind(offer.status)
    .fetch_one(conn)
    .await?;
    Ok(offer)
}
